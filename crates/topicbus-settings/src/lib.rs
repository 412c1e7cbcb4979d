//! topicbus Settings Crate
//!
//! Handles application configuration and settings persistence.

pub mod config;
pub mod error;

pub use config::{
    config_dir, default_config_path, LogFormat, LoggingSettings, Settings, CONFIG_FILE_NAME,
};
pub use error::{SettingsError, SettingsResult};
