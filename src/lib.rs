//! # topicbus
//!
//! In-process publish/subscribe event dispatcher keyed by integer topics.
//!
//! ## Architecture
//!
//! topicbus is organized as a workspace with multiple crates:
//!
//! 1. **topicbus-core** - Event payloads, handler tables, discovery cache, the bus
//! 2. **topicbus-settings** - Bus and logging settings persisted as TOML or JSON
//! 3. **topicbus** - Logging setup and a demo binary wiring the two together

pub mod listeners;

pub use topicbus_core::{
    emit, event_bus, event_data, init_event_bus, on_event, BusError, BusStats, ConfigurationError,
    DispatchReport, EventBase, EventBus, EventBusConfig, EventData, HandlerTable, Subscriber,
    TopicId,
};
pub use topicbus_settings::{LogFormat, LoggingSettings, Settings, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV: &str = "TOPICBUS_CONFIG";

/// Resolve and load settings.
///
/// `TOPICBUS_CONFIG` wins when set and must point at a readable file.
/// Otherwise the platform default path is used if present, else defaults.
pub fn load_settings() -> anyhow::Result<Settings> {
    use anyhow::Context;

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        let path = std::path::PathBuf::from(path);
        return Settings::load_from_file(&path)
            .with_context(|| format!("loading settings from {}", path.display()));
    }

    match topicbus_settings::default_config_path() {
        Ok(path) => Settings::load_or_default(&path)
            .with_context(|| format!("loading settings from {}", path.display())),
        Err(_) => Ok(Settings::default()),
    }
}

/// Initialize logging from settings
///
/// Sets up structured logging with:
/// - RUST_LOG environment variable support, falling back to the configured level
/// - Pretty or JSON console output
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.level.to_ascii_lowercase()))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(settings.thread_info)
                .with_thread_names(settings.thread_info)
                .with_line_number(true)
                .pretty();
            registry.with(fmt_layer).try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_thread_ids(settings.thread_info)
                .with_thread_names(settings.thread_info)
                .json();
            registry.with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}
