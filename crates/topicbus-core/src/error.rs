//! Error handling for topicbus
//!
//! Two layers:
//! - Configuration errors (malformed handler declarations, raised at discovery)
//! - Bus errors (anything `register`/`unregister` can return)
//!
//! Dispatch-time payload mismatches are not errors: they are logged and counted
//! by the bus, never returned.

use thiserror::Error;

/// Malformed handler declaration
///
/// Raised while a consumer type's handlers are being discovered, before any
/// event can reach the offending handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A handler declares more than one parameter
    #[error("Handler {method} supports only 0 or 1 parameter, found {count}")]
    TooManyParameters {
        /// Fully qualified handler method name.
        method: String,
        /// Number of declared parameters.
        count: usize,
    },

    /// A one-parameter handler does not take an event payload
    #[error("Handler {method} must take an EventData payload, found {found}")]
    InvalidParameterType {
        /// Fully qualified handler method name.
        method: String,
        /// Name of the declared parameter type.
        found: String,
    },
}

/// Main error type for bus operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Handler discovery failed
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The consumer already owns subscriptions and duplicates are rejected
    #[error("Consumer {consumer} is already registered")]
    AlreadyRegistered {
        /// Type name of the consumer.
        consumer: String,
    },
}

impl BusError {
    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, BusError::Configuration(_))
    }
}

/// Result type using BusError
pub type Result<T> = std::result::Result<T, BusError>;
