//! Event bus configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the event bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Catch handler panics, log them and keep dispatching.
    ///
    /// When off, a panicking handler unwinds through `post` and the remaining
    /// handlers for that post are not called.
    pub isolate_panics: bool,
    /// Fail `register` for a consumer that already owns subscriptions.
    pub reject_duplicate_registration: bool,
    /// Number of topics to reserve space for up front.
    pub initial_topic_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            isolate_panics: true,
            reject_duplicate_registration: false,
            initial_topic_capacity: 64,
        }
    }
}

impl EventBusConfig {
    /// Configuration that lets handler panics reach the poster
    pub fn propagating_panics() -> Self {
        Self {
            isolate_panics: false,
            ..Self::default()
        }
    }
}
