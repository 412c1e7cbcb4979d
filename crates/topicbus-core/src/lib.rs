//! # topicbus core
//!
//! In-process publish/subscribe dispatcher keyed by integer topic ids.
//!
//! Producers post events, optionally carrying a typed payload; consumers
//! receive synchronous callbacks for the topics they listen to. Consumers
//! either register whole objects whose handler methods are listed through
//! [`Subscriber`], or subscribe single callables directly.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use topicbus_core::{EventBase, EventBus, HandlerTable, Subscriber};
//!
//! struct Logger;
//!
//! impl Logger {
//!     fn on_saved(&self, event: &EventBase) {
//!         println!("saved by {}", event.source);
//!     }
//! }
//!
//! impl Subscriber for Logger {
//!     fn declare_handlers(table: &mut HandlerTable<Self>) {
//!         table.on_data(SAVED, "on_saved", Self::on_saved);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let logger = Arc::new(Logger);
//! bus.register(&logger)?;
//! bus.post_with(SAVED, &EventBase::new("editor"));
//! bus.unregister(&logger)?;
//! ```

pub mod bus;
pub mod config;
pub mod discovery;
pub mod error;
pub mod event;
pub mod handler;
mod subscription;
pub mod types;

pub use chrono;

pub use bus::{event_bus, init_event_bus, BusStats, DispatchReport, EventBus};
pub use config::EventBusConfig;
pub use discovery::DiscoveryCache;
pub use error::{BusError, ConfigurationError, Result};
pub use event::{downcast_payload, is_instance_of, AsAny, EventBase, EventData, EventId};
pub use handler::{
    Arity, Delivery, HandlerDecl, HandlerDescriptor, HandlerMethod, HandlerTable, ParamDecl,
    ParamKind, PayloadSpec, SkipReason, Subscriber, TopicId,
};
pub use types::{Callback, DataCallback, OptionalCallback};
