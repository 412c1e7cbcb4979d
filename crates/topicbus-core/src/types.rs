//! Type aliases for directly subscribed handlers.
//!
//! Direct subscriptions are identified by the allocation of the handler `Arc`,
//! so callers keep the `Arc` they subscribed with and pass it back to
//! [`EventBus::unsubscribe`](crate::EventBus::unsubscribe). These aliases name
//! the usual shapes.
//!
//! ```rust,ignore
//! let on_reset: Callback = Arc::new(|| println!("reset"));
//! bus.subscribe(topics::RESET, &on_reset);
//! // ...
//! bus.unsubscribe(topics::RESET, &on_reset);
//! ```

use std::sync::Arc;

/// A handler with no parameters.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// A handler that requires a payload of type `P`.
pub type DataCallback<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// A handler that also runs when no payload is posted.
pub type OptionalCallback<P> = Arc<dyn Fn(Option<&P>) + Send + Sync>;
