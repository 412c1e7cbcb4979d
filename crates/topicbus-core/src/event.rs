//! Event payload model.
//!
//! Every payload posted on the bus implements [`EventData`]. Payload kinds form
//! an open set: a new kind is a new type, and a type can declare the payload it
//! extends through [`EventData::parent`]. A handler declared for `P` accepts a
//! payload of type `P` or of any type whose parent chain reaches `P`.
//!
//! ```rust,ignore
//! use topicbus_core::{event_data, EventBase};
//!
//! #[derive(Debug)]
//! struct PlayerMoved {
//!     base: EventBase,
//!     x: f32,
//!     y: f32,
//! }
//!
//! event_data!(PlayerMoved => base);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// Unique identifier of one payload instance, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Evt({})", &self.0.to_string()[..8])
    }
}

/// Runtime type access for payloads behind `dyn EventData`.
///
/// Implemented for every `'static` type; never implement it by hand.
pub trait AsAny: Any {
    /// The value as `&dyn Any`, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The concrete type name, for diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Capability shared by all event payloads
pub trait EventData: AsAny + Send + Sync + fmt::Debug {
    /// Name of the component that produced the event.
    fn source(&self) -> &str;

    /// When the payload was created.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Unique id of this payload.
    fn event_id(&self) -> EventId;

    /// The payload this one extends, if any.
    fn parent(&self) -> Option<&dyn EventData> {
        None
    }
}

/// Base payload carrying only the common fields.
///
/// Concrete payloads usually embed an `EventBase` and name it as their parent
/// with [`event_data!`](crate::event_data), which makes them deliverable to
/// handlers declared for `EventBase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBase {
    /// Unique id of the payload.
    pub id: EventId,
    /// Originating component.
    pub source: String,
    /// Creation time.
    pub time: DateTime<Utc>,
}

impl EventBase {
    /// Create a payload stamped with the current time
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            source: source.into(),
            time: Utc::now(),
        }
    }

    /// Create a payload with an explicit timestamp
    pub fn at(source: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            source: source.into(),
            time,
        }
    }
}

impl EventData for EventBase {
    fn source(&self) -> &str {
        &self.source
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }

    fn event_id(&self) -> EventId {
        self.id
    }
}

/// Resolve `payload` as `P`, walking its parent chain.
///
/// Returns the first link in the chain whose concrete type is `P`.
pub fn downcast_payload<P: EventData>(payload: &dyn EventData) -> Option<&P> {
    let mut current = Some(payload);
    while let Some(data) = current {
        if let Some(found) = data.as_any().downcast_ref::<P>() {
            return Some(found);
        }
        current = data.parent();
    }
    None
}

/// Check whether `payload` is `P` or extends `P`.
pub fn is_instance_of<P: EventData>(payload: &dyn EventData) -> bool {
    downcast_payload::<P>(payload).is_some()
}

/// Implement [`EventData`] for a payload that extends the payload stored in
/// one of its fields.
///
/// Source, timestamp and id are read from the parent field.
#[macro_export]
macro_rules! event_data {
    ($ty:ty => $parent:ident) => {
        impl $crate::event::EventData for $ty {
            fn source(&self) -> &str {
                $crate::event::EventData::source(&self.$parent)
            }

            fn timestamp(&self) -> $crate::chrono::DateTime<$crate::chrono::Utc> {
                $crate::event::EventData::timestamp(&self.$parent)
            }

            fn event_id(&self) -> $crate::event::EventId {
                $crate::event::EventData::event_id(&self.$parent)
            }

            fn parent(&self) -> ::std::option::Option<&dyn $crate::event::EventData> {
                ::std::option::Option::Some(&self.$parent)
            }
        }
    };
}
