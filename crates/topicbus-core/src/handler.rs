//! Handler declarations and descriptors.
//!
//! A consumer type lists its handler methods by implementing [`Subscriber`].
//! The bus calls [`Subscriber::declare_handlers`] once per type and turns every
//! declaration into a [`HandlerMethod`]: a validated [`HandlerDescriptor`] plus
//! the callable used to reach the method.
//!
//! ```rust,ignore
//! struct Hud;
//!
//! impl Subscriber for Hud {
//!     fn declare_handlers(table: &mut HandlerTable<Self>) {
//!         table.on(topics::RESET, "on_reset", Self::on_reset);
//!         table.on_data(topics::SCORE, "on_score", Self::on_score);
//!     }
//! }
//! ```

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::event::{downcast_payload, EventData};

/// Integer key identifying an event category
pub type TopicId = i32;

/// Callable behind a declared handler method.
///
/// Receives the consumer and the posted payload, and reports whether the
/// payload was accepted.
pub type MethodThunk<C> = Arc<dyn Fn(&C, Option<&dyn EventData>) -> Delivery + Send + Sync>;

/// Outcome of offering a payload to one handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The handler ran.
    Delivered,
    /// The handler was not invoked.
    Skipped(SkipReason),
}

/// Why a handler was not invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The handler requires a payload and none was posted.
    MissingPayload,
    /// The posted payload neither is nor extends the declared type.
    TypeMismatch {
        /// Concrete type of the posted payload.
        actual: &'static str,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingPayload => write!(f, "payload is missing"),
            SkipReason::TypeMismatch { actual } => write!(f, "got '{}'", actual),
        }
    }
}

/// Number of parameters a handler takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// No parameters; the payload is ignored.
    Zero,
    /// One payload parameter.
    One,
}

impl Arity {
    /// Parameter count as a number
    pub fn count(self) -> usize {
        match self {
            Arity::Zero => 0,
            Arity::One => 1,
        }
    }
}

/// Declared payload parameter of a one-argument handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadSpec {
    /// Type id of the declared payload type.
    pub type_id: TypeId,
    /// Name of the declared payload type.
    pub type_name: &'static str,
    /// Whether the handler accepts an absent payload.
    pub optional: bool,
}

impl PayloadSpec {
    /// Spec for a handler taking `&P`
    pub fn required<P: EventData>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
            optional: false,
        }
    }

    /// Spec for a handler taking `Option<&P>`
    pub fn optional<P: EventData>() -> Self {
        Self {
            optional: true,
            ..Self::required::<P>()
        }
    }
}

/// What a declared parameter is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// An event payload type.
    Payload {
        /// Whether absence is accepted.
        optional: bool,
    },
    /// Any type that is not an event payload.
    Other,
}

/// One declared handler parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDecl {
    /// Type id of the parameter type.
    pub type_id: TypeId,
    /// Name of the parameter type.
    pub type_name: &'static str,
    /// Payload or not.
    pub kind: ParamKind,
}

impl ParamDecl {
    /// A required payload parameter of type `P`
    pub fn payload<P: EventData>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
            kind: ParamKind::Payload { optional: false },
        }
    }

    /// A payload parameter of type `P` that accepts absence
    pub fn optional_payload<P: EventData>() -> Self {
        Self {
            kind: ParamKind::Payload { optional: true },
            ..Self::payload::<P>()
        }
    }

    /// A parameter of a non-payload type
    pub fn other<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            kind: ParamKind::Other,
        }
    }
}

/// Validated metadata for one handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    /// Topic the handler listens to.
    pub topic: TopicId,
    /// Qualified handler name, used in diagnostics.
    pub method: String,
    /// Parameter count.
    pub arity: Arity,
    /// Declared payload, present iff `arity` is `One`.
    pub payload: Option<PayloadSpec>,
    /// Reserved; dispatch ignores it.
    pub priority: i32,
    /// Reserved; dispatch ignores it.
    pub sticky: bool,
}

impl HandlerDescriptor {
    /// Descriptor for a zero-argument handler
    pub fn no_arg(topic: TopicId, method: impl Into<String>) -> Self {
        Self {
            topic,
            method: method.into(),
            arity: Arity::Zero,
            payload: None,
            priority: 0,
            sticky: false,
        }
    }

    /// Descriptor for a one-argument handler
    pub fn with_payload(topic: TopicId, method: impl Into<String>, payload: PayloadSpec) -> Self {
        Self {
            arity: Arity::One,
            payload: Some(payload),
            ..Self::no_arg(topic, method)
        }
    }

    /// Name of the declared payload type, for diagnostics
    pub fn expected_type(&self) -> &'static str {
        self.payload.map_or("()", |spec| spec.type_name)
    }
}

/// Declared handler with its callable, as produced by discovery
pub struct HandlerMethod<C> {
    /// Validated metadata.
    pub descriptor: HandlerDescriptor,
    pub(crate) call: MethodThunk<C>,
}

impl<C> Clone for HandlerMethod<C> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            call: Arc::clone(&self.call),
        }
    }
}

impl<C> fmt::Debug for HandlerMethod<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Consumer type whose methods handle events
///
/// This is the declarative marker that tells the bus which methods handle
/// which topics. The declarations are read once per type and cached.
/// Implementations must not call back into the bus.
pub trait Subscriber: Sized + Send + Sync + 'static {
    /// List this type's handler methods
    fn declare_handlers(table: &mut HandlerTable<Self>);
}

/// One entry in a [`HandlerTable`]
pub struct HandlerDecl<C> {
    topic: TopicId,
    method: &'static str,
    params: Vec<ParamDecl>,
    priority: i32,
    sticky: bool,
    call: MethodThunk<C>,
}

impl<C> HandlerDecl<C> {
    /// Set the reserved priority value
    pub fn priority(&mut self, priority: i32) -> &mut Self {
        self.priority = priority;
        self
    }

    /// Set the reserved sticky flag
    pub fn sticky(&mut self) -> &mut Self {
        self.sticky = true;
        self
    }

    /// Validate the declaration and build its descriptor.
    fn into_method(self) -> Result<HandlerMethod<C>, ConfigurationError> {
        let method = format!("{}::{}", type_name::<C>(), self.method);
        let descriptor = match self.params.as_slice() {
            [] => HandlerDescriptor::no_arg(self.topic, method),
            [param] => match param.kind {
                ParamKind::Payload { optional } => HandlerDescriptor::with_payload(
                    self.topic,
                    method,
                    PayloadSpec {
                        type_id: param.type_id,
                        type_name: param.type_name,
                        optional,
                    },
                ),
                ParamKind::Other => {
                    return Err(ConfigurationError::InvalidParameterType {
                        method,
                        found: param.type_name.to_string(),
                    })
                }
            },
            params => {
                return Err(ConfigurationError::TooManyParameters {
                    method,
                    count: params.len(),
                })
            }
        };

        Ok(HandlerMethod {
            descriptor: HandlerDescriptor {
                priority: self.priority,
                sticky: self.sticky,
                ..descriptor
            },
            call: self.call,
        })
    }
}

/// Registration table filled in by [`Subscriber::declare_handlers`]
pub struct HandlerTable<C> {
    decls: Vec<HandlerDecl<C>>,
}

impl<C: Subscriber> HandlerTable<C> {
    pub(crate) fn new() -> Self {
        Self { decls: Vec::new() }
    }

    /// Declare a handler that takes no payload
    pub fn on<F>(&mut self, topic: TopicId, method: &'static str, handler: F) -> &mut HandlerDecl<C>
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        self.declare(topic, method, Vec::new(), move |consumer: &C, _| {
            handler(consumer);
            Delivery::Delivered
        })
    }

    /// Declare a handler that requires a payload of type `P`
    pub fn on_data<P, F>(
        &mut self,
        topic: TopicId,
        method: &'static str,
        handler: F,
    ) -> &mut HandlerDecl<C>
    where
        P: EventData,
        F: Fn(&C, &P) + Send + Sync + 'static,
    {
        self.declare(
            topic,
            method,
            vec![ParamDecl::payload::<P>()],
            move |consumer: &C, payload: Option<&dyn EventData>| {
                deliver_required::<P>(payload, |data| handler(consumer, data))
            },
        )
    }

    /// Declare a handler for payloads of type `P` that also runs when no
    /// payload is posted
    pub fn on_optional<P, F>(
        &mut self,
        topic: TopicId,
        method: &'static str,
        handler: F,
    ) -> &mut HandlerDecl<C>
    where
        P: EventData,
        F: Fn(&C, Option<&P>) + Send + Sync + 'static,
    {
        self.declare(
            topic,
            method,
            vec![ParamDecl::optional_payload::<P>()],
            move |consumer: &C, payload: Option<&dyn EventData>| {
                deliver_optional::<P>(payload, |data| handler(consumer, data))
            },
        )
    }

    /// Declare a handler from an explicit parameter list.
    ///
    /// For handlers described at runtime. The parameter list is validated
    /// during discovery; `handler` does its own payload matching.
    pub fn declare<F>(
        &mut self,
        topic: TopicId,
        method: &'static str,
        params: Vec<ParamDecl>,
        handler: F,
    ) -> &mut HandlerDecl<C>
    where
        F: Fn(&C, Option<&dyn EventData>) -> Delivery + Send + Sync + 'static,
    {
        self.decls.push(HandlerDecl {
            topic,
            method,
            params,
            priority: 0,
            sticky: false,
            call: Arc::new(handler),
        });
        let last = self.decls.len() - 1;
        &mut self.decls[last]
    }

    /// Validate every declaration; the first malformed one fails the table.
    pub(crate) fn build(self) -> Result<Vec<HandlerMethod<C>>, ConfigurationError> {
        self.decls.into_iter().map(HandlerDecl::into_method).collect()
    }
}

/// Offer `payload` to a handler that requires a `P`.
pub(crate) fn deliver_required<'a, P: EventData>(
    payload: Option<&'a dyn EventData>,
    deliver: impl FnOnce(&'a P),
) -> Delivery {
    let Some(data) = payload else {
        return Delivery::Skipped(SkipReason::MissingPayload);
    };
    match downcast_payload::<P>(data) {
        Some(typed) => {
            deliver(typed);
            Delivery::Delivered
        }
        None => Delivery::Skipped(SkipReason::TypeMismatch {
            actual: data.type_name(),
        }),
    }
}

/// Offer `payload` to a handler that accepts `Option<&P>`.
pub(crate) fn deliver_optional<'a, P: EventData>(
    payload: Option<&'a dyn EventData>,
    deliver: impl FnOnce(Option<&'a P>),
) -> Delivery {
    match payload {
        None => {
            deliver(None);
            Delivery::Delivered
        }
        Some(data) => deliver_required::<P>(Some(data), |typed| deliver(Some(typed))),
    }
}
