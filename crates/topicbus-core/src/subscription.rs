//! Subscription records.
//!
//! A subscription is built once, when a consumer is registered or a callable is
//! subscribed, and already captures everything needed to reach the handler.
//! Dispatch only calls the bound thunk.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::event::EventData;
use crate::handler::{
    deliver_optional, deliver_required, Arity, Delivery, HandlerDescriptor, HandlerMethod,
    PayloadSpec, Subscriber, TopicId,
};

type NoArgThunk = Box<dyn Fn() + Send + Sync>;
type PayloadThunk = Box<dyn Fn(Option<&dyn EventData>) -> Delivery + Send + Sync>;

/// Pointer identity of a shared allocation.
pub(crate) fn identity<T: ?Sized>(shared: &Arc<T>) -> usize {
    Arc::as_ptr(shared).cast::<()>() as usize
}

/// Bound invocation strategy; exactly one per subscription.
enum Invoker {
    NoArg(NoArgThunk),
    Payload(PayloadThunk),
}

/// Who created the subscription, for identity-based removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    /// A registered consumer instance.
    Consumer(usize),
    /// A directly subscribed callable.
    Callable(usize),
}

/// Live binding of one handler to one topic
pub(crate) struct Subscription {
    descriptor: HandlerDescriptor,
    owner: Owner,
    invoker: Invoker,
}

impl Subscription {
    /// Bind a discovered method to a consumer instance
    pub(crate) fn for_consumer<C: Subscriber>(consumer: &Arc<C>, method: &HandlerMethod<C>) -> Self {
        let target = Arc::clone(consumer);
        let call = Arc::clone(&method.call);
        let invoker = match method.descriptor.arity {
            Arity::Zero => Invoker::NoArg(Box::new(move || {
                call(&*target, None);
            })),
            Arity::One => Invoker::Payload(Box::new(move |payload: Option<&dyn EventData>| {
                call(&*target, payload)
            })),
        };

        Self {
            descriptor: method.descriptor.clone(),
            owner: Owner::Consumer(identity(consumer)),
            invoker,
        }
    }

    /// Bind a zero-argument callable
    pub(crate) fn for_callable<F>(topic: TopicId, handler: &Arc<F>) -> Self
    where
        F: Fn() + Send + Sync + ?Sized + 'static,
    {
        let target = Arc::clone(handler);
        Self {
            descriptor: HandlerDescriptor::no_arg(topic, type_name::<F>()),
            owner: Owner::Callable(identity(handler)),
            invoker: Invoker::NoArg(Box::new(move || target())),
        }
    }

    /// Bind a callable that requires a `P`
    pub(crate) fn for_data_callable<P, F>(topic: TopicId, handler: &Arc<F>) -> Self
    where
        P: EventData,
        F: Fn(&P) + Send + Sync + ?Sized + 'static,
    {
        let target = Arc::clone(handler);
        Self {
            descriptor: HandlerDescriptor::with_payload(
                topic,
                type_name::<F>(),
                PayloadSpec::required::<P>(),
            ),
            owner: Owner::Callable(identity(handler)),
            invoker: Invoker::Payload(Box::new(move |payload: Option<&dyn EventData>| {
                deliver_required::<P>(payload, |data| target(data))
            })),
        }
    }

    /// Bind a callable that accepts `Option<&P>`
    pub(crate) fn for_optional_callable<P, F>(topic: TopicId, handler: &Arc<F>) -> Self
    where
        P: EventData,
        F: Fn(Option<&P>) + Send + Sync + ?Sized + 'static,
    {
        let target = Arc::clone(handler);
        Self {
            descriptor: HandlerDescriptor::with_payload(
                topic,
                type_name::<F>(),
                PayloadSpec::optional::<P>(),
            ),
            owner: Owner::Callable(identity(handler)),
            invoker: Invoker::Payload(Box::new(move |payload: Option<&dyn EventData>| {
                deliver_optional::<P>(payload, |data| target(data))
            })),
        }
    }

    pub(crate) fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    pub(crate) fn owner(&self) -> Owner {
        self.owner
    }

    /// Run the handler. Zero-argument handlers ignore the payload.
    pub(crate) fn invoke(&self, payload: Option<&dyn EventData>) -> Delivery {
        match &self.invoker {
            Invoker::NoArg(call) => {
                call();
                Delivery::Delivered
            }
            Invoker::Payload(call) => call(payload),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("descriptor", &self.descriptor)
            .field("owner", &self.owner)
            .finish()
    }
}
