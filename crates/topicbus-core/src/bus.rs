//! Event Bus implementation.
//!
//! Provides the core EventBus struct and global instance for
//! topic-based event distribution.

use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::EventBusConfig;
use crate::discovery::DiscoveryCache;
use crate::error::{BusError, Result};
use crate::event::EventData;
use crate::handler::{Delivery, HandlerDescriptor, Subscriber, TopicId};
use crate::subscription::{identity, Owner, Subscription};

/// Subscriptions for one topic, in call order.
///
/// Shared with in-flight dispatches; writers copy on change.
type TopicList = Arc<Vec<Arc<Subscription>>>;

/// What happened during one `post`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that ran.
    pub delivered: usize,
    /// Handlers skipped because the payload was missing or of the wrong type.
    pub skipped: usize,
    /// Handlers that panicked (only counted when panics are isolated).
    pub failed: usize,
}

impl DispatchReport {
    /// Number of subscriptions the post reached
    pub fn total(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// Snapshot of the bus counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Calls to `post`, including posts to topics without subscribers.
    pub posted: u64,
    /// Handler invocations that completed.
    pub delivered: u64,
    /// Handlers skipped for payload reasons.
    pub skipped: u64,
    /// Handlers that panicked.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    posted: AtomicU64,
    delivered: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, report: &DispatchReport) {
        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.skipped.fetch_add(report.skipped as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> BusStats {
        BusStats {
            posted: self.posted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Topic-keyed event dispatcher
///
/// Handlers are called synchronously on the posting thread, in the order they
/// were added to the topic. The registry sits behind a reader-biased lock:
/// concurrent posts run in parallel, registry changes are serialized.
pub struct EventBus {
    /// Subscriptions per topic
    topics: RwLock<HashMap<TopicId, TopicList>>,
    /// Declared handlers per consumer type
    discovery: DiscoveryCache,
    /// Dispatch counters
    counters: Counters,
    /// Configuration
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            topics: RwLock::new(HashMap::with_capacity(config.initial_topic_capacity)),
            discovery: DiscoveryCache::new(),
            counters: Counters::default(),
            config,
        }
    }

    /// Subscribe every handler declared by `C` on behalf of `consumer`
    ///
    /// Returns the number of subscriptions created. Registering the same
    /// consumer twice doubles its invocations unless
    /// [`EventBusConfig::reject_duplicate_registration`] is set.
    pub fn register<C: Subscriber>(&self, consumer: &Arc<C>) -> Result<usize> {
        let methods = self.discovery.discover::<C>()?;
        let owner = Owner::Consumer(identity(consumer));

        let mut topics = self.topics.write();
        let already = methods
            .iter()
            .any(|m| Self::owned_in(&topics, m.descriptor.topic, owner));
        if already {
            if self.config.reject_duplicate_registration {
                return Err(BusError::AlreadyRegistered {
                    consumer: type_name::<C>().to_string(),
                });
            }
            tracing::debug!(
                "{} registered again, its handlers will run once per registration",
                type_name::<C>()
            );
        }

        for method in methods.iter() {
            let subscription = Arc::new(Subscription::for_consumer(consumer, method));
            Arc::make_mut(topics.entry(method.descriptor.topic).or_default()).push(subscription);
        }

        tracing::debug!(
            "Registered {} handler(s) for {}",
            methods.len(),
            type_name::<C>()
        );
        Ok(methods.len())
    }

    /// Remove every subscription owned by `consumer`
    ///
    /// Returns the number removed. Unregistering a consumer that is not
    /// registered removes nothing and is not an error.
    pub fn unregister<C: Subscriber>(&self, consumer: &Arc<C>) -> Result<usize> {
        let methods = self.discovery.discover::<C>()?;
        let owner = Owner::Consumer(identity(consumer));

        let mut topics = self.topics.write();
        let removed: usize = methods
            .iter()
            .map(|m| Self::remove_owned(&mut topics, m.descriptor.topic, owner))
            .sum();

        if removed > 0 {
            tracing::debug!(
                "Unregistered {} handler(s) for {}",
                removed,
                type_name::<C>()
            );
        }
        Ok(removed)
    }

    /// Subscribe a handler that takes no payload
    ///
    /// Keep the `Arc`: it is the key for [`EventBus::unsubscribe`].
    pub fn subscribe<F>(&self, topic: TopicId, handler: &Arc<F>)
    where
        F: Fn() + Send + Sync + ?Sized + 'static,
    {
        self.insert(topic, Subscription::for_callable(topic, handler));
    }

    /// Subscribe a handler that requires a payload of type `P`
    ///
    /// Payloads of other types, and posts without a payload, skip it.
    pub fn subscribe_data<P, F>(&self, topic: TopicId, handler: &Arc<F>)
    where
        P: EventData,
        F: Fn(&P) + Send + Sync + ?Sized + 'static,
    {
        self.insert(topic, Subscription::for_data_callable::<P, F>(topic, handler));
    }

    /// Subscribe a handler for payloads of type `P` that also runs, with
    /// `None`, when no payload is posted
    pub fn subscribe_optional<P, F>(&self, topic: TopicId, handler: &Arc<F>)
    where
        P: EventData,
        F: Fn(Option<&P>) + Send + Sync + ?Sized + 'static,
    {
        self.insert(
            topic,
            Subscription::for_optional_callable::<P, F>(topic, handler),
        );
    }

    /// Remove the subscriptions made with this exact handler `Arc`
    ///
    /// Handlers are matched by allocation, not by behavior: an equivalent
    /// closure in a different `Arc` is a different handler. Returns the number
    /// removed.
    pub fn unsubscribe<F>(&self, topic: TopicId, handler: &Arc<F>) -> usize
    where
        F: ?Sized,
    {
        let owner = Owner::Callable(identity(handler));
        let removed = Self::remove_owned(&mut self.topics.write(), topic, owner);
        if removed > 0 {
            tracing::debug!("Subscription removed from topic {}", topic);
        }
        removed
    }

    /// Post an event without a payload
    pub fn post(&self, topic: TopicId) -> DispatchReport {
        self.dispatch(topic, None)
    }

    /// Post an event carrying `payload`
    pub fn post_with(&self, topic: TopicId, payload: &dyn EventData) -> DispatchReport {
        self.dispatch(topic, Some(payload))
    }

    /// Offer `payload` to every subscription on `topic`, in order
    ///
    /// Handlers that cannot take the payload are skipped with a warning and
    /// dispatch moves on. A topic without subscriptions is a no-op.
    pub fn dispatch(&self, topic: TopicId, payload: Option<&dyn EventData>) -> DispatchReport {
        self.counters.posted.fetch_add(1, Ordering::Relaxed);

        let mut report = DispatchReport::default();
        let Some(subscriptions) = self.snapshot(topic) else {
            return report;
        };

        for subscription in subscriptions.iter() {
            match self.invoke(subscription, payload) {
                Ok(Delivery::Delivered) => report.delivered += 1,
                Ok(Delivery::Skipped(reason)) => {
                    let descriptor = subscription.descriptor();
                    tracing::warn!(
                        "Skip invoke: topic {} expects '{}', {}. Handler: {}",
                        topic,
                        descriptor.expected_type(),
                        reason,
                        descriptor.method
                    );
                    report.skipped += 1;
                }
                Err(message) => {
                    tracing::error!(
                        "Handler {} panicked on topic {}: {}",
                        subscription.descriptor().method,
                        topic,
                        message
                    );
                    report.failed += 1;
                }
            }
        }

        self.counters.record(&report);
        report
    }

    /// Number of subscriptions on `topic`
    pub fn subscriber_count(&self, topic: TopicId) -> usize {
        self.topics.read().get(&topic).map_or(0, |list| list.len())
    }

    /// Number of subscriptions across all topics
    pub fn total_subscriptions(&self) -> usize {
        self.topics.read().values().map(|list| list.len()).sum()
    }

    /// Topics with at least one subscription, ascending
    pub fn topics(&self) -> Vec<TopicId> {
        let mut topics: Vec<TopicId> = self
            .topics
            .read()
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(topic, _)| *topic)
            .collect();
        topics.sort_unstable();
        topics
    }

    /// Descriptors of the subscriptions on `topic`, in call order
    pub fn descriptors(&self, topic: TopicId) -> Vec<HandlerDescriptor> {
        self.snapshot(topic)
            .map(|list| list.iter().map(|s| s.descriptor().clone()).collect())
            .unwrap_or_default()
    }

    /// Whether `consumer` owns at least one subscription
    pub fn is_registered<C: Subscriber>(&self, consumer: &Arc<C>) -> bool {
        let owner = Owner::Consumer(identity(consumer));
        self.topics
            .read()
            .values()
            .any(|list| list.iter().any(|s| s.owner() == owner))
    }

    /// Drop every subscription. Cached discovery results are kept.
    pub fn clear(&self) {
        self.topics.write().clear();
        tracing::debug!("All subscriptions cleared");
    }

    /// Get a snapshot of the dispatch counters
    pub fn stats(&self) -> BusStats {
        self.counters.snapshot()
    }

    /// Get the discovery cache
    pub fn discovery(&self) -> &DiscoveryCache {
        &self.discovery
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn insert(&self, topic: TopicId, subscription: Subscription) {
        let mut topics = self.topics.write();
        Arc::make_mut(topics.entry(topic).or_default()).push(Arc::new(subscription));
        tracing::debug!("Subscription added on topic {}", topic);
    }

    /// The topic's list as of now; `None` when nobody listens.
    fn snapshot(&self, topic: TopicId) -> Option<TopicList> {
        self.topics
            .read()
            .get(&topic)
            .filter(|list| !list.is_empty())
            .cloned()
    }

    fn invoke(
        &self,
        subscription: &Subscription,
        payload: Option<&dyn EventData>,
    ) -> std::result::Result<Delivery, String> {
        if !self.config.isolate_panics {
            return Ok(subscription.invoke(payload));
        }
        panic::catch_unwind(AssertUnwindSafe(|| subscription.invoke(payload)))
            .map_err(|panic| panic_message(panic.as_ref()).to_string())
    }

    fn owned_in(topics: &HashMap<TopicId, TopicList>, topic: TopicId, owner: Owner) -> bool {
        topics
            .get(&topic)
            .is_some_and(|list| list.iter().any(|s| s.owner() == owner))
    }

    fn remove_owned(
        topics: &mut HashMap<TopicId, TopicList>,
        topic: TopicId,
        owner: Owner,
    ) -> usize {
        if !Self::owned_in(topics, topic, owner) {
            return 0;
        }
        let Some(list) = topics.get_mut(&topic) else {
            return 0;
        };

        let before = list.len();
        Arc::make_mut(list).retain(|s| s.owner() != owner);
        let removed = before - list.len();
        if list.is_empty() {
            topics.remove(&topic);
        }
        removed
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.total_subscriptions())
            .field("discovery", &self.discovery)
            .field("config", &self.config)
            .finish()
    }
}

/// Global event bus instance
static EVENT_BUS: OnceLock<EventBus> = OnceLock::new();

/// Get or initialize the global event bus
///
/// For code that has no bus handed to it. Prefer passing an `EventBus`
/// explicitly where the call graph allows it.
pub fn event_bus() -> &'static EventBus {
    EVENT_BUS.get_or_init(EventBus::new)
}

/// Initialize the global event bus with custom configuration
///
/// Must be called before any calls to `event_bus()`. Returns the rejected
/// configuration if the event bus has already been initialized.
pub fn init_event_bus(config: EventBusConfig) -> std::result::Result<(), EventBusConfig> {
    EVENT_BUS
        .set(EventBus::with_config(config))
        .map_err(|bus| bus.config)
}

/// Convenience macro to post an event on the global event bus
#[macro_export]
macro_rules! emit {
    ($topic:expr) => {
        $crate::bus::event_bus().post($topic)
    };
    ($topic:expr, $payload:expr) => {
        $crate::bus::event_bus().post_with($topic, $payload)
    };
}

/// Convenience macro to subscribe a no-payload handler on the global event bus
#[macro_export]
macro_rules! on_event {
    ($topic:expr, $handler:expr) => {
        $crate::bus::event_bus().subscribe($topic, $handler)
    };
}
