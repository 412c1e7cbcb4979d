//! Sample listeners and the register, post, unregister scenario the binary runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use topicbus_core::{BusError, EventBase, EventBus, HandlerTable, Subscriber, TopicId};

/// Topic posted without a payload
pub const NO_ARG: TopicId = 1;
/// Topic posted with an [`EventBase`] payload
pub const WITH_DATA: TopicId = 2;

/// Listens to both topics
#[derive(Debug, Default)]
pub struct PrimaryListener {
    no_arg: AtomicUsize,
    with_data: AtomicUsize,
}

impl PrimaryListener {
    fn on_no_arg(&self) {
        self.no_arg.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Primary: no-arg event received");
    }

    fn on_data(&self, event: &EventBase) {
        self.with_data.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "Primary: data event received from {} at {}",
            event.source,
            event.time.to_rfc3339()
        );
    }

    pub fn no_arg_count(&self) -> usize {
        self.no_arg.load(Ordering::SeqCst)
    }

    pub fn data_count(&self) -> usize {
        self.with_data.load(Ordering::SeqCst)
    }
}

impl Subscriber for PrimaryListener {
    fn declare_handlers(table: &mut HandlerTable<Self>) {
        table.on(NO_ARG, "on_no_arg", Self::on_no_arg);
        table.on_data(WITH_DATA, "on_data", Self::on_data);
    }
}

/// Listens to the data topic only
#[derive(Debug, Default)]
pub struct SecondaryListener {
    with_data: AtomicUsize,
}

impl SecondaryListener {
    fn on_data(&self, _event: &EventBase) {
        self.with_data.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Secondary: data event received");
    }

    pub fn data_count(&self) -> usize {
        self.with_data.load(Ordering::SeqCst)
    }
}

impl Subscriber for SecondaryListener {
    fn declare_handlers(table: &mut HandlerTable<Self>) {
        table.on_data(WITH_DATA, "on_data", Self::on_data);
    }
}

/// Deliveries observed by each listener once the scenario finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub primary_no_arg: usize,
    pub primary_data: usize,
    pub secondary_data: usize,
}

/// Register both listeners, post both topics, unregister the primary
/// listener and post again. Only the secondary listener sees the second round.
pub fn run_scenario(bus: &EventBus) -> Result<ScenarioOutcome, BusError> {
    let primary = Arc::new(PrimaryListener::default());
    let secondary = Arc::new(SecondaryListener::default());

    bus.register(&primary)?;
    bus.register(&secondary)?;
    tracing::info!("Registered primary and secondary listeners");

    let data = EventBase::new("demo");
    bus.post(NO_ARG);
    bus.post_with(WITH_DATA, &data);

    bus.unregister(&primary)?;
    tracing::info!("Unregistered primary listener, posting again");

    bus.post(NO_ARG);
    bus.post_with(WITH_DATA, &data);

    bus.unregister(&secondary)?;

    Ok(ScenarioOutcome {
        primary_no_arg: primary.no_arg_count(),
        primary_data: primary.data_count(),
        secondary_data: secondary.data_count(),
    })
}
