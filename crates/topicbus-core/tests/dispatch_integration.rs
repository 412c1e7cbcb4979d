use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use topicbus_core::*;

const NO_ARG: TopicId = 1;
const WITH_DATA: TopicId = 2;
const SHARED: TopicId = 7;

#[derive(Debug)]
struct Scored {
    base: EventBase,
    points: u32,
}

event_data!(Scored => base);

#[derive(Debug)]
struct Bonus {
    scored: Scored,
    multiplier: u32,
}

event_data!(Bonus => scored);

#[derive(Debug)]
struct Chat {
    base: EventBase,
}

event_data!(Chat => base);

/// Shared call log so tests can check ordering across consumers.
type CallLog = Arc<Mutex<Vec<String>>>;

struct Listener {
    name: &'static str,
    log: CallLog,
}

impl Listener {
    fn new(name: &'static str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
        })
    }

    fn on_no_arg(&self) {
        self.log.lock().push(format!("{}:no_arg", self.name));
    }

    fn on_scored(&self, event: &Scored) {
        self.log
            .lock()
            .push(format!("{}:scored:{}", self.name, event.points));
    }

    fn on_shared(&self) {
        self.log.lock().push(format!("{}:shared", self.name));
    }
}

impl Subscriber for Listener {
    fn declare_handlers(table: &mut HandlerTable<Self>) {
        table.on(NO_ARG, "on_no_arg", Self::on_no_arg);
        table.on_data(WITH_DATA, "on_scored", Self::on_scored);
        table.on(SHARED, "on_shared", Self::on_shared);
    }
}

fn scored(points: u32) -> Scored {
    Scored {
        base: EventBase::new("test"),
        points,
    }
}

fn entries(log: &CallLog) -> Vec<String> {
    log.lock().clone()
}

#[test]
fn test_post_without_subscribers_has_no_effect() {
    let bus = EventBus::new();
    for topic in [0, 1, -5, i32::MAX] {
        assert_eq!(bus.post(topic), DispatchReport::default());
        assert_eq!(bus.post_with(topic, &scored(1)), DispatchReport::default());
    }
    assert_eq!(bus.total_subscriptions(), 0);
}

#[test]
fn test_zero_arg_handlers_run_in_registration_order() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let a = Listener::new("a", &log);
    let b = Listener::new("b", &log);

    bus.register(&a).expect("register a");
    bus.register(&b).expect("register b");

    let report = bus.post(SHARED);
    assert_eq!(report.delivered, 2);
    assert_eq!(entries(&log), vec!["a:shared", "b:shared"]);
}

#[test]
fn test_zero_arg_handler_ignores_payload() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let a = Listener::new("a", &log);
    bus.register(&a).expect("register");

    bus.post_with(NO_ARG, &Chat {
        base: EventBase::new("test"),
    });
    assert_eq!(entries(&log), vec!["a:no_arg"]);
}

#[test]
fn test_typed_handler_receives_matching_payload() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let a = Listener::new("a", &log);
    bus.register(&a).expect("register");

    let report = bus.post_with(WITH_DATA, &scored(10));
    assert_eq!(report.delivered, 1);
    assert_eq!(entries(&log), vec!["a:scored:10"]);
}

#[test]
fn test_typed_handler_receives_extending_payload() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let a = Listener::new("a", &log);
    bus.register(&a).expect("register");

    let bonus = Bonus {
        scored: scored(4),
        multiplier: 3,
    };
    assert_eq!(bonus.multiplier, 3);
    bus.post_with(WITH_DATA, &bonus);
    assert_eq!(entries(&log), vec!["a:scored:4"]);
}

#[test]
fn test_mismatched_payload_skips_only_that_handler() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let a = Listener::new("a", &log);
    bus.register(&a).expect("register");

    let chats = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&chats);
    let on_chat = Arc::new(move |_: &Chat| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    bus.subscribe_data::<Chat, _>(WITH_DATA, &on_chat);

    let report = bus.post_with(WITH_DATA, &Chat {
        base: EventBase::new("test"),
    });
    assert_eq!(report.skipped, 1);
    assert_eq!(report.delivered, 1);
    assert!(entries(&log).is_empty());
    assert_eq!(chats.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_payload_skips_required_handler() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let a = Listener::new("a", &log);
    bus.register(&a).expect("register");

    let report = bus.post(WITH_DATA);
    assert_eq!(report.skipped, 1);
    assert!(entries(&log).is_empty());
}

#[test]
fn test_optional_handler_runs_without_payload() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = Arc::new(move |event: Option<&Scored>| {
        sink.lock().push(event.map(|e| e.points));
    });
    bus.subscribe_optional::<Scored, _>(WITH_DATA, &handler);

    bus.post(WITH_DATA);
    bus.post_with(WITH_DATA, &scored(2));
    let report = bus.post_with(WITH_DATA, &Chat {
        base: EventBase::new("test"),
    });

    assert_eq!(report.skipped, 1);
    assert_eq!(*seen.lock(), vec![None, Some(2)]);
}

#[test]
fn test_register_then_unregister_restores_subscriber_set() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let resident = Listener::new("resident", &log);
    bus.register(&resident).expect("register resident");

    let before: Vec<_> = [NO_ARG, WITH_DATA, SHARED]
        .iter()
        .map(|t| bus.descriptors(*t))
        .collect();

    let visitor = Listener::new("visitor", &log);
    assert_eq!(bus.register(&visitor).expect("register visitor"), 3);
    assert_eq!(bus.unregister(&visitor).expect("unregister visitor"), 3);

    let after: Vec<_> = [NO_ARG, WITH_DATA, SHARED]
        .iter()
        .map(|t| bus.descriptors(*t))
        .collect();
    assert_eq!(before, after);
    assert!(bus.is_registered(&resident));
    assert!(!bus.is_registered(&visitor));
}

#[test]
fn test_unregister_is_noop_for_unknown_consumer() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let stranger = Listener::new("stranger", &log);

    assert_eq!(bus.unregister(&stranger).expect("unregister"), 0);
    bus.register(&stranger).expect("register");
    assert_eq!(bus.unregister(&stranger).expect("unregister"), 3);
    assert_eq!(bus.unregister(&stranger).expect("unregister again"), 0);
}

#[test]
fn test_unregistered_consumer_stops_receiving() {
    let bus = EventBus::new();
    let log = CallLog::default();
    let primary = Listener::new("primary", &log);
    let secondary = Listener::new("secondary", &log);
    bus.register(&primary).expect("register");
    bus.register(&secondary).expect("register");

    bus.post_with(WITH_DATA, &scored(1));
    bus.unregister(&primary).expect("unregister");
    bus.post_with(WITH_DATA, &scored(2));

    assert_eq!(
        entries(&log),
        vec!["primary:scored:1", "secondary:scored:1", "secondary:scored:2"]
    );
}

#[test]
fn test_subscribe_then_unsubscribe_by_handler_identity() {
    let bus = EventBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    let handler: DataCallback<Scored> = Arc::new(move |event: &Scored| {
        counter.fetch_add(event.points as usize, Ordering::SeqCst);
    });
    bus.subscribe_data(WITH_DATA, &handler);

    bus.post_with(WITH_DATA, &scored(5));
    assert_eq!(hits.load(Ordering::SeqCst), 5);

    assert_eq!(bus.unsubscribe(WITH_DATA, &handler), 1);
    bus.post_with(WITH_DATA, &scored(5));
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

#[test]
fn test_unsubscribe_ignores_equivalent_closures() {
    let bus = EventBus::new();
    let make = || -> Callback { Arc::new(|| {}) };
    let subscribed = make();
    let lookalike = make();
    bus.subscribe(NO_ARG, &subscribed);

    assert_eq!(bus.unsubscribe(NO_ARG, &lookalike), 0);
    assert_eq!(bus.unsubscribe(WITH_DATA, &subscribed), 0);
    assert_eq!(bus.subscriber_count(NO_ARG), 1);

    assert_eq!(bus.unsubscribe(NO_ARG, &subscribed), 1);
    assert_eq!(bus.subscriber_count(NO_ARG), 0);
}

#[test]
fn test_same_handler_subscribed_twice_is_removed_together() {
    let bus = EventBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let handler: Callback = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.subscribe(NO_ARG, &handler);
    bus.subscribe(NO_ARG, &handler);
    assert_eq!(bus.post(NO_ARG).delivered, 2);

    assert_eq!(bus.unsubscribe(NO_ARG, &handler), 2);
    assert_eq!(bus.post(NO_ARG).delivered, 0);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_direct_and_declared_handlers_share_topic_order() {
    let bus = EventBus::new();
    let log = CallLog::default();

    let sink = Arc::clone(&log);
    let first: Callback = Arc::new(move || sink.lock().push("direct".to_string()));
    bus.subscribe(SHARED, &first);

    let a = Listener::new("a", &log);
    bus.register(&a).expect("register");

    bus.post(SHARED);
    assert_eq!(entries(&log), vec!["direct", "a:shared"]);
}

#[test]
fn test_concurrent_posts_deliver_every_event() {
    let bus = Arc::new(EventBus::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let handler: DataCallback<Scored> = Arc::new(move |event: &Scored| {
        counter.fetch_add(event.points as usize, Ordering::SeqCst);
    });
    bus.subscribe_data(WITH_DATA, &handler);

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let bus = Arc::clone(&bus);
            std::thread::spawn(move || {
                for _ in 0..250 {
                    bus.post_with(WITH_DATA, &scored(1));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 1000);
    assert_eq!(bus.stats().delivered, 1000);
}
