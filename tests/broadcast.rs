//! End-to-end scenarios driven by tokio's paused clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fanvisor::{
    Bus, Config, DeliveryMode, Dispatcher, Event, EventKind, Hub, Message, Observe, Registry,
    RuntimeError, Subscriber,
};
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

fn cfg(max_joins: usize) -> Config {
    Config {
        join_interval: Duration::from_secs(1),
        dispatch_interval: Duration::from_millis(500),
        max_joins,
        grace: Duration::from_secs(1),
        bus_capacity: 8192,
        ..Config::default()
    }
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn position(events: &[Event], kind: EventKind, subscriber: Option<&str>) -> Option<usize> {
    events
        .iter()
        .position(|e| e.kind == kind && (subscriber.is_none() || e.subscriber.as_deref() == subscriber))
}

fn joined(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::SubscriberJoined)
        .filter_map(|e| e.subscriber.as_deref().map(str::to_string))
        .collect()
}

/// Checks fan-out against the event log.
///
/// For every joined subscriber: no duplicates, increasing order, nothing dispatched
/// before its join, and every tick up to `settled_seq` received exactly once.
fn assert_fan_out(events: &[Event], settled_seq: u64) {
    let mut received: HashMap<&str, Vec<u64>> = HashMap::new();
    for e in events.iter().filter(|e| e.kind == EventKind::MessageReceived) {
        received
            .entry(e.subscriber.as_deref().expect("subscriber"))
            .or_default()
            .push(e.msg_seq.expect("seq"));
    }

    for name in joined(events) {
        let join_at = position(events, EventKind::SubscriberJoined, Some(&name)).expect("joined");
        let expected: Vec<u64> = events
            .iter()
            .enumerate()
            .filter(|(i, e)| *i > join_at && e.kind == EventKind::MessageDispatched)
            .filter_map(|(_, e)| e.msg_seq)
            .collect();
        let got = received.get(name.as_str()).cloned().unwrap_or_default();

        assert!(got.windows(2).all(|w| w[0] < w[1]), "{name}: out of order {got:?}");
        for seq in &got {
            assert!(expected.contains(seq), "{name}: received {seq} dispatched before join");
        }
        for seq in expected.iter().filter(|s| **s <= settled_seq) {
            assert!(got.contains(seq), "{name}: missed {seq}; got {got:?}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn joins_produce_deterministic_names() {
    let hub = Hub::builder(cfg(10)).build().expect("valid config");

    hub.run_until(sleep(Duration::from_millis(4_500)))
        .await
        .expect("clean shutdown");

    assert_eq!(
        hub.registry().names().await,
        vec!["worker0", "worker1", "worker2", "worker3"]
    );
}

#[tokio::test(start_paused = true)]
async fn join_cap_stops_membership() {
    let hub = Hub::builder(cfg(2)).build().expect("valid config");
    let mut rx = hub.subscribe_events();

    hub.run_until(sleep(Duration::from_millis(5_200)))
        .await
        .expect("clean shutdown");

    let events = drain(&mut rx);
    assert_eq!(hub.registry().len().await, 2);
    let finished = position(&events, EventKind::MembershipFinished, None).expect("finished");
    let shutdown = position(&events, EventKind::ShutdownRequested, None).expect("shutdown");
    assert!(finished < shutdown, "cap reached before shutdown");
    assert_eq!(events[finished].count, Some(2));
}

#[tokio::test(start_paused = true)]
async fn shutdown_at_two_and_a_half_seconds() {
    let hub = Hub::builder(cfg(3)).build().expect("valid config");
    let mut rx = hub.subscribe_events();

    hub.run_until(sleep(Duration::from_millis(2_500)))
        .await
        .expect("clean shutdown");

    let events = drain(&mut rx);
    let shutdown = position(&events, EventKind::ShutdownRequested, None).expect("shutdown");

    // Joins at 1s and 2s; the 3s join never happens.
    assert_eq!(joined(&events), vec!["worker0", "worker1"]);
    assert!(
        events[shutdown..]
            .iter()
            .all(|e| e.kind != EventKind::SubscriberJoined)
    );

    let ticks = events
        .iter()
        .filter(|e| e.kind == EventKind::MessageDispatched)
        .count();
    assert!(ticks >= 4, "only {ticks} ticks before shutdown");

    assert_fan_out(&events, 4);
}

#[tokio::test(start_paused = true)]
async fn every_registered_subscriber_receives_each_tick_once() {
    let hub = Hub::builder(cfg(3)).build().expect("valid config");
    let mut rx = hub.subscribe_events();

    hub.run_until(sleep(Duration::from_millis(5_250)))
        .await
        .expect("clean shutdown");

    let events = drain(&mut rx);
    assert_eq!(joined(&events).len(), 3);
    assert_fan_out(&events, 10);

    // Ticks 7..=10 happen after the third join: all three subscribers receive them.
    for seq in 7..=10 {
        let receipts = events
            .iter()
            .filter(|e| e.kind == EventKind::MessageReceived && e.msg_seq == Some(seq))
            .count();
        assert_eq!(receipts, 3, "tick {seq}");
    }
}

#[tokio::test(start_paused = true)]
async fn double_shutdown_is_idempotent_and_bounded() {
    let hub = Hub::builder(cfg(10)).build().expect("valid config");
    let mut rx = hub.subscribe_events();

    let runner = {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move { hub.run_until(std::future::pending::<()>()).await })
    };
    sleep(Duration::from_millis(3_200)).await;

    let started = Instant::now();
    hub.shutdown();
    hub.shutdown();
    runner.await.expect("join").expect("clean shutdown");
    hub.shutdown();

    assert!(started.elapsed() <= hub.config().grace);
    assert!(hub.is_shutdown());
    assert_eq!(hub.alive().count(), 0);

    let events = drain(&mut rx);
    let requests = events
        .iter()
        .filter(|e| e.kind == EventKind::ShutdownRequested)
        .count();
    assert_eq!(requests, 1);
    assert!(position(&events, EventKind::DispatcherStopped, None).is_some());
    assert!(position(&events, EventKind::AllStoppedWithin, None).is_some());
    for name in joined(&events) {
        assert!(
            position(&events, EventKind::SubscriberStopped, Some(&name)).is_some(),
            "{name} did not stop"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn stuck_loop_exceeds_grace() {
    let hub = Hub::builder(cfg(10)).build().expect("valid config");
    let _stuck = hub.alive().enter("stuck");

    let err = hub
        .run_until(sleep(Duration::from_millis(1_200)))
        .await
        .expect_err("grace exceeded");

    match err {
        RuntimeError::GraceExceeded { grace, stuck } => {
            assert_eq!(grace, Duration::from_secs(1));
            assert_eq!(stuck, vec!["stuck"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn stalled_subscriber() -> Arc<Subscriber> {
    // Never started: its inbox is never drained.
    Subscriber::new("stalled", 1, CancellationToken::new(), Bus::new(1))
}

#[tokio::test(start_paused = true)]
async fn locked_delivery_blocks_joins_behind_stalled_subscriber() {
    let config = Config {
        delivery: DeliveryMode::Locked,
        inbox_capacity: 1,
        ..cfg(10)
    };
    let hub = Hub::builder(config).build().expect("valid config");
    hub.registry().add(stalled_subscriber()).await;
    let mut rx = hub.subscribe_events();

    hub.run_until(sleep(Duration::from_millis(3_200)))
        .await
        .expect("shutdown still completes");

    let events = drain(&mut rx);
    // Tick 1 fills the stalled inbox; tick 2 blocks inside the traversal forever.
    let ticks = events
        .iter()
        .filter(|e| e.kind == EventKind::MessageDispatched)
        .count();
    assert_eq!(ticks, 2);
    assert!(
        events
            .iter()
            .filter(|e| e.kind == EventKind::MessageDispatched)
            .all(|e| e.count.is_none()),
        "recipients are unknown outside the traversal"
    );
    // At most the join racing tick 2 at t=1s gets through; the 2s and 3s joins are stuck.
    assert!(joined(&events).len() <= 1, "joins: {:?}", joined(&events));
    assert!(hub.registry().len().await <= 2);
    assert_eq!(hub.alive().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn snapshot_delivery_reports_stalled_subscriber_and_keeps_joining() {
    let config = Config {
        inbox_capacity: 1,
        send_timeout: Duration::from_millis(100),
        ..cfg(10)
    };
    let hub = Hub::builder(config).build().expect("valid config");
    hub.registry().add(stalled_subscriber()).await;
    let mut rx = hub.subscribe_events();

    hub.run_until(sleep(Duration::from_millis(3_200)))
        .await
        .expect("clean shutdown");

    let events = drain(&mut rx);
    assert_eq!(joined(&events), vec!["worker0", "worker1", "worker2"]);
    let first_tick = events
        .iter()
        .find(|e| e.kind == EventKind::MessageDispatched)
        .expect("tick at 500ms");
    assert_eq!(first_tick.count, Some(1), "only the stalled member is registered");

    let stalled: Vec<&Event> = events
        .iter()
        .filter(|e| e.kind == EventKind::DeliveryStalled)
        .collect();
    assert!(!stalled.is_empty());
    assert!(stalled.iter().all(|e| e.subscriber.as_deref() == Some("stalled")));
    assert!(stalled.iter().all(|e| e.waited_ms == Some(100)));

    assert_fan_out(&events, 6);
}

#[tokio::test(start_paused = true)]
async fn stalled_subscriber_does_not_stretch_default_tick() {
    let config = Config {
        max_joins: 3,
        ..Config::default()
    };
    let hub = Hub::builder(config.clone()).build().expect("default config is valid");
    hub.registry()
        .add(Subscriber::new(
            "stalled",
            config.inbox_capacity,
            CancellationToken::new(),
            Bus::new(1),
        ))
        .await;
    let mut rx = hub.subscribe_events();

    hub.run_until(sleep(Duration::from_millis(20_250)))
        .await
        .expect("clean shutdown");

    let events = drain(&mut rx);
    let ticks = events
        .iter()
        .filter(|e| e.kind == EventKind::MessageDispatched)
        .count();
    assert_eq!(ticks, 40, "one tick every 500ms despite the stalled inbox");

    // The first 16 ticks fill the stalled inbox; every later delivery gives up after 250ms.
    let stalled = events
        .iter()
        .filter(|e| e.kind == EventKind::DeliveryStalled)
        .count();
    assert!(stalled >= 23, "only {stalled} stalled deliveries reported");

    assert_eq!(joined(&events), vec!["worker0", "worker1", "worker2"]);
    assert_fan_out(&events, 39);
}

#[tokio::test(start_paused = true)]
async fn second_run_waits_for_loops_of_the_first() {
    let hub = Hub::builder(cfg(10)).build().expect("valid config");
    let stuck = hub.alive().enter("stuck");

    let first = {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move { hub.run_until(std::future::pending::<()>()).await })
    };
    let second = {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move { hub.run_until(std::future::pending::<()>()).await })
    };
    sleep(Duration::from_millis(1_200)).await;
    hub.shutdown();

    for run in [first, second] {
        match run.await.expect("join") {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, vec!["stuck"]),
            other => panic!("expected grace exceeded, got {other:?}"),
        }
    }
    drop(stuck);

    // Once every loop is gone a late call reports success.
    hub.run_until(async {}).await.expect("nothing left running");
}

#[tokio::test(start_paused = true)]
async fn dispatcher_stops_on_signal() {
    let bus = Bus::new(64);
    let mut rx = bus.subscribe();
    let registry = Registry::new();
    let token = CancellationToken::new();

    let dispatcher = Dispatcher::new(cfg(0), Arc::clone(&registry), bus);
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(1_600)).await;
            token.cancel();
            token.cancel();
        })
    };

    assert_eq!(dispatcher.run(token).await, 3);
    canceller.await.expect("join");

    let events = drain(&mut rx);
    let last = events.last().expect("events");
    assert_eq!(last.kind, EventKind::DispatcherStopped);
    assert_eq!(last.msg_seq, Some(3));
    let payloads: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == EventKind::MessageDispatched)
        .filter_map(|e| e.payload.as_deref())
        .collect();
    assert_eq!(payloads, vec!["test-1", "test-2", "test-3"]);
}

#[test]
fn messages_are_independent_copies() {
    let msg = Message::new(1, "test-1");
    let copy = msg.clone();
    assert_eq!(msg, copy);
    assert_eq!(copy.to_string(), "test-1");
}

#[derive(Default)]
struct Recorder(Mutex<Vec<EventKind>>);

#[async_trait]
impl Observe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }
    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn observers_see_shutdown_progress() {
    let rec = Arc::new(Recorder::default());
    let hub = Hub::builder(cfg(10))
        .with_observers(vec![rec.clone() as Arc<dyn Observe>])
        .build()
        .expect("valid config");

    hub.run_until(sleep(Duration::from_millis(1_700)))
        .await
        .expect("clean shutdown");

    let kinds = rec.0.lock().unwrap().clone();
    assert!(kinds.contains(&EventKind::SubscriberJoined));
    assert!(kinds.contains(&EventKind::MessageReceived));
    assert!(kinds.contains(&EventKind::ShutdownRequested));
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
}

#[tokio::test]
async fn invalid_intervals_are_rejected() {
    let err = Hub::builder(Config {
        dispatch_interval: Duration::from_secs(2),
        ..Config::default()
    })
    .build()
    .err()
    .expect("dispatch slower than joins");
    assert_eq!(err.as_label(), "config_dispatch_not_faster");
}
