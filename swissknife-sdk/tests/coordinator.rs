//! Scheduling, isolation and notification behavior of the coordinator.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Counter, Hanging, Scripted};
use parking_lot::Mutex;
use swissknife_sdk::{
    Coordinator, CoordinatorError, CoordinatorState, FailurePolicy, PointState, Subscriber, SubscriberError,
    SubscriptionId,
};
use swissknife_types::{ErrorKind, FetchResult, Reading, SourceId, Value};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn hanging_source_costs_one_timeout_not_n() {
    let timeout = Duration::from_secs(10);
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("a", 1.0)))
        .fetcher(Arc::new(Hanging(SourceId::from("stuck"))))
        .fetcher(Arc::new(Scripted::ok("b", 2.0)))
        .fetcher(Arc::new(Hanging(SourceId::from("stuck-too"))))
        .fetcher(Arc::new(Scripted::ok("c", 3.0)))
        .fetch_timeout(timeout)
        .build()
        .unwrap();

    let started = Instant::now();
    let report = coordinator.refresh_now().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_millis(500), "took {:?}", elapsed);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 2);

    let stuck = coordinator.get(&SourceId::from("stuck")).unwrap();
    assert_eq!(stuck.result.failure_ref().unwrap().kind, ErrorKind::Network);
}

#[tokio::test]
async fn one_failure_does_not_touch_other_entries() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("a", 1.0)))
        .fetcher(Arc::new(Scripted::failing("broken")))
        .fetcher(Arc::new(Scripted::ok("b", 2.0)))
        .build()
        .unwrap();

    let report = coordinator.refresh_now().await.unwrap();
    let snapshot = report.snapshot;

    assert_eq!(snapshot.len(), 3);
    assert_eq!(
        snapshot.get(&SourceId::from("a")).unwrap().reading().unwrap().value,
        Value::Number(1.0)
    );
    assert_eq!(
        snapshot.get(&SourceId::from("b")).unwrap().reading().unwrap().value,
        Value::Number(2.0)
    );
    assert_eq!(
        snapshot.get(&SourceId::from("broken")).unwrap().result.failure_ref().unwrap().kind,
        ErrorKind::HttpStatus
    );
}

fn flaky(id: &str) -> Arc<Scripted> {
    Arc::new(Scripted::new(
        id,
        vec![
            Reading::new(10.0).into(),
            FetchResult::failure(ErrorKind::Network, "connection reset"),
        ],
    ))
}

#[tokio::test]
async fn retain_policy_applies_to_every_failing_source() {
    let coordinator = Coordinator::builder()
        .fetcher(flaky("x"))
        .fetcher(flaky("y"))
        .failure_policy(FailurePolicy::RetainLastGood)
        .build()
        .unwrap();

    coordinator.refresh_now().await.unwrap();
    coordinator.refresh_now().await.unwrap();

    for id in ["x", "y"] {
        let entry = coordinator.get(&SourceId::from(id)).unwrap();
        assert!(entry.is_stale(), "{} should be stale", id);
        assert_eq!(entry.reading().unwrap().value, Value::Number(10.0));
        assert_eq!(entry.last_error.unwrap().detail, "connection reset");
    }
}

#[tokio::test]
async fn overwrite_policy_applies_to_every_failing_source() {
    let coordinator = Coordinator::builder()
        .fetcher(flaky("x"))
        .fetcher(flaky("y"))
        .failure_policy(FailurePolicy::Overwrite)
        .build()
        .unwrap();

    coordinator.refresh_now().await.unwrap();
    coordinator.refresh_now().await.unwrap();

    for id in ["x", "y"] {
        let entry = coordinator.get(&SourceId::from(id)).unwrap();
        assert!(entry.reading().is_none(), "{} should expose the failure", id);
        assert!(entry.last_success_ms.is_some());
    }
}

#[tokio::test]
async fn every_subscriber_hears_each_tick_once() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("a", 1.0)))
        .fetcher(Arc::new(Scripted::failing("b")))
        .build()
        .unwrap();

    let first = Arc::new(Counter::default());
    let second = Arc::new(Counter::default());
    coordinator.attach(first.clone());
    coordinator.attach(second.clone());

    for _ in 0..3 {
        let report = coordinator.refresh_now().await.unwrap();
        assert_eq!(report.notified, 2);
        assert_eq!(report.notify_errors, 0);
    }

    assert_eq!(first.count(), 3);
    assert_eq!(second.count(), 3);
}

/// Detaches another subscriber the first time it is notified.
struct Unsubscriber {
    coordinator: Coordinator,
    target: Mutex<Option<SubscriptionId>>,
}

impl Subscriber for Unsubscriber {
    fn on_refresh(&self) -> Result<(), SubscriberError> {
        if let Some(id) = self.target.lock().take() {
            self.coordinator.detach(id);
        }
        Ok(())
    }
}

#[tokio::test]
async fn subscriber_detached_mid_pass_is_not_called() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("a", 1.0)))
        .build()
        .unwrap();

    let unsubscriber = Arc::new(Unsubscriber {
        coordinator: coordinator.clone(),
        target: Mutex::new(None),
    });
    coordinator.attach(unsubscriber.clone());

    let victim = Arc::new(Counter::default());
    let victim_id = coordinator.attach(victim.clone());
    *unsubscriber.target.lock() = Some(victim_id);

    coordinator.refresh_now().await.unwrap();
    coordinator.refresh_now().await.unwrap();

    assert_eq!(victim.count(), 0);
}

struct Broken;

impl Subscriber for Broken {
    fn on_refresh(&self) -> Result<(), SubscriberError> {
        Err(SubscriberError::new("renderer closed"))
    }
}

#[tokio::test]
async fn subscriber_errors_are_counted_not_fatal() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("a", 1.0)))
        .build()
        .unwrap();

    coordinator.attach(Arc::new(Broken));
    let after = Arc::new(Counter::default());
    coordinator.attach(after.clone());

    let report = coordinator.refresh_now().await.unwrap();

    assert_eq!(report.notified, 2);
    assert_eq!(report.notify_errors, 1);
    assert_eq!(after.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_requests_during_a_tick_coalesce_into_one() {
    let slow = Arc::new(Scripted::ok("slow", 1.0).with_delay(Duration::from_secs(1)));
    let coordinator = Coordinator::builder()
        .fetcher(slow.clone())
        .interval(Duration::from_secs(60))
        .build()
        .unwrap();

    let ticks = Arc::new(Counter::default());
    coordinator.attach(ticks.clone());

    let handle = coordinator.start();

    // First tick is in flight
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(coordinator.state(), CoordinatorState::Ticking);

    coordinator.request_refresh();
    coordinator.request_refresh();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(ticks.count(), 2);
    assert_eq!(slow.calls(), 2);
    assert_eq!(coordinator.state(), CoordinatorState::Idle);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn timer_drives_ticks() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("a", 1.0)))
        .interval(Duration::from_secs(10))
        .build()
        .unwrap();

    let ticks = Arc::new(Counter::default());
    coordinator.attach(ticks.clone());

    let handle = coordinator.start();
    tokio::time::sleep(Duration::from_secs(25)).await;
    handle.stop().await;

    // Ticks at 0s, 10s and 20s
    assert_eq!(ticks.count(), 3);
    assert_eq!(coordinator.snapshot().tick, 3);
}

#[tokio::test(start_paused = true)]
async fn stop_during_tick_skips_notification() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("slow", 1.0).with_delay(Duration::from_secs(5))))
        .build()
        .unwrap();

    let ticks = Arc::new(Counter::default());
    coordinator.attach(ticks.clone());

    let handle = coordinator.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(coordinator.state(), CoordinatorState::Ticking);

    handle.stop().await;

    assert_eq!(coordinator.state(), CoordinatorState::Stopped);
    assert_eq!(ticks.count(), 0);
    assert!(coordinator.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn direct_refresh_finishing_after_stop_is_discarded() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("slow", 1.0).with_delay(Duration::from_secs(5))))
        .build()
        .unwrap();

    let ticks = Arc::new(Counter::default());
    coordinator.attach(ticks.clone());

    let manual = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.refresh_now().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let handle = coordinator.start();
    handle.stop().await;
    assert_eq!(coordinator.state(), CoordinatorState::Stopped);

    let result = manual.await.unwrap();
    assert!(matches!(result, Err(CoordinatorError::Stopped)));
    assert_eq!(ticks.count(), 0);
    assert!(coordinator.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_loop() {
    let coordinator = Coordinator::builder()
        .fetcher(Arc::new(Scripted::ok("a", 1.0)))
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    let handle = coordinator.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(coordinator.state(), CoordinatorState::Stopped);
}

#[tokio::test]
async fn data_point_follows_its_source() {
    let coordinator = Coordinator::builder()
        .fetcher(flaky("rate"))
        .failure_policy(FailurePolicy::Overwrite)
        .build()
        .unwrap();

    let point = coordinator.data_point(SourceId::from("rate"));
    let never = coordinator.data_point(SourceId::from("unregistered"));
    assert_eq!(point.state(), PointState::Unknown);

    coordinator.refresh_now().await.unwrap();
    assert_eq!(point.state(), PointState::Resolved(Value::Number(10.0)));
    assert!(point.available());

    coordinator.refresh_now().await.unwrap();
    // Still shows the last resolved value while failing
    assert_eq!(point.state(), PointState::Resolved(Value::Number(10.0)));
    assert!(!point.available());

    assert_eq!(never.state(), PointState::Unknown);
}
