//! The refresh coordinator: one schedule, many fetchers, many subscribers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use swissknife_sources::Fetcher;
use swissknife_types::{Entry, ErrorKind, FetchResult, Microseconds, Snapshot, SourceId};

use crate::data_point::DataPoint;
use crate::output::Output;
use crate::registry::{Subscriber, SubscriberRegistry, SubscriptionId};
use crate::store::{Resolved, SnapshotStore};

/// Default time between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default upper bound on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// What a failed fetch does to the source's entry.
///
/// Applies to every source alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep the previous successful reading and mark it stale.
    #[default]
    RetainLastGood,
    /// Replace the entry with the failure.
    Overwrite,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "retain_last_good" | "retain" => Ok(FailurePolicy::RetainLastGood),
            "overwrite" => Ok(FailurePolicy::Overwrite),
            other => Err(format!("unknown failure policy `{}`", other)),
        }
    }
}

/// Lifecycle of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Ticking,
    Stopped,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("source {0} is registered more than once")]
    DuplicateSource(SourceId),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("coordinator is stopped")]
    Stopped,

    #[error("failed to write snapshot: {0}")]
    SnapshotWrite(String),
}

/// Summary of one completed tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub notified: usize,
    pub notify_errors: usize,
    pub elapsed: Duration,
    pub snapshot: Arc<Snapshot>,
}

struct Inner {
    fetchers: Vec<Arc<dyn Fetcher>>,
    store: SnapshotStore,
    registry: Arc<SubscriberRegistry>,
    interval: Duration,
    fetch_timeout: Duration,
    policy: FailurePolicy,
    refresh: Notify,
    state: Mutex<CoordinatorState>,
    // Held for a whole tick so ticks never overlap
    tick_lock: tokio::sync::Mutex<()>,
    ticks: AtomicU64,
}

/// Polls every registered fetcher once per tick and publishes the results.
///
/// Each tick fetches all sources concurrently, waits for every one of them
/// (each bounded by the fetch timeout), commits a complete [`Snapshot`] and
/// then notifies each attached subscriber exactly once.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use swissknife_sdk::{Coordinator, Output};
/// use swissknife_sources::{default_fetchers, HttpClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HttpClient::new()?;
///     let coordinator = Coordinator::builder()
///         .fetchers(default_fetchers(&client, &["PA433".to_string()]))
///         .interval(Duration::from_secs(10))
///         .output(Output::file("snapshot.json"))
///         .build()?;
///
///     let handle = coordinator.start();
///     tokio::time::sleep(Duration::from_secs(30)).await;
///     handle.stop().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// Run one tick now and wait for it.
    ///
    /// Waits for any tick already in progress first.
    pub async fn refresh_now(&self) -> Result<TickReport, CoordinatorError> {
        let _serial = self.inner.tick_lock.lock().await;
        if self.state() == CoordinatorState::Stopped {
            return Err(CoordinatorError::Stopped);
        }

        let _ticking = TickingGuard::enter(&self.inner);
        let started = Instant::now();

        let results = self.fetch_all().await;
        if self.state() == CoordinatorState::Stopped {
            info!("stopped while fetching, results discarded");
            return Err(CoordinatorError::Stopped);
        }
        self.commit_and_notify(results, started)
    }

    /// Ask the running loop for an extra tick.
    ///
    /// Requests made while a tick is running collapse into one follow-up
    /// tick.
    pub fn request_refresh(&self) {
        debug!("manual refresh requested");
        self.inner.refresh.notify_one();
    }

    /// Spawn the timer loop. The first tick runs immediately.
    pub fn start(&self) -> CoordinatorHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let coordinator = self.clone();
        let interval = self.inner.interval;

        info!(
            sources = self.inner.fetchers.len(),
            interval_secs = interval.as_secs_f64(),
            "starting refresh loop"
        );

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = coordinator.inner.refresh.notified() => {
                        timer.reset();
                    }
                    _ = stop_rx.changed() => break,
                }

                tokio::select! {
                    report = coordinator.refresh_now() => {
                        if let Err(e) = report {
                            error!(error = %e, "tick failed");
                        }
                    }
                    _ = stop_rx.changed() => {
                        info!("shutdown during tick, results discarded");
                        break;
                    }
                }
            }

            coordinator.set_state(CoordinatorState::Stopped);
            info!("refresh loop stopped");
        });

        CoordinatorHandle { stop_tx, task }
    }

    /// The latest committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.load()
    }

    pub fn get(&self, id: &SourceId) -> Option<Entry> {
        self.inner.store.get(id)
    }

    /// A reader sharing this coordinator's snapshot.
    pub fn store(&self) -> SnapshotStore {
        self.inner.store.clone()
    }

    pub fn attach(&self, subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
        self.inner.registry.attach(subscriber)
    }

    pub fn detach(&self, id: SubscriptionId) -> bool {
        self.inner.registry.detach(id)
    }

    /// A live view of one source. Unknown ids stay `Unknown`.
    pub fn data_point(&self, id: SourceId) -> DataPoint {
        DataPoint::attach(id, self.inner.store.clone(), self.inner.registry.clone())
    }

    pub fn state(&self) -> CoordinatorState {
        *self.inner.state.lock()
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceId> {
        self.inner.fetchers.iter().map(|f| f.id())
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.inner.policy
    }

    fn set_state(&self, state: CoordinatorState) {
        *self.inner.state.lock() = state;
    }

    /// Fan out every fetch, then fan in in registration order.
    async fn fetch_all(&self) -> Vec<Resolved> {
        let timeout = self.inner.fetch_timeout;
        let mut set = JoinSet::new();

        for (index, fetcher) in self.inner.fetchers.iter().enumerate() {
            let fetcher = fetcher.clone();
            set.spawn(async move {
                let started = Instant::now();
                let result = match tokio::time::timeout(timeout, fetcher.fetch()).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(source = %fetcher.id(), ?timeout, "fetch timed out");
                        fetcher.on_timeout(timeout)
                    }
                };
                (index, result, Microseconds::from(started.elapsed()))
            });
        }

        let mut slots: Vec<Option<(FetchResult, Microseconds)>> =
            (0..self.inner.fetchers.len()).map(|_| None).collect();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result, elapsed)) => slots[index] = Some((result, elapsed)),
                Err(e) => error!(error = %e, "fetch task aborted"),
            }
        }

        self.inner
            .fetchers
            .iter()
            .zip(slots)
            .map(|(fetcher, slot)| {
                let (result, elapsed) = slot.unwrap_or_else(|| {
                    (
                        FetchResult::failure(ErrorKind::Parse, "fetcher panicked"),
                        Microseconds::default(),
                    )
                });
                Resolved {
                    id: fetcher.id().clone(),
                    result,
                    elapsed,
                }
            })
            .collect()
    }

    // No await points: once results are in, commit and notify run to completion
    fn commit_and_notify(
        &self,
        results: Vec<Resolved>,
        started: Instant,
    ) -> Result<TickReport, CoordinatorError> {
        let tick = self.inner.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let succeeded = results.iter().filter(|r| r.result.is_success()).count();
        let failed = results.len() - succeeded;

        let snapshot = self.inner.store.commit(tick, results, self.inner.policy)?;
        let outcome = self.inner.registry.notify_all();
        let elapsed = started.elapsed();

        info!(
            tick,
            succeeded,
            failed,
            notified = outcome.notified,
            notify_errors = outcome.errors,
            elapsed_ms = elapsed.as_millis() as u64,
            "tick complete"
        );

        Ok(TickReport {
            tick,
            succeeded,
            failed,
            notified: outcome.notified,
            notify_errors: outcome.errors,
            elapsed,
            snapshot,
        })
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("sources", &self.inner.fetchers.len())
            .field("interval", &self.inner.interval)
            .field("fetch_timeout", &self.inner.fetch_timeout)
            .field("policy", &self.inner.policy)
            .field("state", &self.state())
            .finish()
    }
}

/// Marks the coordinator as ticking; back to idle on drop, including when a
/// tick is cancelled.
struct TickingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> TickingGuard<'a> {
    fn enter(inner: &'a Inner) -> Self {
        *inner.state.lock() = CoordinatorState::Ticking;
        Self { inner }
    }
}

impl Drop for TickingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if *state == CoordinatorState::Ticking {
            *state = CoordinatorState::Idle;
        }
    }
}

/// Builder for a [`Coordinator`].
#[derive(Default)]
pub struct CoordinatorBuilder {
    fetchers: Vec<Arc<dyn Fetcher>>,
    outputs: Vec<Output>,
    interval: Option<Duration>,
    fetch_timeout: Option<Duration>,
    policy: FailurePolicy,
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetchers.push(fetcher);
        self
    }

    pub fn fetchers(mut self, fetchers: impl IntoIterator<Item = Arc<dyn Fetcher>>) -> Self {
        self.fetchers.extend(fetchers);
        self
    }

    /// Time between ticks. Defaults to 10 seconds.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Upper bound on each fetch. Defaults to 10 seconds.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add an output. Outputs are attached before any other subscriber.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn build(self) -> Result<Coordinator, CoordinatorError> {
        let interval = self.interval.unwrap_or(DEFAULT_INTERVAL);
        if interval.is_zero() {
            return Err(CoordinatorError::ZeroDuration("interval"));
        }
        let fetch_timeout = self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT);
        if fetch_timeout.is_zero() {
            return Err(CoordinatorError::ZeroDuration("fetch timeout"));
        }

        let mut seen = HashSet::new();
        for fetcher in &self.fetchers {
            if !seen.insert(fetcher.id().clone()) {
                return Err(CoordinatorError::DuplicateSource(fetcher.id().clone()));
            }
        }

        let store = SnapshotStore::new();
        let registry = Arc::new(SubscriberRegistry::new());
        for output in self.outputs {
            registry.attach(output.into_subscriber(store.clone()));
        }

        Ok(Coordinator {
            inner: Arc::new(Inner {
                fetchers: self.fetchers,
                store,
                registry,
                interval,
                fetch_timeout,
                policy: self.policy,
                refresh: Notify::new(),
                state: Mutex::new(CoordinatorState::Idle),
                tick_lock: tokio::sync::Mutex::new(()),
                ticks: AtomicU64::new(0),
            }),
        })
    }
}

impl std::fmt::Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorBuilder")
            .field("fetchers", &self.fetchers.len())
            .field("outputs", &self.outputs.len())
            .field("interval", &self.interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Controls the background loop started by [`Coordinator::start`].
///
/// Dropping the handle stops the loop too, without waiting for it.
#[derive(Debug)]
pub struct CoordinatorHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Stop the loop and wait for it to exit.
    ///
    /// A tick still fetching is abandoned and its subscribers are not
    /// notified.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "refresh loop ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swissknife_sources::{HttpClient, MetroStatusFetcher, SeismicFetcher};

    fn client() -> HttpClient {
        HttpClient::new().unwrap()
    }

    #[test]
    fn builder_defaults() {
        let coordinator = Coordinator::builder().build().unwrap();

        assert_eq!(coordinator.interval(), DEFAULT_INTERVAL);
        assert_eq!(coordinator.inner.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(coordinator.failure_policy(), FailurePolicy::RetainLastGood);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert!(coordinator.snapshot().is_empty());
    }

    #[test]
    fn duplicate_sources_are_rejected() {
        let err = Coordinator::builder()
            .fetcher(Arc::new(SeismicFetcher::new(client())))
            .fetcher(Arc::new(MetroStatusFetcher::new(client())))
            .fetcher(Arc::new(SeismicFetcher::new(client())))
            .build()
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::DuplicateSource(id) if id == SourceId::seismic()));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Coordinator::builder()
            .interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::ZeroDuration("interval")));
    }

    #[test]
    fn sources_keep_registration_order() {
        let coordinator = Coordinator::builder()
            .fetcher(Arc::new(SeismicFetcher::new(client())))
            .fetcher(Arc::new(MetroStatusFetcher::new(client())))
            .build()
            .unwrap();

        let ids: Vec<&str> = coordinator.sources().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["seismic", "transit-status"]);
    }

    #[test]
    fn failure_policy_parses() {
        assert_eq!("retain-last-good".parse::<FailurePolicy>().unwrap(), FailurePolicy::RetainLastGood);
        assert_eq!("Overwrite".parse::<FailurePolicy>().unwrap(), FailurePolicy::Overwrite);
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }

    #[tokio::test]
    async fn empty_coordinator_ticks() {
        let coordinator = Coordinator::builder().build().unwrap();
        let report = coordinator.refresh_now().await.unwrap();

        assert_eq!(report.tick, 1);
        assert_eq!(report.succeeded + report.failed, 0);
        assert_eq!(coordinator.snapshot().tick, 1);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn stopped_coordinator_refuses_ticks() {
        let coordinator = Coordinator::builder().build().unwrap();
        let handle = coordinator.start();
        handle.stop().await;

        assert_eq!(coordinator.state(), CoordinatorState::Stopped);
        assert!(matches!(
            coordinator.refresh_now().await,
            Err(CoordinatorError::Stopped)
        ));
    }
}
