//! Subscriber registration and change notification.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Error returned by a subscriber's refresh hook.
///
/// Reported in the tick's log and counted in its report; never stops the
/// rest of the notification pass.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SubscriberError(String);

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Anything that wants to hear about completed refreshes.
///
/// The hook carries no payload: subscribers hold a
/// [`SnapshotStore`](crate::SnapshotStore) clone and read what they need.
/// It runs synchronously on the coordinator's task, so keep it short.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use swissknife_sdk::{Subscriber, SubscriberError};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl Subscriber for Counter {
///     fn on_refresh(&self) -> Result<(), SubscriberError> {
///         self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(())
///     }
/// }
/// ```
pub trait Subscriber: Send + Sync {
    /// Called once after each committed tick.
    fn on_refresh(&self) -> Result<(), SubscriberError>;

    /// Label used in logs.
    fn name(&self) -> &str {
        "subscriber"
    }
}

/// Opaque token returned by attach, used to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot {
    id: SubscriptionId,
    subscriber: Arc<dyn Subscriber>,
    detached: AtomicBool,
}

/// Outcome of one notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub notified: usize,
    pub errors: usize,
}

/// The set of attached subscribers.
///
/// A pass notifies a copy of the list taken when the pass starts, so
/// subscribers may attach or detach from inside their own hook. A
/// subscriber detached mid-pass is skipped if it has not been reached yet.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    slots: RwLock<Vec<Arc<Slot>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(subscription = %id, name = subscriber.name(), "subscriber attached");
        self.slots.write().push(Arc::new(Slot {
            id,
            subscriber,
            detached: AtomicBool::new(false),
        }));
        id
    }

    /// Returns `false` if the id was unknown or already detached.
    pub fn detach(&self, id: SubscriptionId) -> bool {
        let mut slots = self.slots.write();
        let Some(pos) = slots.iter().position(|s| s.id == id) else {
            return false;
        };
        let slot = slots.remove(pos);
        slot.detached.store(true, Ordering::Release);
        debug!(subscription = %id, "subscriber detached");
        true
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every attached subscriber once.
    ///
    /// Errors and panics are logged and counted; every remaining subscriber
    /// is still called.
    pub fn notify_all(&self) -> NotifyOutcome {
        let pass: Vec<Arc<Slot>> = self.slots.read().clone();
        let mut outcome = NotifyOutcome::default();

        for slot in pass {
            if slot.detached.load(Ordering::Acquire) {
                continue;
            }
            outcome.notified += 1;

            let name = slot.subscriber.name();
            match catch_unwind(AssertUnwindSafe(|| slot.subscriber.on_refresh())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    outcome.errors += 1;
                    warn!(subscription = %slot.id, name, error = %e, "subscriber failed");
                }
                Err(_) => {
                    outcome.errors += 1;
                    warn!(subscription = %slot.id, name, "subscriber panicked");
                }
            }
        }

        outcome
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}
