//! Per-source views that follow the coordinator.

use std::sync::Arc;

use parking_lot::RwLock;
use swissknife_types::{Attributes, Entry, FetchFailure, FetchResult, SourceId, Value};

use crate::registry::{Subscriber, SubscriberError, SubscriberRegistry, SubscriptionId};
use crate::store::SnapshotStore;

/// What a data point displays.
#[derive(Debug, Clone, PartialEq)]
pub enum PointState {
    /// Never resolved.
    Unknown,
    Resolved(Value),
}

impl std::fmt::Display for PointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointState::Unknown => write!(f, "unknown"),
            PointState::Resolved(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone)]
struct View {
    state: PointState,
    attributes: Attributes,
    available: bool,
    updated_ms: Option<u64>,
    last_error: Option<FetchFailure>,
}

impl View {
    fn unknown() -> Self {
        Self {
            state: PointState::Unknown,
            attributes: Attributes::new(),
            available: false,
            updated_ms: None,
            last_error: None,
        }
    }

    // A failing source keeps whatever it last resolved to
    fn apply(&mut self, entry: Option<Entry>) {
        let Some(entry) = entry else {
            return;
        };
        self.updated_ms = Some(entry.updated_ms);

        match (&entry.result, entry.last_error) {
            (FetchResult::Success(reading), None) => {
                self.state = PointState::Resolved(reading.value.clone());
                self.attributes = reading.attributes.clone();
                self.available = true;
                self.last_error = None;
            }
            (FetchResult::Success(reading), Some(stale)) => {
                self.state = PointState::Resolved(reading.value.clone());
                self.attributes = reading.attributes.clone();
                self.available = false;
                self.last_error = Some(stale);
            }
            (FetchResult::Failure(failure), _) => {
                self.available = false;
                self.last_error = Some(failure.clone());
            }
        }
    }
}

struct Follower {
    id: SourceId,
    store: SnapshotStore,
    view: Arc<RwLock<View>>,
}

impl Subscriber for Follower {
    fn on_refresh(&self) -> Result<(), SubscriberError> {
        let entry = self.store.get(&self.id);
        self.view.write().apply(entry);
        Ok(())
    }

    fn name(&self) -> &str {
        self.id.as_str()
    }
}

/// A live view of one source, updated after every tick.
///
/// Detaches itself from the coordinator when dropped.
pub struct DataPoint {
    id: SourceId,
    view: Arc<RwLock<View>>,
    registry: Arc<SubscriberRegistry>,
    subscription: SubscriptionId,
}

impl DataPoint {
    pub(crate) fn attach(id: SourceId, store: SnapshotStore, registry: Arc<SubscriberRegistry>) -> Self {
        let view = Arc::new(RwLock::new(View::unknown()));

        // Register before the first read so a tick committed in between is
        // still delivered. The lock keeps that delivery from being overwritten
        // by the older entry read here.
        let mut initial = view.write();
        let subscription = registry.attach(Arc::new(Follower {
            id: id.clone(),
            store: store.clone(),
            view: view.clone(),
        }));
        initial.apply(store.get(&id));
        drop(initial);

        Self {
            id,
            view,
            registry,
            subscription,
        }
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn state(&self) -> PointState {
        self.view.read().state.clone()
    }

    pub fn attributes(&self) -> Attributes {
        self.view.read().attributes.clone()
    }

    /// Whether the latest tick fetched this source successfully.
    pub fn available(&self) -> bool {
        self.view.read().available
    }

    pub fn updated_ms(&self) -> Option<u64> {
        self.view.read().updated_ms
    }

    pub fn last_error(&self) -> Option<FetchFailure> {
        self.view.read().last_error.clone()
    }
}

impl Drop for DataPoint {
    fn drop(&mut self) {
        self.registry.detach(self.subscription);
    }
}

impl std::fmt::Debug for DataPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view.read();
        f.debug_struct("DataPoint")
            .field("id", &self.id)
            .field("state", &view.state)
            .field("available", &view.available)
            .finish()
    }
}
