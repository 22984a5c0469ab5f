//! The snapshot store: latest result per source.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use swissknife_types::{
    now_ms, Entry, FetchResult, Microseconds, SchemaVersion, Snapshot, SourceId,
};

use crate::coordinator::{CoordinatorError, FailurePolicy};

/// One resolved fetch, as handed from the fan-in to the commit.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub id: SourceId,
    pub result: FetchResult,
    pub elapsed: Microseconds,
}

/// Read-mostly holder of the current [`Snapshot`].
///
/// The snapshot is swapped as a whole under a short write lock, so a reader
/// sees either the complete previous snapshot or the complete new one.
/// Cloning the store shares the same underlying snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// The entry for one source, or `None` before its first tick.
    pub fn get(&self, id: &SourceId) -> Option<Entry> {
        self.current.read().get(id).cloned()
    }

    /// Build the next snapshot from this tick's results and publish it.
    ///
    /// Every entry is rewritten; sources absent from `results` are dropped.
    pub(crate) fn commit(
        &self,
        tick: u64,
        results: Vec<Resolved>,
        policy: FailurePolicy,
    ) -> Result<Arc<Snapshot>, CoordinatorError> {
        let previous = self.load();
        let now = now_ms();
        let expected = results.len();

        let mut entries = BTreeMap::new();
        for resolved in results {
            let entry = merge(previous.get(&resolved.id), resolved.result, now, resolved.elapsed, policy);
            if entries.insert(resolved.id.clone(), entry).is_some() {
                return Err(CoordinatorError::SnapshotWrite(format!(
                    "source {} resolved twice in tick {}",
                    resolved.id, tick
                )));
            }
        }
        debug_assert_eq!(entries.len(), expected);

        let snapshot = Arc::new(Snapshot {
            version: SchemaVersion::current(),
            tick,
            timestamp_ms: now,
            entries,
        });
        *self.current.write() = snapshot.clone();
        Ok(snapshot)
    }
}

/// Apply the failure policy to one source's new result.
fn merge(
    previous: Option<&Entry>,
    result: FetchResult,
    now: u64,
    elapsed: Microseconds,
    policy: FailurePolicy,
) -> Entry {
    let failure = match result {
        FetchResult::Success(_) => return Entry::fresh(result, now, elapsed),
        FetchResult::Failure(failure) => failure,
    };

    let last_success_ms = previous.and_then(|p| p.last_success_ms);

    match (policy, previous) {
        (FailurePolicy::RetainLastGood, Some(prev)) if prev.result.is_success() => Entry {
            result: prev.result.clone(),
            updated_ms: now,
            last_success_ms,
            last_error: Some(failure),
            elapsed,
        },
        _ => Entry {
            result: FetchResult::Failure(failure),
            updated_ms: now,
            last_success_ms,
            last_error: None,
            elapsed,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swissknife_types::{ErrorKind, Reading, Value};

    fn ok(id: SourceId, value: f64) -> Resolved {
        Resolved {
            id,
            result: Reading::new(value).into(),
            elapsed: Microseconds::from_millis(5),
        }
    }

    fn failed(id: SourceId) -> Resolved {
        Resolved {
            id,
            result: FetchResult::failure(ErrorKind::Network, "timed out"),
            elapsed: Microseconds::from_millis(10_000),
        }
    }

    #[test]
    fn starts_empty() {
        let store = SnapshotStore::new();
        assert!(store.load().is_empty());
        assert_eq!(store.load().tick, 0);
        assert!(store.get(&SourceId::seismic()).is_none());
    }

    #[test]
    fn commit_replaces_the_whole_snapshot() {
        let store = SnapshotStore::new();
        store
            .commit(
                1,
                vec![ok(SourceId::currency_usd(), 950.5), ok(SourceId::seismic(), 4.1)],
                FailurePolicy::default(),
            )
            .unwrap();

        let before = store.load();
        store
            .commit(2, vec![ok(SourceId::currency_usd(), 951.0)], FailurePolicy::default())
            .unwrap();

        // Old readers keep their consistent view
        assert_eq!(before.len(), 2);
        assert_eq!(before.tick, 1);

        let after = store.load();
        assert_eq!(after.tick, 2);
        assert_eq!(after.len(), 1);
        assert_eq!(
            after.get(&SourceId::currency_usd()).unwrap().reading().unwrap().value,
            Value::Number(951.0)
        );
    }

    #[test]
    fn retain_policy_keeps_last_good_reading() {
        let store = SnapshotStore::new();
        let id = SourceId::currency_uf();
        store.commit(1, vec![ok(id.clone(), 36_000.0)], FailurePolicy::RetainLastGood).unwrap();
        let first = store.get(&id).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));
        store.commit(2, vec![failed(id.clone())], FailurePolicy::RetainLastGood).unwrap();
        let entry = store.get(&id).unwrap();

        assert!(entry.is_stale());
        assert_eq!(entry.reading().unwrap().value, Value::Number(36_000.0));
        assert_eq!(entry.last_error.as_ref().unwrap().kind, ErrorKind::Network);
        assert_eq!(entry.last_success_ms, first.last_success_ms);
        assert!(entry.updated_ms > first.updated_ms);
    }

    #[test]
    fn overwrite_policy_exposes_the_failure() {
        let store = SnapshotStore::new();
        let id = SourceId::currency_uf();
        store.commit(1, vec![ok(id.clone(), 36_000.0)], FailurePolicy::Overwrite).unwrap();
        store.commit(2, vec![failed(id.clone())], FailurePolicy::Overwrite).unwrap();

        let entry = store.get(&id).unwrap();
        assert!(entry.reading().is_none());
        assert!(!entry.is_stale());
        assert_eq!(entry.result.failure_ref().unwrap().detail, "timed out");
        assert!(entry.last_success_ms.is_some());
    }

    #[test]
    fn failure_without_history_is_stored_as_failure_under_both_policies() {
        for policy in [FailurePolicy::RetainLastGood, FailurePolicy::Overwrite] {
            let store = SnapshotStore::new();
            store.commit(1, vec![failed(SourceId::seismic())], policy).unwrap();

            let entry = store.get(&SourceId::seismic()).unwrap();
            assert!(entry.reading().is_none());
            assert_eq!(entry.last_success_ms, None);
        }
    }

    #[test]
    fn duplicate_source_is_a_write_error() {
        let store = SnapshotStore::new();
        let err = store
            .commit(
                1,
                vec![ok(SourceId::seismic(), 1.0), ok(SourceId::seismic(), 2.0)],
                FailurePolicy::default(),
            )
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::SnapshotWrite(_)));
        // Nothing was published
        assert_eq!(store.load().tick, 0);
    }
}
