//! Snapshot - the best-known result of every source after a tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{now_ms, FetchFailure, FetchResult, Microseconds, Reading, SchemaVersion, SourceId};

/// One snapshot row: the result for a single source and when it was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The result exposed to readers.
    ///
    /// With the retain-last-good policy this may be a Success from an earlier
    /// tick while `last_error` holds the failure of the latest attempt.
    pub result: FetchResult,

    /// Unix millis of the tick that last wrote this entry.
    pub updated_ms: u64,

    /// Unix millis of the most recent successful fetch, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_ms: Option<u64>,

    /// Failure of the latest attempt when `result` is a retained reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<FetchFailure>,

    /// How long the latest fetch took.
    #[serde(default)]
    pub elapsed: Microseconds,
}

impl Entry {
    /// Entry for a fresh result resolved at `updated_ms`.
    pub fn fresh(result: FetchResult, updated_ms: u64, elapsed: Microseconds) -> Self {
        let last_success_ms = result.is_success().then_some(updated_ms);
        Self {
            result,
            updated_ms,
            last_success_ms,
            last_error: None,
            elapsed,
        }
    }

    /// True when the exposed reading is older than the latest attempt.
    pub fn is_stale(&self) -> bool {
        self.last_error.is_some() && self.result.is_success()
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.result.reading()
    }

    /// The failure of the latest attempt, whether retained over or exposed.
    pub fn latest_failure(&self) -> Option<&FetchFailure> {
        self.last_error.as_ref().or_else(|| self.result.failure_ref())
    }
}

/// Point-in-time view of every registered source.
///
/// Replaced wholesale at the end of each tick; readers holding an older
/// snapshot keep seeing a consistent view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version for forward compatibility.
    pub version: SchemaVersion,

    /// Number of the tick that produced this snapshot (0 before the first tick).
    pub tick: u64,

    /// Unix timestamp in milliseconds when this snapshot was committed.
    pub timestamp_ms: u64,

    /// Entries keyed by source id.
    pub entries: BTreeMap<SourceId, Entry>,
}

impl Snapshot {
    /// The empty pre-first-tick snapshot.
    pub fn empty() -> Self {
        Self {
            version: SchemaVersion::current(),
            tick: 0,
            timestamp_ms: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &SourceId) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceId, &Entry)> {
        self.entries.iter()
    }

    /// Sources whose latest attempt failed, including stale retained ones.
    pub fn failures(&self) -> impl Iterator<Item = (&SourceId, &FetchFailure)> {
        self.entries
            .iter()
            .filter_map(|(id, e)| e.latest_failure().map(|f| (id, f)))
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder for `Snapshot`, mostly useful in tests and file fixtures.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    tick: u64,
    timestamp_ms: Option<u64>,
    entries: BTreeMap<SourceId, Entry>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add a fresh entry stamped with the snapshot timestamp.
    pub fn result(mut self, id: impl Into<SourceId>, result: impl Into<FetchResult>) -> Self {
        let ts = *self.timestamp_ms.get_or_insert_with(now_ms);
        self.entries
            .insert(id.into(), Entry::fresh(result.into(), ts, Microseconds::default()));
        self
    }

    pub fn entry(mut self, id: impl Into<SourceId>, entry: Entry) -> Self {
        self.entries.insert(id.into(), entry);
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            version: SchemaVersion::current(),
            tick: self.tick,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(now_ms),
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Value};

    #[test]
    fn builder_stamps_entries_with_snapshot_time() {
        let snapshot = Snapshot::builder()
            .tick(3)
            .timestamp_ms(1_704_067_200_000)
            .result(SourceId::currency_usd(), Reading::new(950.5))
            .result(
                SourceId::seismic(),
                FetchFailure::new(ErrorKind::EmptyResult, "no events"),
            )
            .build();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.tick, 3);

        let usd = snapshot.get(&SourceId::currency_usd()).unwrap();
        assert_eq!(usd.updated_ms, 1_704_067_200_000);
        assert_eq!(usd.last_success_ms, Some(1_704_067_200_000));
        assert_eq!(usd.reading().unwrap().value, Value::Number(950.5));

        let quake = snapshot.get(&SourceId::seismic()).unwrap();
        assert_eq!(quake.last_success_ms, None);
        assert!(!quake.is_stale());
    }

    #[test]
    fn retained_reading_is_stale_and_reported_as_failure() {
        let mut entry = Entry::fresh(Reading::new(36_000.0).into(), 1_000, Microseconds::default());
        entry.updated_ms = 2_000;
        entry.last_error = Some(FetchFailure::new(ErrorKind::Network, "timed out"));

        assert!(entry.is_stale());
        assert_eq!(entry.latest_failure().unwrap().kind, ErrorKind::Network);

        let snapshot = Snapshot::builder().entry(SourceId::currency_uf(), entry).build();
        assert_eq!(snapshot.failures().count(), 1);
    }

    #[test]
    fn empty_snapshot_has_tick_zero() {
        let snapshot = Snapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.tick, 0);
        assert!(snapshot.version.is_compatible());
    }

    #[test]
    fn serde_preserves_entries() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1_704_067_200_000)
            .result(
                SourceId::transit_stop("PA433"),
                Reading::new(2usize).with_attribute("stop_id", "PA433"),
            )
            .build();

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"transit-stop:PA433\""));

        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
