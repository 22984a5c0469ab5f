//! Dashboard rows built from coordinator snapshots.
//!
//! Each snapshot entry becomes a [`PointRow`]. A failing source keeps the
//! value it last resolved to, taken from the previous dashboard when the
//! snapshot itself no longer carries it.

use std::time::{Duration, Instant};

use serde::Serialize;
use swissknife_sdk::PointState;
use swissknife_types::{Attributes, Entry, FetchResult, Snapshot, SourceId};

use crate::catalog::{presentation, Presentation};

/// Freshness of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    /// Latest fetch succeeded.
    Live,
    /// Latest fetch failed; showing an older reading.
    Stale,
    /// Latest fetch failed and nothing newer is exposed.
    Failing,
}

impl PointStatus {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            PointStatus::Live => "OK",
            PointStatus::Stale => "STALE",
            PointStatus::Failing => "FAIL",
        }
    }
}

/// One data point as shown in the table.
#[derive(Debug, Clone)]
pub struct PointRow {
    pub id: SourceId,
    pub presentation: Presentation,
    pub state: PointState,
    pub attributes: Attributes,
    pub status: PointStatus,
    pub updated_ms: u64,
    pub last_success_ms: Option<u64>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl PointRow {
    fn from_entry(id: &SourceId, entry: &Entry, previous: Option<&PointRow>) -> Self {
        let (state, attributes, status) = match &entry.result {
            FetchResult::Success(reading) => {
                let status = if entry.is_stale() {
                    PointStatus::Stale
                } else {
                    PointStatus::Live
                };
                (
                    PointState::Resolved(reading.value.clone()),
                    reading.attributes.clone(),
                    status,
                )
            }
            FetchResult::Failure(_) => match previous {
                Some(prev) => (prev.state.clone(), prev.attributes.clone(), PointStatus::Failing),
                None => (PointState::Unknown, Attributes::new(), PointStatus::Failing),
            },
        };

        Self {
            id: id.clone(),
            presentation: presentation(id),
            state,
            attributes,
            status,
            updated_ms: entry.updated_ms,
            last_success_ms: entry
                .last_success_ms
                .or_else(|| previous.and_then(|p| p.last_success_ms)),
            error: entry.latest_failure().map(|f| f.to_string()),
            elapsed: entry.elapsed.to_duration(),
        }
    }

    /// Displayed value with its unit, if any.
    pub fn display_value(&self) -> String {
        match (&self.state, self.presentation.unit) {
            (PointState::Resolved(v), Some(unit)) if v.as_f64().is_some() => format!("{} {}", v, unit),
            (state, _) => state.to_string(),
        }
    }
}

/// Row counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub live: usize,
    pub stale: usize,
    pub failing: usize,
}

/// Everything the dashboard draws for one snapshot.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub tick: u64,
    pub timestamp_ms: u64,
    pub rows: Vec<PointRow>,
    pub last_updated: Instant,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    unique_id: &'a str,
    name: &'a str,
    icon: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
    state: String,
    available: bool,
    status: PointStatus,
    #[serde(skip_serializing_if = "no_attributes")]
    attributes: &'a Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

fn no_attributes(attributes: &&Attributes) -> bool {
    attributes.is_empty()
}

#[derive(Serialize)]
struct Export<'a> {
    tick: u64,
    timestamp_ms: u64,
    points: Vec<ExportRow<'a>>,
}

impl Dashboard {
    /// Build rows from a snapshot, carrying values over from `previous`.
    pub fn from_snapshot(snapshot: &Snapshot, previous: Option<&Dashboard>) -> Self {
        let mut rows: Vec<PointRow> = snapshot
            .iter()
            .map(|(id, entry)| {
                let prev = previous.and_then(|d| d.row(id));
                PointRow::from_entry(id, entry, prev)
            })
            .collect();

        rows.sort_by(|a, b| a.presentation.rank().cmp(&b.presentation.rank()));

        Self {
            tick: snapshot.tick,
            timestamp_ms: snapshot.timestamp_ms,
            rows,
            last_updated: Instant::now(),
        }
    }

    pub fn row(&self, id: &SourceId) -> Option<&PointRow> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn counts(&self) -> StatusCounts {
        self.rows.iter().fold(StatusCounts::default(), |mut c, row| {
            match row.status {
                PointStatus::Live => c.live += 1,
                PointStatus::Stale => c.stale += 1,
                PointStatus::Failing => c.failing += 1,
            }
            c
        })
    }

    /// Pretty JSON of what is on screen, keyed by each point's stable id.
    pub fn export_json(&self) -> serde_json::Result<String> {
        let export = Export {
            tick: self.tick,
            timestamp_ms: self.timestamp_ms,
            points: self
                .rows
                .iter()
                .map(|row| ExportRow {
                    unique_id: &row.presentation.unique_id,
                    name: &row.presentation.name,
                    icon: row.presentation.icon,
                    unit: row.presentation.unit,
                    state: row.state.to_string(),
                    available: row.status == PointStatus::Live,
                    status: row.status,
                    attributes: &row.attributes,
                    error: row.error.as_deref(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&export)
    }
}
