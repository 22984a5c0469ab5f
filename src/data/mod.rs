//! Dashboard data models.
//!
//! ## Submodules
//!
//! - [`duration`]: Formatting of latencies and ages
//! - [`points`]: Table rows ([`Dashboard`], [`PointRow`], [`PointStatus`])
//!
//! ## Data Flow
//!
//! ```text
//! Snapshot (from coordinator or file)
//!        │
//!        ▼
//! Dashboard::from_snapshot(snapshot, previous)
//!        │
//!        └──▶ PointRow (catalog presentation + status, last value kept on failure)
//! ```

pub mod duration;
pub mod points;

pub use points::{Dashboard, PointRow, PointStatus, StatusCounts};
