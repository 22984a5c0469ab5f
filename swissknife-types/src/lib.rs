//! # swissknife-types
//!
//! Core types shared by the swissknife fetchers, the refresh coordinator
//! and anything that reads its snapshots.
//!
//! - [`FetchResult`]: outcome of one fetch, either a [`Reading`] or a [`FetchFailure`]
//! - [`Entry`]: a result plus when it was resolved
//! - [`Snapshot`]: one entry per source, replaced wholesale every tick
//!
//! ## Example
//!
//! ```rust
//! use swissknife_types::{Reading, Snapshot, SourceId, Value};
//!
//! let snapshot = Snapshot::builder()
//!     .tick(1)
//!     .result(SourceId::currency_usd(), Reading::new(950.5).with_attribute("date", "2024-01-01"))
//!     .build();
//!
//! let usd = snapshot.get(&SourceId::currency_usd()).unwrap();
//! assert_eq!(usd.reading().unwrap().value, Value::Number(950.5));
//! ```

mod duration;
mod result;
mod snapshot;
mod version;

pub use duration::*;
pub use result::*;
pub use snapshot::*;
pub use version::*;

/// Current schema version of exported snapshots.
pub const SCHEMA_VERSION: u32 = 1;
