//! Where the dashboard gets its snapshots from.
//!
//! The dashboard either drives a coordinator in-process or watches a
//! snapshot file written by another process's file output.

mod coordinator;
mod file;

pub use coordinator::CoordinatorSource;
pub use file::FileSource;

use std::fmt::Debug;
use std::sync::Arc;

use swissknife_types::Snapshot;

/// Trait for receiving snapshots from various sources.
///
/// # Example
///
/// ```
/// use chile_swissknife::{DataSource, FileSource};
///
/// let mut source = FileSource::new("snapshot.json");
/// if let Some(snapshot) = source.poll() {
///     println!("tick {} with {} sources", snapshot.tick, snapshot.len());
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the latest snapshot.
    ///
    /// Returns `Some(snapshot)` if new data is available, `None` otherwise.
    /// Must not block.
    fn poll(&mut self) -> Option<Arc<Snapshot>>;

    /// Human-readable description, shown in the status bar.
    fn description(&self) -> &str;

    /// The error from the last poll, if any.
    fn error(&self) -> Option<&str>;

    /// Ask for an immediate refresh. Returns `false` if this source cannot
    /// trigger one.
    fn request_refresh(&self) -> bool {
        false
    }
}
