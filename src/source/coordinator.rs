//! In-process coordinator source.
//!
//! Receives snapshots from the coordinator's channel output and forwards
//! manual refresh requests back to it.

use std::sync::Arc;

use swissknife_sdk::Coordinator;
use swissknife_types::Snapshot;
use tokio::sync::watch;

use super::DataSource;

/// A data source fed by a [`Coordinator`] running in the same process.
///
/// # Example
///
/// ```
/// use chile_swissknife::CoordinatorSource;
/// use swissknife_sdk::{Coordinator, Output};
///
/// let (output, rx) = Output::channel();
/// let coordinator = Coordinator::builder().output(output).build().unwrap();
/// let source = CoordinatorSource::new(coordinator, rx);
/// ```
#[derive(Debug)]
pub struct CoordinatorSource {
    coordinator: Coordinator,
    receiver: watch::Receiver<Arc<Snapshot>>,
    description: String,
}

impl CoordinatorSource {
    pub fn new(coordinator: Coordinator, receiver: watch::Receiver<Arc<Snapshot>>) -> Self {
        let description = format!(
            "live: {} sources every {}s",
            coordinator.sources().count(),
            coordinator.interval().as_secs()
        );
        Self {
            coordinator,
            receiver,
            description,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }
}

impl DataSource for CoordinatorSource {
    fn poll(&mut self) -> Option<Arc<Snapshot>> {
        // The initial value is an empty placeholder; wait for the first tick
        if self.receiver.has_changed().unwrap_or(false) {
            Some(self.receiver.borrow_and_update().clone())
        } else {
            None
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        None
    }

    fn request_refresh(&self) -> bool {
        self.coordinator.request_refresh();
        true
    }
}
