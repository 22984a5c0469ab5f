//! Built-in subscribers that publish each snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use swissknife_types::Snapshot;
use tokio::sync::watch;

use crate::registry::{Subscriber, SubscriberError};
use crate::store::SnapshotStore;

/// Where the coordinator publishes snapshots after every tick.
#[derive(Debug)]
pub enum Output {
    /// Rewrite a JSON file with each snapshot.
    File(PathBuf),

    /// Publish the latest snapshot on a watch channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(watch::Sender<Arc<Snapshot>>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use swissknife_sdk::Output;
    ///
    /// let output = Output::file("snapshot.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a channel output and its receiver.
    ///
    /// Slow receivers only ever see the newest snapshot.
    ///
    /// ```rust
    /// use swissknife_sdk::Output;
    ///
    /// let (output, rx) = Output::channel();
    /// assert!(rx.borrow().is_empty());
    /// ```
    pub fn channel() -> (Self, watch::Receiver<Arc<Snapshot>>) {
        let (tx, rx) = watch::channel(Arc::new(Snapshot::default()));
        (Output::Channel(tx), rx)
    }

    pub(crate) fn into_subscriber(self, store: SnapshotStore) -> Arc<dyn Subscriber> {
        Arc::new(OutputSubscriber {
            label: match &self {
                Output::File(path) => format!("file:{}", path.display()),
                Output::Channel(_) => "channel".to_string(),
            },
            output: self,
            store,
        })
    }
}

struct OutputSubscriber {
    output: Output,
    store: SnapshotStore,
    label: String,
}

impl Subscriber for OutputSubscriber {
    fn on_refresh(&self) -> Result<(), SubscriberError> {
        let snapshot = self.store.load();
        match &self.output {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(snapshot.as_ref())
                    .map_err(|e| SubscriberError::new(format!("serialize snapshot: {}", e)))?;
                std::fs::write(path, json)
                    .map_err(|e| SubscriberError::new(format!("write {}: {}", path.display(), e)))?;
            }
            Output::Channel(tx) => {
                // No receivers left is not an error worth reporting every tick
                tx.send_replace(snapshot);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
