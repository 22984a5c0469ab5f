//! # swissknife-sdk
//!
//! The refresh coordinator behind chile-swissknife.
//!
//! A [`Coordinator`] owns a fixed set of [`Fetcher`]s and a polling
//! interval. Every tick it fetches all sources concurrently, folds the
//! results into a new [`Snapshot`] and notifies each attached
//! [`Subscriber`] exactly once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use swissknife_sdk::{Coordinator, FailurePolicy};
//! use swissknife_sources::{default_fetchers, HttpClient};
//! use swissknife_types::SourceId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new()?;
//!     let coordinator = Coordinator::builder()
//!         .fetchers(default_fetchers(&client, &[]))
//!         .failure_policy(FailurePolicy::RetainLastGood)
//!         .build()?;
//!
//!     // One live value per source
//!     let usd = coordinator.data_point(SourceId::currency_usd());
//!
//!     let handle = coordinator.start();
//!     tokio::time::sleep(Duration::from_secs(2)).await;
//!     println!("USD/CLP: {}", usd.state());
//!
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Isolation**: a failing or hanging source only affects its own entry
//! - **Bounded ticks**: every fetch is capped by the fetch timeout
//! - **Atomic snapshots**: readers never see a half-written tick
//! - **One call per tick**: each subscriber is notified once, after commit

mod coordinator;
mod data_point;
mod output;
mod registry;
mod store;

pub use coordinator::{
    Coordinator, CoordinatorBuilder, CoordinatorError, CoordinatorHandle, CoordinatorState,
    FailurePolicy, TickReport, DEFAULT_FETCH_TIMEOUT, DEFAULT_INTERVAL,
};
pub use data_point::{DataPoint, PointState};
pub use output::Output;
pub use registry::{NotifyOutcome, Subscriber, SubscriberError, SubscriberRegistry, SubscriptionId};
pub use store::SnapshotStore;

// Re-export types for convenience
pub use swissknife_sources::Fetcher;
pub use swissknife_types::{Entry, FetchResult, Snapshot, SourceId};
