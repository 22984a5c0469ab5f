//! # swissknife-sources
//!
//! Fetchers for the public Chilean data feeds polled by the swissknife
//! refresh coordinator.
//!
//! Every fetcher implements [`Fetcher`]: one call, one [`FetchResult`].
//! Transport errors, non-2xx statuses and unexpected payloads are caught
//! inside the fetcher and reported as `FetchResult::Failure`.
//!
//! ## Supported Sources
//!
//! | Source | Fetcher | Value |
//! |---|---|---|
//! | `currency-usd` | [`CurrencyFetcher::usd`] | latest USD/CLP rate |
//! | `currency-uf` | [`CurrencyFetcher::uf`] | latest UF/CLP rate |
//! | `transit-status` | [`MetroStatusFetcher`] | `"Operational"` or `"Issues"` |
//! | `transit-stop:{id}` | [`BusStopFetcher`] | number of buses approaching |
//! | `seismic` | [`SeismicFetcher`] | magnitude of the latest quake |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swissknife_sources::{CurrencyFetcher, Fetcher, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new()?;
//!     let usd = CurrencyFetcher::usd(client);
//!
//!     println!("{:?}", usd.fetch().await);
//!     Ok(())
//! }
//! ```

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use swissknife_types::{FetchResult, Reading, SourceId};

pub mod bus_stop;
pub mod client;
pub mod currency;
pub mod error;
pub mod metro;
pub mod seismic;

#[cfg(any(test, feature = "test-util"))]
pub mod test_server;

pub use bus_stop::BusStopFetcher;
pub use client::{HttpClient, HttpClientBuilder};
pub use currency::{CurrencyFetcher, Indicator};
pub use error::FetchError;
pub use metro::MetroStatusFetcher;
pub use seismic::SeismicFetcher;

// Re-export types for convenience
pub use swissknife_types::{ErrorKind, FetchFailure, Value};

/// One pollable upstream plus its parsing logic.
///
/// Implementations must not panic on bad input and must bound their own
/// network waits; the coordinator adds its own timeout on top.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Stable, unique source id.
    fn id(&self) -> &SourceId;

    /// The URL polled, for display and logs.
    fn endpoint(&self) -> &str;

    /// Perform one fetch. Never fails: errors come back as `Failure`.
    async fn fetch(&self) -> FetchResult;

    /// What to record when the coordinator stops waiting on
    /// [`fetch`](Fetcher::fetch) after `after`.
    fn on_timeout(&self, after: Duration) -> FetchResult {
        FetchResult::failure(ErrorKind::Network, format!("no response within {:?}", after))
    }
}

/// The standard source set: the four fixed feeds plus one fetcher per stop.
pub fn default_fetchers(client: &HttpClient, bus_stops: &[String]) -> Vec<Arc<dyn Fetcher>> {
    let mut fetchers: Vec<Arc<dyn Fetcher>> = vec![
        Arc::new(CurrencyFetcher::usd(client.clone())),
        Arc::new(CurrencyFetcher::uf(client.clone())),
        Arc::new(MetroStatusFetcher::new(client.clone())),
        Arc::new(SeismicFetcher::new(client.clone())),
    ];

    for stop in bus_stops {
        fetchers.push(Arc::new(BusStopFetcher::new(client.clone(), stop.clone())));
    }

    fetchers
}

/// Convert a fetcher's internal outcome into a `FetchResult`, logging failures.
pub(crate) fn into_result(id: &SourceId, outcome: Result<Reading, FetchError>) -> FetchResult {
    match outcome {
        Ok(reading) => {
            debug!(source = %id, value = %reading.value, "fetched");
            FetchResult::Success(reading)
        }
        Err(e) => {
            warn!(source = %id, error = %e, "fetch failed");
            FetchResult::Failure(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_one_fetcher_per_stop() {
        let client = HttpClient::new().unwrap();
        let stops = vec!["PA433".to_string(), "PB12".to_string()];

        let fetchers = default_fetchers(&client, &stops);
        let ids: Vec<&str> = fetchers.iter().map(|f| f.id().as_str()).collect();

        assert_eq!(
            ids,
            vec![
                "currency-usd",
                "currency-uf",
                "transit-status",
                "seismic",
                "transit-stop:PA433",
                "transit-stop:PB12",
            ]
        );
    }

    #[test]
    fn timeout_defaults_to_network_failure() {
        let client = HttpClient::new().unwrap();
        let seismic = SeismicFetcher::new(client);

        let failure = seismic.on_timeout(Duration::from_millis(300)).failure_ref().cloned().unwrap();
        assert_eq!(failure.kind, ErrorKind::Network);
        assert!(failure.detail.contains("300ms"));
    }

    #[test]
    fn no_stops_means_four_sources() {
        let client = HttpClient::new().unwrap();
        assert_eq!(default_fetchers(&client, &[]).len(), 4);
    }
}
