//! Bus arrivals for one Red (Santiago public transit) stop.
//!
//! A stop that cannot be read is reported as a stop with no observable
//! buses: the fetch still succeeds with a zero count and the reason is kept
//! in the `error` attribute.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use swissknife_types::{FetchResult, Reading, SourceId};

use crate::{Fetcher, FetchError, HttpClient};

const DEFAULT_BASE_URL: &str = "https://api.xor.cl";

/// Fetcher for the arrivals at one bus stop.
#[derive(Debug, Clone)]
pub struct BusStopFetcher {
    client: HttpClient,
    stop_id: String,
    id: SourceId,
    url: String,
}

impl BusStopFetcher {
    pub fn new(client: HttpClient, stop_id: impl Into<String>) -> Self {
        let stop_id = stop_id.into();
        Self {
            client,
            id: SourceId::transit_stop(&stop_id),
            url: stop_url(DEFAULT_BASE_URL, &stop_id),
            stop_id,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.url = stop_url(base_url, &self.stop_id);
        self
    }

    pub fn stop_id(&self) -> &str {
        &self.stop_id
    }
}

#[async_trait]
impl Fetcher for BusStopFetcher {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> FetchResult {
        let outcome = match self.client.get_json(&self.url).await {
            Ok(body) => parse_arrivals(&self.stop_id, body),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(reading) => FetchResult::Success(reading),
            Err(e) => {
                warn!(source = %self.id, error = %e, "bus stop unavailable, reporting no buses");
                FetchResult::Success(no_buses(&self.stop_id, &e))
            }
        }
    }

    /// A stop that outlasts the coordinator's patience has no buses either.
    fn on_timeout(&self, _after: Duration) -> FetchResult {
        FetchResult::Success(no_buses(&self.stop_id, &FetchError::Timeout))
    }
}

/// Count the `buses` list and keep the payload as attributes.
pub(crate) fn parse_arrivals(stop_id: &str, body: serde_json::Value) -> Result<Reading, FetchError> {
    let serde_json::Value::Object(fields) = body else {
        return Err(FetchError::Parse("bus stop payload is not an object".to_string()));
    };

    let count = fields
        .get("buses")
        .and_then(|b| b.as_array())
        .map_or(0, |b| b.len());

    let mut reading = Reading::new(count);
    reading.attributes.extend(fields);
    reading
        .attributes
        .entry("stop_id".to_string())
        .or_insert_with(|| stop_id.into());
    Ok(reading)
}

fn no_buses(stop_id: &str, err: &FetchError) -> Reading {
    Reading::new(0usize)
        .with_attribute("stop_id", stop_id)
        .with_attribute("buses", serde_json::Value::Array(Vec::new()))
        .with_attribute("error", err.to_string())
}

fn stop_url(base_url: &str, stop_id: &str) -> String {
    match reqwest::Url::parse(base_url) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().extend(["red", "bus-stop", stop_id]);
            }
            url.to_string()
        }
        // Unparseable base: the request fails and the stop reads as no buses
        Err(_) => format!("{}/red/bus-stop/{}", base_url.trim_end_matches('/'), stop_id),
    }
}
