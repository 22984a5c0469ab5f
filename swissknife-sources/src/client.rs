//! Shared HTTP client.
//!
//! All fetchers of one coordinator share a single connection pool. Cloning
//! an [`HttpClient`] is cheap and never serializes requests: every fetch in a
//! tick gets its own connection from the pool.

use std::time::Duration;

use tracing::debug;

use crate::FetchError;

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle connections kept per upstream host.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Thin wrapper over a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with default timeout and pool size.
    pub fn new() -> Result<Self, FetchError> {
        Self::builder().build()
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Non-2xx statuses are returned as [`FetchError::Status`] without
    /// reading the body.
    pub(crate) async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Builder for `HttpClient`.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    pool_size: Option<usize>,
}

impl HttpClientBuilder {
    /// Set the per-request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set how many idle connections to keep per host (default: 8).
    ///
    /// Size it to the fan-out width: with many bus stops on the same host,
    /// every stop fetch of a tick runs on its own connection.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    pub fn build(self) -> Result<HttpClient, FetchError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(self.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
            .user_agent(concat!("chile-swissknife/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpClient { client, timeout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;

    #[test]
    fn builder_defaults() {
        let client = HttpClient::new().unwrap();
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn decodes_json_body() {
        let base = test_server::serve(200, r#"{"ok":true}"#).await;
        let client = HttpClient::new().unwrap();

        let body = client.get_json(&format!("{}/anything", base)).await.unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base = test_server::serve(503, "down").await;
        let client = HttpClient::new().unwrap();

        let err = client.get_json(&base).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn invalid_json_is_a_parse_error() {
        let base = test_server::serve(200, "<html>").await;
        let client = HttpClient::new().unwrap();

        let err = client.get_json(&base).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn hanging_upstream_times_out() {
        let base = test_server::serve_hanging().await;
        let client = HttpClient::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        let err = client.get_json(&base).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }
}
