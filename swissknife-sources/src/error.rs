//! Error types for fetchers.
//!
//! These never leave a fetcher: [`crate::Fetcher::fetch`] converts them into
//! a `FetchResult::Failure` at its boundary.

use swissknife_types::{ErrorKind, FetchFailure};
use thiserror::Error;

/// Errors that can occur while fetching from an upstream source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout waiting for response.
    #[error("request timed out")]
    Timeout,

    /// Connection or DNS failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other transport failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),

    /// Failed to parse response.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Well-formed response carrying nothing usable.
    #[error("no data: {0}")]
    Empty(String),
}

impl FetchError {
    /// The coarse classification stored in snapshots.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout | FetchError::Connection(_) | FetchError::Http(_) => {
                ErrorKind::Network
            }
            FetchError::Status(_) => ErrorKind::HttpStatus,
            FetchError::Parse(_) => ErrorKind::Parse,
            FetchError::Empty(_) => ErrorKind::EmptyResult,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<FetchError> for FetchFailure {
    fn from(err: FetchError) -> Self {
        FetchFailure::new(err.kind(), err.to_string())
    }
}
