//! Fetch outcomes: the value-plus-attributes record a source produces.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known source ids.
pub mod ids {
    pub const CURRENCY_USD: &str = "currency-usd";
    pub const CURRENCY_UF: &str = "currency-uf";
    pub const TRANSIT_STATUS: &str = "transit-status";
    pub const SEISMIC: &str = "seismic";
    /// Prefix for bus-stop sources; the full id is `transit-stop:{stop_id}`.
    pub const TRANSIT_STOP_PREFIX: &str = "transit-stop:";
}

/// Stable identity of one pollable upstream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn currency_usd() -> Self {
        Self::new(ids::CURRENCY_USD)
    }

    pub fn currency_uf() -> Self {
        Self::new(ids::CURRENCY_UF)
    }

    pub fn transit_status() -> Self {
        Self::new(ids::TRANSIT_STATUS)
    }

    pub fn seismic() -> Self {
        Self::new(ids::SEISMIC)
    }

    /// Id of the bus-stop source for `stop_id`.
    pub fn transit_stop(stop_id: &str) -> Self {
        Self(format!("{}{}", ids::TRANSIT_STOP_PREFIX, stop_id))
    }

    /// The stop code if this is a bus-stop source.
    pub fn stop_id(&self) -> Option<&str> {
        self.0.strip_prefix(ids::TRANSIT_STOP_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Auxiliary structured context attached to a reading.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// The primary scalar of a data point.
///
/// `NoData` is the explicit "no data" sentinel: the upstream answered but
/// carried no usable value. It is distinct from a failed fetch and never
/// compares equal to a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    NoData,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Value::NoData)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Counts come through as whole floats; print them without ".0"
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::NoData => f.write_str("no data"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// A successful reading: the primary value plus its attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub value: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Default for Value {
    fn default() -> Self {
        Value::NoData
    }
}

impl Reading {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute, builder style.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection, DNS or timeout.
    Network,
    /// Non-2xx response.
    HttpStatus,
    /// Unexpected payload shape.
    Parse,
    /// Well-formed response without usable data.
    EmptyResult,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::HttpStatus => "http status",
            ErrorKind::Parse => "parse",
            ErrorKind::EmptyResult => "empty result",
        };
        f.write_str(s)
    }
}

/// Why a fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl FetchFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.detail)
    }
}

/// Outcome of one fetch attempt. Never both a reading and a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchResult {
    Success(Reading),
    Failure(FetchFailure),
}

impl FetchResult {
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        FetchResult::Failure(FetchFailure::new(kind, detail))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }

    pub fn reading(&self) -> Option<&Reading> {
        match self {
            FetchResult::Success(r) => Some(r),
            FetchResult::Failure(_) => None,
        }
    }

    pub fn failure_ref(&self) -> Option<&FetchFailure> {
        match self {
            FetchResult::Success(_) => None,
            FetchResult::Failure(f) => Some(f),
        }
    }
}

impl From<Reading> for FetchResult {
    fn from(r: Reading) -> Self {
        FetchResult::Success(r)
    }
}

impl From<FetchFailure> for FetchResult {
    fn from(f: FetchFailure) -> Self {
        FetchResult::Failure(f)
    }
}
