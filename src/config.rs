//! Runtime settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, `SWISSKNIFE_*` environment variables, command-line flags.
//!
//! ```toml
//! bus_stops = ["PA433", "PC1050"]   # or "PA433, PC1050"
//! update_interval = 10              # seconds, clamped to 1..=60
//! fetch_timeout_secs = 10
//! failure_policy = "retain_last_good"  # or "overwrite"
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use swissknife_sdk::FailurePolicy;
use tracing::warn;

pub const DEFAULT_UPDATE_INTERVAL: u64 = 10;
pub const MIN_UPDATE_INTERVAL: u64 = 1;
pub const MAX_UPDATE_INTERVAL: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

const ENV_PREFIX: &str = "SWISSKNIFE";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Stop codes in configured order. Duplicates are kept.
    pub bus_stops: Vec<String>,
    /// Seconds between refreshes, within 1..=60.
    pub update_interval: u64,
    pub fetch_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bus_stops: Vec::new(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Values given on the command line; `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bus_stops: Option<String>,
    pub update_interval: Option<i64>,
    pub fetch_timeout_secs: Option<u64>,
    pub failure_policy: Option<String>,
}

/// Either a TOML list or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StopList {
    List(Vec<String>),
    Text(String),
}

impl StopList {
    fn into_stops(self) -> Vec<String> {
        let raw = match self {
            StopList::List(items) => items,
            StopList::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    bus_stops: StopList,
    update_interval: i64,
    fetch_timeout_secs: u64,
    failure_policy: String,
}

impl Settings {
    /// Load settings from every layer.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(file, None, overrides)
    }

    /// Like [`Settings::load`], reading environment variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("bus_stops", "")?
            .set_default("update_interval", DEFAULT_UPDATE_INTERVAL as i64)?
            .set_default("fetch_timeout_secs", DEFAULT_FETCH_TIMEOUT_SECS as i64)?
            .set_default("failure_policy", "retain_last_good")?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).source(env))
            .set_override_option("bus_stops", overrides.bus_stops.clone())?
            .set_override_option("update_interval", overrides.update_interval)?
            .set_override_option("fetch_timeout_secs", overrides.fetch_timeout_secs.map(|s| s as i64))?
            .set_override_option("failure_policy", overrides.failure_policy.clone())?;

        let raw: RawSettings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        let failure_policy = raw
            .failure_policy
            .parse::<FailurePolicy>()
            .map_err(|e| anyhow!(e))?;

        Ok(Self {
            bus_stops: raw.bus_stops.into_stops(),
            update_interval: clamp_interval(raw.update_interval),
            fetch_timeout_secs: raw.fetch_timeout_secs.max(1),
            failure_policy,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Stop codes with repeats removed, first occurrence wins.
    ///
    /// Each stop becomes one source, and source ids must be unique.
    pub fn unique_stops(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut stops = Vec::with_capacity(self.bus_stops.len());
        for stop in &self.bus_stops {
            if seen.insert(stop.as_str()) {
                stops.push(stop.clone());
            } else {
                warn!(stop = %stop, "bus stop listed more than once, polling it once");
            }
        }
        stops
    }
}

/// Clamp a configured interval into the supported range.
pub fn clamp_interval(seconds: i64) -> u64 {
    seconds.clamp(MIN_UPDATE_INTERVAL as i64, MAX_UPDATE_INTERVAL as i64) as u64
}
