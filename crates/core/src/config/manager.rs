//! Manager-wide runtime settings
//!
//! Settings come from code, from a deserialized document, or from the
//! environment:
//!
//! - `MEMCACHE_SWEEP_INTERVAL_MS`: background expiry sweep period, `0`
//!   disables the sweeper (default `1000`)
//! - `MEMCACHE_SHUTDOWN_TIMEOUT_MS`: how long shutdown waits for the sweeper
//!   to stop (default `5000`)

use std::time::Duration;

use memcache_common::{duration_millis, option_duration_millis};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CacheError, CacheResult};

const SWEEP_INTERVAL_VAR: &str = "MEMCACHE_SWEEP_INTERVAL_MS";
const SHUTDOWN_TIMEOUT_VAR: &str = "MEMCACHE_SHUTDOWN_TIMEOUT_MS";

/// Runtime settings for a [`CacheManager`](crate::CacheManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Period of the background expiry sweep; `None` or zero disables it
    #[serde(
        rename = "sweep_interval_ms",
        serialize_with = "option_duration_millis::serialize",
        deserialize_with = "deserialize_sweep_interval"
    )]
    pub sweep_interval: Option<Duration>,

    /// Upper bound on waiting for background work during shutdown
    #[serde(rename = "shutdown_timeout_ms", with = "duration_millis")]
    pub shutdown_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { sweep_interval: Some(Duration::from_secs(1)), shutdown_timeout: Duration::from_secs(5) }
    }
}

impl ManagerConfig {
    /// Configuration with the background sweeper disabled
    pub fn without_sweeper() -> Self {
        Self { sweep_interval: None, ..Self::default() }
    }

    /// Set the sweep period
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = if interval.is_zero() { None } else { Some(interval) };
        self
    }

    /// Set the shutdown timeout
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sweep period actually used; a zero period counts as disabled
    pub fn effective_sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval.filter(|interval| !interval.is_zero())
    }

    /// Load settings from `MEMCACHE_*` environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when a variable is set but is not
    /// a whole number of milliseconds.
    pub fn from_env() -> CacheResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CacheResult<Self> {
        let mut config = Self::default();

        if let Some(millis) = parse_millis(SWEEP_INTERVAL_VAR, lookup(SWEEP_INTERVAL_VAR))? {
            config.sweep_interval =
                if millis == 0 { None } else { Some(Duration::from_millis(millis)) };
        }

        if let Some(millis) = parse_millis(SHUTDOWN_TIMEOUT_VAR, lookup(SHUTDOWN_TIMEOUT_VAR))? {
            config.shutdown_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

// `0` disables the sweeper, matching the environment variable
fn deserialize_sweep_interval<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let interval = option_duration_millis::deserialize(deserializer)?;
    Ok(interval.filter(|interval| !interval.is_zero()))
}

fn parse_millis(name: &str, raw: Option<String>) -> CacheResult<Option<u64>> {
    raw.map(|value| {
        value.trim().parse::<u64>().map_err(|e| {
            CacheError::Configuration(format!("{name} must be milliseconds, got '{value}': {e}"))
        })
    })
    .transpose()
}
