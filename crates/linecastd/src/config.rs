//! Relay configuration.
//!
//! Values are layered: built-in defaults, then environment variables, then
//! whatever the binary's command line overrides.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:6380";

/// Default cadence of the online-peer report.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(1);

pub const ENV_LISTEN: &str = "LINECAST_LISTEN";
pub const ENV_STATS_INTERVAL_MS: &str = "LINECAST_STATS_INTERVAL_MS";
pub const ENV_MAX_LINE: &str = "LINECAST_MAX_LINE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address the server binds to.
    pub listen_addr: String,

    /// How often the monitor reports the online-peer count.
    pub stats_interval: Duration,

    /// Maximum bytes per line before the terminator (None = unbounded).
    pub max_line_length: Option<usize>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            stats_interval: DEFAULT_STATS_INTERVAL,
            max_line_length: None,
        }
    }
}

impl RelayConfig {
    /// Defaults overridden by any `LINECAST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_LISTEN) {
            config.listen_addr = addr;
        }

        if let Some(raw) = lookup(ENV_STATS_INTERVAL_MS) {
            config.stats_interval = Duration::from_millis(parse_positive(ENV_STATS_INTERVAL_MS, &raw)?);
        }

        if let Some(raw) = lookup(ENV_MAX_LINE) {
            config.max_line_length = Some(parse_max_line(ENV_MAX_LINE, &raw)?);
        }

        Ok(config)
    }
}

/// Parses a maximum line length, rejecting 0 and values that do not fit
/// in `usize` on this target.
pub fn parse_max_line(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    let max = parse_positive(key, raw)?;
    usize::try_from(max).map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
        Ok(n) => Ok(n),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} (expected a positive integer)")]
    InvalidValue { key: &'static str, value: String },
}
