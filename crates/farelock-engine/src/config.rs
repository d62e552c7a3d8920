//! # Engine Configuration
//!
//! Timeout windows for the two refund paths. Defaults are 15 minutes
//! (accepted, not funded) and 30 minutes (funded, not started); both can
//! be overridden from the environment.

use std::time::Duration;

use thiserror::Error;

use farelock_state::RideTimeouts;

/// Env var overriding the accept timeout, in seconds.
pub const ACCEPT_TIMEOUT_ENV: &str = "FARELOCK_ACCEPT_TIMEOUT_SECS";
/// Env var overriding the start timeout, in seconds.
pub const START_TIMEOUT_ENV: &str = "FARELOCK_START_TIMEOUT_SECS";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    NotANumber { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    pub timeouts: RideTimeouts,
}

impl EngineConfig {
    pub fn new(accept_timeout: Duration, start_timeout: Duration) -> Result<Self, ConfigError> {
        if accept_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout(ACCEPT_TIMEOUT_ENV));
        }
        if start_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout(START_TIMEOUT_ENV));
        }
        Ok(Self {
            timeouts: RideTimeouts {
                accept: accept_timeout,
                start: start_timeout,
            },
        })
    }

    /// Read overrides from the process environment. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read overrides through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = RideTimeouts::default();
        let accept = read_secs(&lookup, ACCEPT_TIMEOUT_ENV)?.unwrap_or(defaults.accept);
        let start = read_secs(&lookup, START_TIMEOUT_ENV)?.unwrap_or(defaults.start);
        Self::new(accept, start)
    }

    pub fn accept_timeout(&self) -> Duration {
        self.timeouts.accept
    }

    pub fn start_timeout(&self) -> Duration {
        self.timeouts.start
    }
}

fn read_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::NotANumber {
        var,
        value: raw.clone(),
    })?;
    Ok(Some(Duration::from_secs(secs)))
}
