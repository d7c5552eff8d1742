//! Wizard configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_SUBMIT_DELAY_MS: u64 = 2000;
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MOCK_FAILURE_RATE: f64 = 0.0;

const SUBMIT_DELAY_VAR: &str = "SHESECURES_SUBMIT_DELAY_MS";
const SUBMIT_TIMEOUT_VAR: &str = "SHESECURES_SUBMIT_TIMEOUT_MS";
const MOCK_FAILURE_RATE_VAR: &str = "SHESECURES_MOCK_FAILURE_RATE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WizardConfig {
    /// Latency of the mock submission backend.
    pub submit_delay_ms: u64,
    /// Deadline for a single submission attempt.
    pub submit_timeout_ms: u64,
    /// Fraction of mock submissions that fail, in `[0, 1]`.
    pub mock_failure_rate: f64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            submit_delay_ms: DEFAULT_SUBMIT_DELAY_MS,
            submit_timeout_ms: DEFAULT_SUBMIT_TIMEOUT_MS,
            mock_failure_rate: DEFAULT_MOCK_FAILURE_RATE,
        }
    }
}

impl WizardConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `SHESECURES_SUBMIT_DELAY_MS`: default 2000
    /// - `SHESECURES_SUBMIT_TIMEOUT_MS`: default 10000, must be > 0
    /// - `SHESECURES_MOCK_FAILURE_RATE`: default 0.0, must be within [0, 1]
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value parses but is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`WizardConfig::from_env`] but reads values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value parses but is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            submit_delay_ms: parse_or(&lookup, SUBMIT_DELAY_VAR, DEFAULT_SUBMIT_DELAY_MS),
            submit_timeout_ms: parse_or(&lookup, SUBMIT_TIMEOUT_VAR, DEFAULT_SUBMIT_TIMEOUT_MS),
            mock_failure_rate: parse_or(&lookup, MOCK_FAILURE_RATE_VAR, DEFAULT_MOCK_FAILURE_RATE),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero timeout or a failure rate outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.submit_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout { var: SUBMIT_TIMEOUT_VAR });
        }
        if !(0.0..=1.0).contains(&self.mock_failure_rate) {
            return Err(ConfigError::RateOutOfRange { var: MOCK_FAILURE_RATE_VAR, value: self.mock_failure_rate });
        }
        Ok(())
    }

    #[must_use]
    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    #[must_use]
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
