//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dedupe::DedupePolicy;
use crate::error::{Error, Result};

/// Options recognised when opening a headset session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Log every raw report
    #[serde(default)]
    pub debug: bool,
    /// Milliseconds between keep-alive writes to the status interface
    #[serde(default = "default_update_delay_ms", alias = "updateDelay")]
    pub update_delay_ms: u64,
    /// Suppress repeated power/mute/charging/battery values
    #[serde(default = "default_true")]
    pub dedupe: bool,
    /// Minimum interval before an unchanged battery value is re-emitted
    #[serde(default = "default_battery_min_interval_ms", alias = "batteryMinIntervalMs")]
    pub battery_min_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug: false,
            update_delay_ms: default_update_delay_ms(),
            dedupe: true,
            battery_min_interval_ms: default_battery_min_interval_ms(),
        }
    }
}

fn default_update_delay_ms() -> u64 {
    300_000
}

fn default_battery_min_interval_ms() -> u64 {
    15_000
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// Check the configuration for values a session cannot run with.
    ///
    /// # Errors
    /// Returns an error if the keep-alive delay is zero.
    pub fn validate(&self) -> Result<()> {
        if self.update_delay_ms == 0 {
            return Err(Error::InvalidConfig("update_delay_ms must be greater than zero".into()));
        }
        Ok(())
    }

    /// Interval between keep-alive writes.
    #[must_use]
    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    /// Dedupe policy derived from this configuration.
    #[must_use]
    pub fn dedupe_policy(&self) -> DedupePolicy {
        DedupePolicy {
            enabled: self.dedupe,
            battery_min_interval: Duration::from_millis(self.battery_min_interval_ms),
        }
    }
}
