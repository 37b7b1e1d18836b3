use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Parameters of the two-speed rebuild timer.
///
/// The debounce window coalesces bursts of per-domain updates into one
/// topology rebuild; the idle interval bounds timer wakeups when nothing
/// has changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSettings {
    /// Quiet window after the most recent change before a rebuild fires
    #[serde(default = "default_debounce_window")]
    pub debounce_window_in_ms: u64,

    /// Sleep period while no domain details are changing
    #[serde(default = "default_idle_interval")]
    pub idle_interval_in_ms: u64,
}

fn default_debounce_window() -> u64 {
    60_000
}

fn default_idle_interval() -> u64 {
    3_600_000
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            debounce_window_in_ms: default_debounce_window(),
            idle_interval_in_ms: default_idle_interval(),
        }
    }
}

impl AggregatorSettings {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_in_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_in_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce_window_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "aggregator.debounce_window_in_ms must be at least 1ms".into(),
            )));
        }
        if self.idle_interval_in_ms < self.debounce_window_in_ms {
            return Err(Error::Config(ConfigError::Message(
                "aggregator.idle_interval_in_ms must not be shorter than the debounce window".into(),
            )));
        }
        Ok(())
    }
}
