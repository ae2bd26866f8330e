//! Detector configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// UI state detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// A computed state must hold this long before it is committed.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Periodic recompute interval guarding against missed mutation
    /// notifications.
    #[serde(default = "default_fallback_tick_ms")]
    pub fallback_tick_ms: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_fallback_tick_ms() -> u64 {
    1_000
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            fallback_tick_ms: default_fallback_tick_ms(),
        }
    }
}

impl DetectorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn fallback_tick(&self) -> Duration {
        Duration::from_millis(self.fallback_tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.fallback_tick(), Duration::from_millis(1_000));
    }
}
