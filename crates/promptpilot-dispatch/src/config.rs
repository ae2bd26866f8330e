//! Dispatch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Dispatch router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How long a handled correlation id is remembered for deduplication.
    #[serde(default = "default_dedup_retention_ms")]
    pub dedup_retention_ms: u64,

    /// Upper bound on remembered correlation ids; the oldest entries are
    /// evicted first once the bound is reached.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

fn default_dedup_retention_ms() -> u64 {
    300_000
}

fn default_dedup_capacity() -> usize {
    1_024
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dedup_retention_ms: default_dedup_retention_ms(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

impl DispatchConfig {
    pub fn dedup_retention(&self) -> Duration {
        Duration::from_millis(self.dedup_retention_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.dedup_retention(), Duration::from_secs(300));
        assert_eq!(config.dedup_capacity, 1_024);
    }
}
