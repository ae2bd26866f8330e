//! Executor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prompt executor configuration.
///
/// Every bounded wait in the executor is driven by one of these values;
/// there are no timeouts hidden in the logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// How long to wait for the UI to report idle before giving up.
    #[serde(default = "default_idle_wait_timeout_ms")]
    pub idle_wait_timeout_ms: u64,

    /// After triggering submission, the UI must go busy within this window
    /// or the submission is considered undetected (stale selectors).
    #[serde(default = "default_submit_grace_ms")]
    pub submit_grace_ms: u64,

    /// How long to watch for a new artifact after a detected submission.
    #[serde(default = "default_artifact_timeout_ms")]
    pub artifact_timeout_ms: u64,

    /// Artifact re-scan interval while waiting, in addition to scans
    /// triggered by mutation notifications.
    #[serde(default = "default_artifact_poll_ms")]
    pub artifact_poll_ms: u64,

    /// How long terminal requests stay in the registry for status queries
    /// and dedup bookkeeping.
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
}

fn default_idle_wait_timeout_ms() -> u64 {
    45_000
}

fn default_submit_grace_ms() -> u64 {
    5_000
}

fn default_artifact_timeout_ms() -> u64 {
    90_000
}

fn default_artifact_poll_ms() -> u64 {
    500
}

fn default_retention_ms() -> u64 {
    300_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            idle_wait_timeout_ms: default_idle_wait_timeout_ms(),
            submit_grace_ms: default_submit_grace_ms(),
            artifact_timeout_ms: default_artifact_timeout_ms(),
            artifact_poll_ms: default_artifact_poll_ms(),
            retention_ms: default_retention_ms(),
        }
    }
}

impl ExecutorConfig {
    pub fn idle_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_wait_timeout_ms)
    }

    pub fn submit_grace(&self) -> Duration {
        Duration::from_millis(self.submit_grace_ms)
    }

    pub fn artifact_timeout(&self) -> Duration {
        Duration::from_millis(self.artifact_timeout_ms)
    }

    pub fn artifact_poll(&self) -> Duration {
        Duration::from_millis(self.artifact_poll_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts_are_sane() {
        let config = ExecutorConfig::default();
        assert!(config.idle_wait_timeout() >= Duration::from_secs(30));
        assert!(config.idle_wait_timeout() <= Duration::from_secs(60));
        assert!(config.artifact_timeout() >= Duration::from_secs(60));
        assert!(config.artifact_timeout() <= Duration::from_secs(120));
    }
}
