//! Connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConnectionError;

/// Connection manager configuration.
///
/// All timings are explicit; defaults live here and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Orchestration server WebSocket URL (ws:// or wss://).
    pub server_url: String,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Heartbeat ping interval in milliseconds.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// A connection with no traffic in either direction for this long is
    /// declared dead and reconnected.
    #[serde(default = "default_dead_after_ms")]
    pub dead_after_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_heartbeat_interval_ms() -> u64 {
    15_000
}

fn default_dead_after_ms() -> u64 {
    45_000
}

impl ConnectionConfig {
    /// Create a configuration with default timings for the given URL.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            dead_after_ms: default_dead_after_ms(),
        }
    }

    /// Validate the URL scheme and timing relationships.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        let url = url::Url::parse(&self.server_url)
            .map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", self.server_url, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConnectionError::InvalidUrl(format!(
                "{}: expected ws:// or wss:// scheme",
                self.server_url
            )));
        }
        if self.base_delay_ms == 0 || self.max_delay_ms < self.base_delay_ms {
            return Err(ConnectionError::InvalidUrl(format!(
                "invalid backoff range: base {}ms, max {}ms",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn dead_after(&self) -> Duration {
        Duration::from_millis(self.dead_after_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::new("ws://127.0.0.1:9000/ws");
        assert_eq!(config.base_delay_ms, 1_000);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_http_scheme() {
        let config = ConnectionConfig::new("http://127.0.0.1:9000");
        assert!(matches!(
            config.validate(),
            Err(ConnectionError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_backoff_range() {
        let config = ConnectionConfig {
            max_delay_ms: 10,
            ..ConnectionConfig::new("ws://127.0.0.1:9000")
        };
        assert!(config.validate().is_err());
    }
}
