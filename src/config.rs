//! Application configuration.
//!
//! One TOML file with a section per subsystem. Every field has a default,
//! so an empty file (or no file at all) yields a fully working setup
//! pointed at a local orchestration server.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use promptpilot_connection::ConnectionConfig;
use promptpilot_detector::DetectorConfig;
use promptpilot_dispatch::DispatchConfig;
use promptpilot_executor::ExecutorConfig;

use crate::cli::Cli;
use crate::sim::SimConfig;

fn default_connection() -> ConnectionConfig {
    ConnectionConfig::new("ws://127.0.0.1:8765/ws")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AppConfig {
    #[serde(default = "default_connection")]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub sim: SimConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connection: default_connection(),
            dispatch: DispatchConfig::default(),
            detector: DetectorConfig::default(),
            executor: ExecutorConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, or fall back to defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Apply command-line overrides on top of the file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.server_url {
            self.connection.server_url = url.clone();
        }
        if let Some(delay) = cli.artifact_delay_ms {
            self.sim.artifact_delay_ms = delay;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_missing_file_path_yields_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.connection.server_url, "ws://127.0.0.1:8765/ws");
        assert_eq!(config.executor.idle_wait_timeout_ms, 45_000);
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[connection]\nserver_url = \"wss://orchestrator.example/ws\"\n\n[detector]\ndebounce_ms = 400"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.connection.server_url, "wss://orchestrator.example/ws");
        assert_eq!(config.connection.heartbeat_interval_ms, 15_000);
        assert_eq!(config.detector.debounce_ms, 400);
        assert_eq!(config.detector.fallback_tick_ms, 1_000);
        assert_eq!(config.dispatch.dedup_capacity, 1_024);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connection = 12").unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());
    }
}
