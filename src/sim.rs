//! Simulated host page.
//!
//! A real deployment drives an actual generation page through a DOM-backed
//! [`UiAdapter`]; this binary ships with a simulation instead so the whole
//! pipeline (connection, dispatch, detection, execution) can be soak-tested
//! against any orchestration server without a browser. A triggered
//! submission flips the page busy, produces one artifact after a
//! configurable delay, and returns to idle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use promptpilot_protocols::{AdapterError, ArtifactRef, Mutation, UiAdapter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SimConfig {
    /// How long a simulated generation takes, in milliseconds.
    #[serde(default = "default_artifact_delay_ms")]
    pub artifact_delay_ms: u64,
}

fn default_artifact_delay_ms() -> u64 {
    2_000
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            artifact_delay_ms: default_artifact_delay_ms(),
        }
    }
}

impl SimConfig {
    pub fn artifact_delay(&self) -> Duration {
        Duration::from_millis(self.artifact_delay_ms)
    }
}

struct PageState {
    input_enabled: bool,
    submit_enabled: bool,
    busy: bool,
    pending_prompt: Option<String>,
    artifacts: Vec<ArtifactRef>,
    generated: usize,
}

/// In-process stand-in for the generation page.
pub(crate) struct SimulatedAdapter {
    config: SimConfig,
    state: Arc<Mutex<PageState>>,
    mutation_tx: broadcast::Sender<Mutation>,
}

impl SimulatedAdapter {
    pub fn new(config: SimConfig) -> Self {
        let (mutation_tx, _) = broadcast::channel(64);
        Self {
            config,
            state: Arc::new(Mutex::new(PageState {
                input_enabled: true,
                submit_enabled: true,
                busy: false,
                pending_prompt: None,
                artifacts: Vec::new(),
                generated: 0,
            })),
            mutation_tx,
        }
    }

    fn set_busy(state: &Arc<Mutex<PageState>>, tx: &broadcast::Sender<Mutation>, busy: bool) {
        {
            let mut state = state.lock();
            state.busy = busy;
            state.input_enabled = !busy;
            state.submit_enabled = !busy;
        }
        let _ = tx.send(Mutation);
    }
}

#[async_trait]
impl UiAdapter for SimulatedAdapter {
    async fn is_input_enabled(&self) -> Result<bool, AdapterError> {
        Ok(self.state.lock().input_enabled)
    }

    async fn is_submit_enabled(&self) -> Result<bool, AdapterError> {
        Ok(self.state.lock().submit_enabled)
    }

    async fn is_busy_indicator_present(&self) -> Result<bool, AdapterError> {
        Ok(self.state.lock().busy)
    }

    async fn set_input_text(&self, text: &str) -> Result<(), AdapterError> {
        self.state.lock().pending_prompt = Some(text.to_string());
        Ok(())
    }

    async fn trigger_submit(&self) -> Result<(), AdapterError> {
        let prompt = self.state.lock().pending_prompt.take();
        let Some(prompt) = prompt else {
            return Err(AdapterError::Other(
                "submit triggered with an empty input".to_string(),
            ));
        };

        debug!(prompt = %prompt, "Simulated generation started");
        let state = self.state.clone();
        let mutation_tx = self.mutation_tx.clone();
        let delay = self.config.artifact_delay();
        tokio::spawn(async move {
            Self::set_busy(&state, &mutation_tx, true);
            tokio::time::sleep(delay).await;
            let artifact = {
                let mut state = state.lock();
                state.generated += 1;
                let id = format!("sim-artifact-{}", state.generated);
                let artifact = ArtifactRef::new(id.as_str())
                    .with_url(format!("https://sim.invalid/artifacts/{}.png", id));
                state.artifacts.push(artifact.clone());
                artifact
            };
            debug!(artifact_id = %artifact.id, "Simulated generation finished");
            let _ = mutation_tx.send(Mutation);
            Self::set_busy(&state, &mutation_tx, false);
        });
        Ok(())
    }

    async fn list_artifacts(&self) -> Result<Vec<ArtifactRef>, AdapterError> {
        Ok(self.state.lock().artifacts.clone())
    }

    fn subscribe_mutations(&self) -> broadcast::Receiver<Mutation> {
        self.mutation_tx.subscribe()
    }
}
