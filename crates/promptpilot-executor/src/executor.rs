//! Prompt submission pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::time::{timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use promptpilot_detector::{UiState, UiStateDetector};
use promptpilot_protocols::{ArtifactRef, UiAdapter};

use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::request::{PendingRequest, RequestRegistry, RequestStatus};

/// Successful submission result.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub correlation_id: String,
    pub artifact: ArtifactRef,
}

/// Drives prompt requests into the host page, one at a time.
///
/// The executor reads the detector's state but never writes it, and it owns
/// the set of already-seen artifact ids so pre-existing page content is
/// never reported as a new result.
pub struct PromptExecutor {
    adapter: Arc<dyn UiAdapter>,
    detector: Arc<UiStateDetector>,
    config: ExecutorConfig,
    registry: Arc<RequestRegistry>,
    /// Artifact ids present before the first submission plus everything
    /// reported since; `None` until the baseline scan ran.
    seen_artifacts: Mutex<Option<HashSet<String>>>,
    /// The page has one input surface; this lock serializes access to it.
    submit_lock: Mutex<()>,
}

impl PromptExecutor {
    pub fn new(
        adapter: Arc<dyn UiAdapter>,
        detector: Arc<UiStateDetector>,
        config: ExecutorConfig,
    ) -> Self {
        let registry = Arc::new(RequestRegistry::new(config.retention()));
        Self {
            adapter,
            detector,
            config,
            registry,
            seen_artifacts: Mutex::new(None),
            submit_lock: Mutex::new(()),
        }
    }

    /// Registry of in-flight and recently finished requests.
    pub fn registry(&self) -> Arc<RequestRegistry> {
        self.registry.clone()
    }

    /// Submit one prompt and wait for its artifact.
    ///
    /// Concurrent calls queue behind the internal lock; the second call
    /// only starts driving the page after the first reached a terminal
    /// status. Cancelling the token aborts any wait, marks the request
    /// failed, and releases the lock.
    pub async fn submit(
        &self,
        correlation_id: &str,
        prompt_text: &str,
        cancel: CancellationToken,
    ) -> Result<SubmitOutcome, ExecutorError> {
        self.registry
            .insert(PendingRequest::new(correlation_id, prompt_text));

        let guard = tokio::select! {
            guard = self.submit_lock.lock() => guard,
            _ = cancel.cancelled() => {
                self.finish(correlation_id, &ExecutorError::Cancelled);
                return Err(ExecutorError::Cancelled);
            }
        };

        let result = self
            .run_submission(correlation_id, prompt_text, &cancel)
            .await;
        drop(guard);

        match &result {
            Ok(outcome) => {
                info!(
                    correlation_id,
                    artifact_id = %outcome.artifact.id,
                    "Request completed"
                );
                self.registry
                    .set_status(correlation_id, RequestStatus::Completed, None);
            }
            Err(e) => {
                warn!(correlation_id, reason = e.reason_code(), "Request failed: {}", e);
                self.finish(correlation_id, e);
            }
        }
        result
    }

    /// Record the terminal status for a failed request.
    fn finish(&self, correlation_id: &str, error: &ExecutorError) {
        let status = match error {
            ExecutorError::UiBusyTimeout(_) | ExecutorError::ArtifactTimeout(_) => {
                RequestStatus::TimedOut
            }
            _ => RequestStatus::Failed,
        };
        self.registry
            .set_status(correlation_id, status, Some(error.reason_code().to_string()));
    }

    async fn run_submission(
        &self,
        correlation_id: &str,
        prompt_text: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmitOutcome, ExecutorError> {
        let baseline = self.ensure_baseline().await?;
        let mut states = self.detector.on_change();

        // Idle gate: no DOM mutation happens unless the page reports idle.
        tokio::select! {
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
            waited = timeout(
                self.config.idle_wait_timeout(),
                states.wait_for(|s| *s == UiState::Idle),
            ) => match waited {
                Err(_) => return Err(ExecutorError::UiBusyTimeout(self.config.idle_wait_timeout_ms)),
                Ok(Err(_)) => return Err(ExecutorError::DetectorGone),
                Ok(Ok(_)) => {}
            }
        }

        self.adapter.set_input_text(prompt_text).await?;
        self.adapter.trigger_submit().await?;
        self.registry
            .set_status(correlation_id, RequestStatus::Submitted, None);
        debug!(correlation_id, "Prompt injected and submitted");

        // The page must visibly react within the grace period, otherwise
        // the adapter's selectors are likely stale and we never enter the
        // artifact wait.
        tokio::select! {
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
            waited = timeout(
                self.config.submit_grace(),
                states.wait_for(|s| *s == UiState::Busy),
            ) => match waited {
                Err(_) => return Err(ExecutorError::SubmissionNotDetected),
                Ok(Err(_)) => return Err(ExecutorError::DetectorGone),
                Ok(Ok(_)) => {}
            }
        }

        self.registry
            .set_status(correlation_id, RequestStatus::AwaitingArtifact, None);
        let artifact = self.await_artifact(&baseline, cancel).await?;
        self.mark_seen(&artifact).await;

        Ok(SubmitOutcome {
            correlation_id: correlation_id.to_string(),
            artifact,
        })
    }

    /// Scan the page once before the first submission so pre-existing
    /// artifacts are never reported as results.
    async fn ensure_baseline(&self) -> Result<HashSet<String>, ExecutorError> {
        let mut seen = self.seen_artifacts.lock().await;
        if seen.is_none() {
            let existing = self.adapter.list_artifacts().await?;
            let ids: HashSet<String> = existing.into_iter().map(|a| a.id).collect();
            debug!(count = ids.len(), "Captured artifact baseline");
            *seen = Some(ids);
        }
        Ok(seen.clone().unwrap_or_default())
    }

    async fn mark_seen(&self, artifact: &ArtifactRef) {
        if let Some(seen) = self.seen_artifacts.lock().await.as_mut() {
            seen.insert(artifact.id.clone());
        }
    }

    /// Wait for an artifact that is not in the request's baseline,
    /// rescanning on mutation notifications and on a poll interval.
    async fn await_artifact(
        &self,
        baseline: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<ArtifactRef, ExecutorError> {
        let mut mutations = self.adapter.subscribe_mutations();
        let mut mutations_open = true;
        let deadline = Instant::now() + self.config.artifact_timeout();

        let mut poll = tokio::time::interval(self.config.artifact_poll());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let artifacts = self.adapter.list_artifacts().await?;
            if let Some(artifact) = artifacts.into_iter().find(|a| !baseline.contains(&a.id)) {
                return Ok(artifact);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(ExecutorError::ArtifactTimeout(self.config.artifact_timeout_ms));
                }
                _ = poll.tick() => {}
                result = mutations.recv(), if mutations_open => {
                    if matches!(result, Err(broadcast::error::RecvError::Closed)) {
                        mutations_open = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
