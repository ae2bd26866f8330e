//! Event handlers bridging the dispatch router to the executor.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use promptpilot_connection::ConnectionManager;
use promptpilot_detector::UiStateDetector;
use promptpilot_dispatch::{DispatchError, EventHandler};
use promptpilot_executor::{PromptExecutor, RequestRegistry};
use promptpilot_protocols::{event_types, Envelope, Event};

/// Handles `image/request/received`: runs the prompt through the executor
/// and answers with an acknowledgment or a failure event.
///
/// Executor failures are replies, not handler errors: the failure event is
/// cached by the dedup layer so a redelivered request does not re-drive
/// the page.
pub(crate) struct ImageRequestHandler {
    executor: Arc<PromptExecutor>,
    shutdown: CancellationToken,
}

impl ImageRequestHandler {
    pub fn new(executor: Arc<PromptExecutor>, shutdown: CancellationToken) -> Self {
        Self { executor, shutdown }
    }
}

#[async_trait]
impl EventHandler for ImageRequestHandler {
    async fn handle(&self, event: &Event) -> Result<Option<Envelope>, DispatchError> {
        let prompt = event
            .payload
            .get("prompt")
            .and_then(|p| p.as_str())
            .ok_or_else(|| {
                DispatchError::MalformedPayload("missing string field \"prompt\"".to_string())
            })?;
        if prompt.trim().is_empty() {
            return Err(DispatchError::MalformedPayload(
                "empty prompt".to_string(),
            ));
        }

        info!(correlation_id = %event.correlation_id, "Image request accepted");
        let reply = match self
            .executor
            .submit(&event.correlation_id, prompt, self.shutdown.child_token())
            .await
        {
            Ok(outcome) => Event::new(
                event_types::IMAGE_REQUEST_ACKNOWLEDGED,
                event.correlation_id.as_str(),
                json!({
                    "artifactId": outcome.artifact.id,
                    "artifactUrl": outcome.artifact.url,
                }),
            ),
            Err(e) => Event::new(
                event_types::IMAGE_REQUEST_FAILED,
                event.correlation_id.as_str(),
                json!({ "reason": e.reason_code() }),
            ),
        };
        Ok(Some(Envelope::event(reply)))
    }
}

/// Handles `status/query` with a snapshot of the whole core.
pub(crate) struct StatusQueryHandler {
    connection: Arc<ConnectionManager>,
    detector: Arc<UiStateDetector>,
    registry: Arc<RequestRegistry>,
}

impl StatusQueryHandler {
    pub fn new(
        connection: Arc<ConnectionManager>,
        detector: Arc<UiStateDetector>,
        registry: Arc<RequestRegistry>,
    ) -> Self {
        Self {
            connection,
            detector,
            registry,
        }
    }
}

#[async_trait]
impl EventHandler for StatusQueryHandler {
    async fn handle(&self, event: &Event) -> Result<Option<Envelope>, DispatchError> {
        let requests = self.registry.snapshot();
        let in_flight = requests.iter().filter(|r| !r.status.is_terminal()).count();
        let report = Event::new(
            event_types::STATUS_REPORT,
            event.correlation_id.as_str(),
            json!({
                "connection": self.connection.state().to_string(),
                "ui": self.detector.current_state().to_string(),
                "inFlight": in_flight,
                "requests": requests,
            }),
        );
        Ok(Some(Envelope::event(report)))
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
