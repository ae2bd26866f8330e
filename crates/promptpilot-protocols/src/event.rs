//! Domain events carried inside envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical event type strings.
///
/// One path-style scheme is used uniformly; handlers and tests refer to
/// these constants rather than literal strings.
pub mod types {
    /// Server asks the core to submit a prompt for image generation.
    pub const IMAGE_REQUEST_RECEIVED: &str = "image/request/received";
    /// Core reports a completed generation with the artifact reference.
    pub const IMAGE_REQUEST_ACKNOWLEDGED: &str = "image/request/acknowledged";
    /// Core reports a failed generation with a reason code.
    pub const IMAGE_REQUEST_FAILED: &str = "image/request/failed";
    /// Server asks for the core's current status.
    pub const STATUS_QUERY: &str = "status/query";
    /// Core answers a status query.
    pub const STATUS_REPORT: &str = "status/report";
}

/// A domain event (request or acknowledgment) carried inside an
/// [`Envelope`](crate::envelope::Envelope).
///
/// The `correlationId` links a request to its eventual response and is the
/// key used for at-most-once deduplication across redeliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event ID.
    pub id: String,
    /// Event type, one of the [`types`] constants.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Identifier linking request and response; unique per logical request.
    pub correlation_id: String,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    /// Type-specific structured data (prompt text, artifact id, ...).
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    /// Create a new event with a fresh ID and the current timestamp.
    pub fn new(
        event_type: impl Into<String>,
        correlation_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            correlation_id: correlation_id.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload,
        }
    }
}
