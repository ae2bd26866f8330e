//! Envelope wire format and codec.
//!
//! An [`Envelope`] is the outer unit exchanged with the orchestration server
//! as a WebSocket text frame. Decoding is strict: an envelope either decodes
//! fully or fails with a [`CodecError`]. In particular the `kind`
//! discriminator is compared case-sensitively against the lowercase values
//! `"event"`, `"ack"`, and `"error"`; `"EVENT"` is rejected, never coerced.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::CodecError;
use crate::event::Event;

/// Discriminator for the envelope payload.
///
/// Wire values are lowercase and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Carries a domain [`Event`] in `body`.
    Event,
    /// Transport-level acknowledgment, no body.
    Ack,
    /// Error report; `body` carries the reason and original correlation id.
    Error,
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Ack => write!(f, "ack"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The wire unit exchanged with the orchestration server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique message ID, generated per outgoing envelope.
    pub id: String,
    /// Payload discriminator.
    pub kind: EnvelopeKind,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    /// Domain event; required for `kind=event`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Event>,
}

impl Envelope {
    /// Wrap an event in a fresh envelope.
    pub fn event(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: EnvelopeKind::Event,
            timestamp: chrono::Utc::now().timestamp_millis(),
            body: Some(event),
        }
    }

    /// Create a bodyless transport acknowledgment.
    pub fn ack() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: EnvelopeKind::Ack,
            timestamp: chrono::Utc::now().timestamp_millis(),
            body: None,
        }
    }

    /// Create an error envelope referencing the correlation id of the
    /// message that caused it.
    pub fn error(correlation_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: EnvelopeKind::Error,
            timestamp: chrono::Utc::now().timestamp_millis(),
            body: Some(Event::new(
                "error/dispatch",
                correlation_id,
                json!({ "reason": reason }),
            )),
        }
    }

    /// Encode to the JSON wire representation.
    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    /// Decode from the JSON wire representation.
    ///
    /// Fails on malformed JSON, missing required fields, unknown or
    /// differently-cased `kind` values, and `kind=event` without a body.
    pub fn decode(input: &str) -> Result<Self, CodecError> {
        let raw: Value =
            serde_json::from_str(input).map_err(|e| CodecError::MalformedJson(e.to_string()))?;
        let obj = raw
            .as_object()
            .ok_or_else(|| CodecError::InvalidShape("envelope is not a JSON object".to_string()))?;

        // The kind discriminator is checked first so a wrong or mis-cased
        // value reports UnknownKind rather than a generic shape error.
        let kind_value = obj
            .get("kind")
            .ok_or_else(|| CodecError::MissingField("kind".to_string()))?;
        let kind_str = kind_value
            .as_str()
            .ok_or_else(|| CodecError::InvalidShape("kind is not a string".to_string()))?;
        if !matches!(kind_str, "event" | "ack" | "error") {
            return Err(CodecError::UnknownKind(kind_str.to_string()));
        }

        let envelope: Envelope = serde_json::from_value(raw).map_err(classify_shape_error)?;
        if envelope.kind == EnvelopeKind::Event && envelope.body.is_none() {
            return Err(CodecError::MissingBody);
        }
        Ok(envelope)
    }
}

/// Map serde's "missing field" errors to [`CodecError::MissingField`] so
/// callers can distinguish them from other shape mismatches.
fn classify_shape_error(e: serde_json::Error) -> CodecError {
    let msg = e.to_string();
    if let Some(rest) = msg.strip_prefix("missing field `") {
        if let Some(name) = rest.split('`').next() {
            return CodecError::MissingField(name.to_string());
        }
    }
    CodecError::InvalidShape(msg)
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
