//! Protocol errors.

use thiserror::Error;

/// Errors produced by the envelope codec.
///
/// Decoding either fully succeeds or fails with one of these variants;
/// there is no partial decode and no silent defaulting of fields.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown envelope kind: {0:?} (expected \"event\", \"ack\", or \"error\")")]
    UnknownKind(String),

    #[error("Envelope of kind \"event\" has no body")]
    MissingBody,

    #[error("Invalid envelope shape: {0}")]
    InvalidShape(String),

    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Errors reported by a [`UiAdapter`](crate::adapter::UiAdapter) implementation.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    #[error("Host page is gone")]
    PageGone,

    #[error("Adapter failure: {0}")]
    Other(String),
}
