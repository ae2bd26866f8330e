//! Dispatch errors.

use thiserror::Error;

/// Errors a handler may report back to the router.
///
/// Handler failures never escape the router as panics or raw errors; the
/// router converts them into `error`-kind envelopes for the sender.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}
