//! Connection errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// The caller tried to send while the connection was not in the
    /// `Connected` state. The manager does not buffer; queueing or dropping
    /// is the caller's choice.
    #[error("Not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Encoding failed: {0}")]
    Encode(#[from] promptpilot_protocols::CodecError),

    /// The manager was already closed by its owner.
    #[error("Connection closed")]
    Closed,
}
