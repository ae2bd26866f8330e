//! Executor errors.
//!
//! All of these are recoverable: they terminate one request with a reason
//! code, never the process.

use thiserror::Error;

use promptpilot_protocols::AdapterError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The UI never reported idle within the idle-wait timeout. No DOM
    /// mutation was attempted.
    #[error("UI did not become idle within {0} ms")]
    UiBusyTimeout(u64),

    /// Submission was triggered but the UI never went busy within the grace
    /// period, which usually means the adapter's selectors are stale.
    #[error("Submission was not detected by the UI")]
    SubmissionNotDetected,

    /// The submission was detected but no new artifact appeared in time.
    #[error("No artifact appeared within {0} ms")]
    ArtifactTimeout(u64),

    /// The caller cancelled the request.
    #[error("Request was cancelled")]
    Cancelled,

    /// The detector was torn down while the request waited on it.
    #[error("UI state detector is gone")]
    DetectorGone,

    #[error("Adapter failure: {0}")]
    Adapter(#[from] AdapterError),
}

impl ExecutorError {
    /// Stable reason code reported back to the orchestration server.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::UiBusyTimeout(_) => "UiBusyTimeout",
            Self::SubmissionNotDetected => "SubmissionNotDetected",
            Self::ArtifactTimeout(_) => "ArtifactTimeout",
            Self::Cancelled => "Cancelled",
            Self::DetectorGone => "DetectorGone",
            Self::Adapter(_) => "AdapterFailure",
        }
    }
}
