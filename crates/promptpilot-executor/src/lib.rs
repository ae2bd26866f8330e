//! # PromptPilot Executor
//!
//! Drives one prompt at a time into the host page: waits for the UI to be
//! idle, injects the text and triggers submission, verifies the page went
//! busy, then watches for a newly appeared artifact that was not part of
//! the pre-submission baseline.
//!
//! Submissions are serialized internally because the page has exactly one
//! input surface; concurrent `submit` calls queue behind each other.

pub mod config;
pub mod error;
pub mod executor;
pub mod request;

pub use config::ExecutorConfig;
pub use error::ExecutorError;
pub use executor::{PromptExecutor, SubmitOutcome};
pub use request::{PendingRequest, RequestRegistry, RequestStatus};
