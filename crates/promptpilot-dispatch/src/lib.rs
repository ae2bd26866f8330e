//! # PromptPilot Dispatch
//!
//! Routes incoming envelopes to registered [`EventHandler`]s by event type
//! and guarantees at-most-once handling per correlation id: a redelivered
//! event (reconnect-triggered server retry, reordered frame) returns the
//! cached reply without re-invoking the handler, so side effects like prompt
//! submission never run twice.

pub mod config;
pub mod dedup;
pub mod error;
pub mod router;

pub use config::DispatchConfig;
pub use dedup::DedupCache;
pub use error::DispatchError;
pub use router::{DispatchRouter, EventHandler};
