//! # PromptPilot Connection
//!
//! Owns the one logical WebSocket connection to the orchestration server:
//!
//! - connect / close with a `Disconnected → Connecting → Connected` lifecycle
//! - automatic reconnect with exponential backoff on unexpected loss
//! - heartbeat pings and dead-connection detection
//! - decoded [`Envelope`](promptpilot_protocols::Envelope) delivery via
//!   broadcast, lifecycle delivery via watch
//!
//! A `close()` requested by the owner is terminal and never reconnects.

pub mod backoff;
pub mod config;
pub mod error;
pub mod manager;

pub use backoff::Backoff;
pub use config::ConnectionConfig;
pub use error::ConnectionError;
pub use manager::{ConnectionManager, ConnectionState};
