//! # PromptPilot Protocols
//!
//! Shared protocol definitions for PromptPilot:
//!
//! - **Envelope/Event**: the JSON wire format exchanged with the
//!   orchestration server over WebSocket
//! - **UiAdapter**: the boundary trait hiding the host page's DOM from the
//!   core (signals, actions, artifact listing, mutation notifications)
//! - **Errors**: codec and adapter error taxonomies

pub mod adapter;
pub mod envelope;
pub mod error;
pub mod event;

pub use adapter::{ArtifactRef, Mutation, UiAdapter};
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{AdapterError, CodecError};
pub use event::{types as event_types, Event};
