//! Event dispatch router.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use promptpilot_protocols::{Envelope, EnvelopeKind, Event};

use crate::config::DispatchConfig;
use crate::dedup::DedupCache;
use crate::error::DispatchError;

/// Reason string used in error envelopes when no handler is registered.
pub const UNKNOWN_EVENT_TYPE: &str = "UnknownEventType";

/// A handler for one event type.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event, optionally producing a reply envelope.
    ///
    /// The reply (or its absence) is cached per correlation id; a failure is
    /// reported to the sender as an error envelope and is not cached.
    async fn handle(&self, event: &Event) -> Result<Option<Envelope>, DispatchError>;
}

/// Maps incoming event types to handlers and enforces at-most-once handling
/// by correlation id.
pub struct DispatchRouter {
    handlers: RwLock<HashMap<String, Arc<dyn EventHandler>>>,
    dedup: DedupCache,
}

impl DispatchRouter {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            dedup: DedupCache::new(config.dedup_retention(), config.dedup_capacity),
        }
    }

    /// Register a handler for an event type. Replaces any previous handler
    /// for the same type.
    pub fn register(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        debug!(event_type = %event_type, "Registering handler");
        self.handlers.write().insert(event_type, handler);
    }

    /// Dispatch one envelope, returning the reply to send back, if any.
    ///
    /// Never fails: unknown event types and handler failures are answered
    /// with `error`-kind envelopes, non-event envelopes are logged and
    /// produce no reply.
    pub async fn handle(&self, envelope: Envelope) -> Option<Envelope> {
        match envelope.kind {
            EnvelopeKind::Ack => {
                debug!(id = %envelope.id, "Ack envelope, nothing to dispatch");
                None
            }
            EnvelopeKind::Error => {
                warn!(id = %envelope.id, "Server reported an error envelope");
                None
            }
            EnvelopeKind::Event => {
                // The codec guarantees a body for kind=event; a missing one
                // here means the envelope bypassed decode.
                let Some(event) = envelope.body else {
                    warn!(id = %envelope.id, "Event envelope without body, dropping");
                    return None;
                };
                self.dispatch_event(event).await
            }
        }
    }

    async fn dispatch_event(&self, event: Event) -> Option<Envelope> {
        if let Some(cached) = self.dedup.get(&event.correlation_id) {
            debug!(
                correlation_id = %event.correlation_id,
                event_type = %event.event_type,
                "Duplicate delivery, replaying cached reply"
            );
            return cached;
        }

        let handler = self.handlers.read().get(&event.event_type).cloned();
        let Some(handler) = handler else {
            warn!(event_type = %event.event_type, "No handler registered");
            return Some(Envelope::error(event.correlation_id.as_str(), UNKNOWN_EVENT_TYPE));
        };

        match handler.handle(&event).await {
            Ok(reply) => {
                self.dedup.insert(event.correlation_id.as_str(), reply.clone());
                reply
            }
            Err(e) => {
                warn!(
                    correlation_id = %event.correlation_id,
                    event_type = %event.event_type,
                    "Handler failed: {}", e
                );
                Some(Envelope::error(event.correlation_id.as_str(), e.to_string()))
            }
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
