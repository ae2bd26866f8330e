//! Correlation-id deduplication cache.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use promptpilot_protocols::Envelope;

struct CachedReply {
    reply: Option<Envelope>,
    at: Instant,
}

/// Remembers handled correlation ids and their replies for a retention
/// window, bounded by a capacity (oldest evicted first).
///
/// Only successful handler outcomes are cached; a failed handling is not
/// remembered, so a later retry of the same correlation id may run again.
pub struct DedupCache {
    retention: Duration,
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<String, CachedReply>,
    // Insertion order for capacity eviction.
    order: VecDeque<String>,
}

impl DedupCache {
    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            retention,
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Look up the cached reply for a correlation id.
    ///
    /// `Some(reply)` means the id was handled within the retention window;
    /// the inner `Option` is the reply produced back then (handlers may
    /// legitimately produce none).
    pub fn get(&self, correlation_id: &str) -> Option<Option<Envelope>> {
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, self.retention);
        inner
            .entries
            .get(correlation_id)
            .map(|cached| cached.reply.clone())
    }

    /// Remember the reply for a correlation id.
    pub fn insert(&self, correlation_id: impl Into<String>, reply: Option<Envelope>) {
        let correlation_id = correlation_id.into();
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, self.retention);

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }

        if inner
            .entries
            .insert(
                correlation_id.clone(),
                CachedReply {
                    reply,
                    at: Instant::now(),
                },
            )
            .is_none()
        {
            inner.order.push_back(correlation_id);
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, self.retention);
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(inner: &mut Inner, retention: Duration) {
        let now = Instant::now();
        while let Some(oldest) = inner.order.front() {
            let expired = inner
                .entries
                .get(oldest)
                .is_none_or(|cached| now.duration_since(cached.at) >= retention);
            if !expired {
                break;
            }
            let oldest = inner.order.pop_front().unwrap_or_default();
            inner.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
