//! Pending request bookkeeping.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

/// Lifecycle of one prompt request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Queued,
    Submitted,
    AwaitingArtifact,
    Completed,
    Failed,
    TimedOut,
}

impl RequestStatus {
    /// Whether the request has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Submitted => write!(f, "submitted"),
            Self::AwaitingArtifact => write!(f, "awaiting-artifact"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed-out"),
        }
    }
}

/// Bookkeeping record for one in-flight or recently finished prompt.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequest {
    pub correlation_id: String,
    pub prompt_text: String,
    pub status: RequestStatus,
    /// Set when the prompt was actually injected and submitted.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Reason code for failed/timed-out requests.
    pub reason: Option<String>,
}

impl PendingRequest {
    pub fn new(correlation_id: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            prompt_text: prompt_text.into(),
            status: RequestStatus::Queued,
            submitted_at: None,
            reason: None,
        }
    }
}

struct Tracked {
    request: PendingRequest,
    /// When the request reached a terminal status; drives eviction.
    finished_at: Option<Instant>,
}

/// In-memory registry of requests, retained past completion for the dedup
/// window so status queries and retry checks can see recent history.
pub struct RequestRegistry {
    retention: Duration,
    inner: Mutex<HashMap<String, Tracked>>,
}

impl RequestRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a fresh record, replacing any previous one for the same
    /// correlation id.
    pub fn insert(&self, request: PendingRequest) {
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, self.retention);
        inner.insert(
            request.correlation_id.clone(),
            Tracked {
                request,
                finished_at: None,
            },
        );
    }

    /// Move a request to a new status; terminal statuses start the
    /// retention clock and record the reason, if any.
    pub fn set_status(&self, correlation_id: &str, status: RequestStatus, reason: Option<String>) {
        let mut inner = self.inner.lock();
        if let Some(tracked) = inner.get_mut(correlation_id) {
            tracked.request.status = status;
            if reason.is_some() {
                tracked.request.reason = reason;
            }
            if status == RequestStatus::Submitted {
                tracked.request.submitted_at = Some(Utc::now());
            }
            if status.is_terminal() {
                tracked.finished_at = Some(Instant::now());
            }
        }
    }

    pub fn get(&self, correlation_id: &str) -> Option<PendingRequest> {
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, self.retention);
        inner.get(correlation_id).map(|t| t.request.clone())
    }

    /// Snapshot of every live record, for status reporting.
    pub fn snapshot(&self) -> Vec<PendingRequest> {
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, self.retention);
        inner.values().map(|t| t.request.clone()).collect()
    }

    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, self.retention);
        inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(inner: &mut HashMap<String, Tracked>, retention: Duration) {
        let now = Instant::now();
        inner.retain(|_, tracked| {
            tracked
                .finished_at
                .is_none_or(|finished| now.duration_since(finished) < retention)
        });
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
