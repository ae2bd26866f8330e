//! UI adapter boundary.
//!
//! The core never touches the host page's DOM directly. A [`UiAdapter`]
//! implementation owns the concrete selectors for one host page version and
//! exposes only the signals and actions the core needs. Swapping the host
//! page (or running against a simulation) means swapping the adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::AdapterError;

/// Reference to a generated artifact (e.g. an image) on the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Stable identifier for the artifact within the page.
    pub id: String,
    /// Download URL, when the page exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ArtifactRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Notification that something relevant changed on the host page.
///
/// Carries no detail on purpose: receivers recompute from the signal
/// getters, so a missed or coalesced notification is harmless.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mutation;

/// Abstraction over the host page consumed by the core.
///
/// Implementations must be cheap to query; the detector reads the three
/// signal getters on every mutation notification and on a periodic tick.
/// Dropping the receiver returned by [`subscribe_mutations`] unsubscribes.
///
/// [`subscribe_mutations`]: UiAdapter::subscribe_mutations
#[async_trait]
pub trait UiAdapter: Send + Sync {
    /// Whether the prompt input surface accepts text.
    async fn is_input_enabled(&self) -> Result<bool, AdapterError>;

    /// Whether the submit control is clickable.
    async fn is_submit_enabled(&self) -> Result<bool, AdapterError>;

    /// Whether the page shows a busy/loading indicator.
    async fn is_busy_indicator_present(&self) -> Result<bool, AdapterError>;

    /// Clear the input surface and set it to `text`.
    async fn set_input_text(&self, text: &str) -> Result<(), AdapterError>;

    /// Trigger submission, equivalent to the user pressing send.
    async fn trigger_submit(&self) -> Result<(), AdapterError>;

    /// List every artifact currently present on the page, pre-existing
    /// content included. Callers subtract their baseline set.
    async fn list_artifacts(&self) -> Result<Vec<ArtifactRef>, AdapterError>;

    /// Subscribe to change notifications for the observed page region.
    fn subscribe_mutations(&self) -> broadcast::Receiver<Mutation>;
}
