//! Debounced UI state detection task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use promptpilot_protocols::UiAdapter;

use crate::config::DetectorConfig;
use crate::state::{combine_signals, UiState};

/// Observes the host page through a [`UiAdapter`] and maintains the
/// busy/idle/unknown state machine.
///
/// The detector owns a background task and is the single writer of the
/// state; everyone else reads via [`current_state`] or [`on_change`].
///
/// [`current_state`]: UiStateDetector::current_state
/// [`on_change`]: UiStateDetector::on_change
pub struct UiStateDetector {
    state_tx: Arc<watch::Sender<UiState>>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl UiStateDetector {
    /// Start observing. The first committed state lands after one debounce
    /// window at the earliest.
    pub fn start(adapter: Arc<dyn UiAdapter>, config: DetectorConfig) -> Self {
        let state_tx = Arc::new(watch::Sender::new(UiState::Unknown));
        let shutdown = CancellationToken::new();

        let task = {
            let state_tx = state_tx.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                run_detector(adapter, config, state_tx, shutdown).await;
            })
        };

        Self {
            state_tx,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Last committed state.
    pub fn current_state(&self) -> UiState {
        *self.state_tx.borrow()
    }

    /// Subscribe to committed state transitions.
    pub fn on_change(&self) -> watch::Receiver<UiState> {
        self.state_tx.subscribe()
    }

    /// Stop observing and reset the state to `Unknown`.
    ///
    /// Idempotent; safe to call from any exit path. The mutation
    /// subscription is released when the task finishes.
    pub async fn teardown(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Detector task panicked during teardown: {}", e);
            }
        }
        self.state_tx.send_replace(UiState::Unknown);
    }
}

async fn run_detector(
    adapter: Arc<dyn UiAdapter>,
    config: DetectorConfig,
    state_tx: Arc<watch::Sender<UiState>>,
    shutdown: CancellationToken,
) {
    let mut mutations = adapter.subscribe_mutations();
    let mut mutations_open = true;

    // First tick fires immediately, giving the initial observation.
    let mut tick = tokio::time::interval(config.fallback_tick());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Candidate state waiting out its debounce window, with the moment it
    // was first computed.
    let mut pending: Option<(UiState, Instant)> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            result = mutations.recv(), if mutations_open => {
                match result {
                    Ok(_) => observe(&adapter, &state_tx, &mut pending).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Coalesced notifications are fine, state is
                        // recomputed from the signals anyway.
                        debug!(skipped, "Mutation notifications lagged");
                        observe(&adapter, &state_tx, &mut pending).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Mutation stream closed; relying on fallback tick only");
                        mutations_open = false;
                    }
                }
            }

            _ = tick.tick() => observe(&adapter, &state_tx, &mut pending).await,

            _ = debounce_elapsed(&pending, config.debounce()) => {
                if let Some((candidate, _)) = pending.take() {
                    debug!(state = %candidate, "Committing UI state");
                    state_tx.send_replace(candidate);
                }
            }
        }
    }
}

/// Resolve once the pending candidate has survived its debounce window;
/// never resolves while there is no candidate.
async fn debounce_elapsed(pending: &Option<(UiState, Instant)>, debounce: Duration) {
    match pending {
        Some((_, since)) => tokio::time::sleep_until(*since + debounce).await,
        None => std::future::pending().await,
    }
}

/// Recompute the candidate state from the adapter's signals.
async fn observe(
    adapter: &Arc<dyn UiAdapter>,
    state_tx: &watch::Sender<UiState>,
    pending: &mut Option<(UiState, Instant)>,
) {
    let candidate = read_state(adapter).await;
    let current = *state_tx.borrow();

    if candidate == current {
        // A transient flicker that returned to the committed state before
        // its debounce elapsed is discarded entirely.
        *pending = None;
    } else {
        match pending {
            Some((p, _)) if *p == candidate => {}
            _ => *pending = Some((candidate, Instant::now())),
        }
    }
}

/// Read the three signals and combine them. Any read failure resolves to
/// `Busy`: a page we cannot interrogate is not a page to type into.
async fn read_state(adapter: &Arc<dyn UiAdapter>) -> UiState {
    let input_enabled = match adapter.is_input_enabled().await {
        Ok(v) => v,
        Err(e) => {
            debug!("Input signal read failed: {}", e);
            return UiState::Busy;
        }
    };
    let submit_enabled = match adapter.is_submit_enabled().await {
        Ok(v) => v,
        Err(e) => {
            debug!("Submit signal read failed: {}", e);
            return UiState::Busy;
        }
    };
    let busy_indicator = match adapter.is_busy_indicator_present().await {
        Ok(v) => v,
        Err(e) => {
            debug!("Busy indicator read failed: {}", e);
            return UiState::Busy;
        }
    };
    combine_signals(input_enabled, submit_enabled, busy_indicator)
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
