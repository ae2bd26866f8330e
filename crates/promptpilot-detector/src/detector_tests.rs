use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::time::timeout;

use promptpilot_protocols::{AdapterError, ArtifactRef, Mutation};

use super::*;

const WAIT: Duration = Duration::from_secs(5);

/// Scripted host page: signals flip on demand, with or without a mutation
/// notification.
struct FakeAdapter {
    signals: StdMutex<(bool, bool, bool)>,
    failing: AtomicBool,
    mutation_tx: broadcast::Sender<Mutation>,
}

impl FakeAdapter {
    fn new() -> Arc<Self> {
        let (mutation_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            // input disabled, submit disabled, no busy indicator: busy.
            signals: StdMutex::new((false, false, false)),
            failing: AtomicBool::new(false),
            mutation_tx,
        })
    }

    fn set_signals(&self, input: bool, submit: bool, busy: bool) {
        self.set_signals_silently(input, submit, busy);
        let _ = self.mutation_tx.send(Mutation);
    }

    fn set_signals_silently(&self, input: bool, submit: bool, busy: bool) {
        *self.signals.lock().unwrap() = (input, submit, busy);
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
        let _ = self.mutation_tx.send(Mutation);
    }

    fn read(&self, pick: fn(&(bool, bool, bool)) -> bool) -> Result<bool, AdapterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AdapterError::PageGone);
        }
        Ok(pick(&self.signals.lock().unwrap()))
    }
}

#[async_trait]
impl UiAdapter for FakeAdapter {
    async fn is_input_enabled(&self) -> Result<bool, AdapterError> {
        self.read(|s| s.0)
    }

    async fn is_submit_enabled(&self) -> Result<bool, AdapterError> {
        self.read(|s| s.1)
    }

    async fn is_busy_indicator_present(&self) -> Result<bool, AdapterError> {
        self.read(|s| s.2)
    }

    async fn set_input_text(&self, _text: &str) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn trigger_submit(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn list_artifacts(&self) -> Result<Vec<ArtifactRef>, AdapterError> {
        Ok(Vec::new())
    }

    fn subscribe_mutations(&self) -> broadcast::Receiver<Mutation> {
        self.mutation_tx.subscribe()
    }
}

fn fast_config() -> DetectorConfig {
    DetectorConfig {
        debounce_ms: 40,
        fallback_tick_ms: 25,
    }
}

async fn wait_for_state(rx: &mut watch::Receiver<UiState>, want: UiState) {
    timeout(WAIT, rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for state {}", want))
        .unwrap();
}

#[tokio::test]
async fn test_starts_unknown_then_commits_first_observation() {
    let adapter = FakeAdapter::new();
    adapter.set_signals_silently(true, true, false);

    let detector = UiStateDetector::start(adapter.clone(), fast_config());
    assert_eq!(detector.current_state(), UiState::Unknown);

    let mut rx = detector.on_change();
    wait_for_state(&mut rx, UiState::Idle).await;
    detector.teardown().await;
}

#[tokio::test]
async fn test_busy_indicator_forces_busy() {
    let adapter = FakeAdapter::new();
    adapter.set_signals_silently(true, true, false);
    let detector = UiStateDetector::start(adapter.clone(), fast_config());
    let mut rx = detector.on_change();
    wait_for_state(&mut rx, UiState::Idle).await;

    // Controls stay enabled but the spinner appears: busy wins.
    adapter.set_signals(true, true, true);
    wait_for_state(&mut rx, UiState::Busy).await;
    detector.teardown().await;
}

#[tokio::test]
async fn test_ambiguous_signals_resolve_to_busy() {
    let adapter = FakeAdapter::new();
    adapter.set_signals_silently(true, true, false);
    let detector = UiStateDetector::start(adapter.clone(), fast_config());
    let mut rx = detector.on_change();
    wait_for_state(&mut rx, UiState::Idle).await;

    adapter.set_signals(true, false, false);
    wait_for_state(&mut rx, UiState::Busy).await;
    detector.teardown().await;
}

#[tokio::test]
async fn test_transient_flap_within_debounce_is_discarded() {
    let adapter = FakeAdapter::new();
    adapter.set_signals_silently(true, true, false);
    let config = DetectorConfig {
        debounce_ms: 150,
        fallback_tick_ms: 25,
    };
    let detector = UiStateDetector::start(adapter.clone(), config);
    let mut rx = detector.on_change();
    wait_for_state(&mut rx, UiState::Idle).await;
    let _ = rx.borrow_and_update();

    // Busy for a moment, back to idle well inside the debounce window.
    adapter.set_signals(false, false, true);
    tokio::time::sleep(Duration::from_millis(30)).await;
    adapter.set_signals(true, true, false);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(detector.current_state(), UiState::Idle);
    assert!(!rx.has_changed().unwrap(), "flap must not commit any state");
    detector.teardown().await;
}

#[tokio::test]
async fn test_fallback_tick_catches_missed_notification() {
    let adapter = FakeAdapter::new();
    adapter.set_signals_silently(true, true, false);
    let detector = UiStateDetector::start(adapter.clone(), fast_config());
    let mut rx = detector.on_change();
    wait_for_state(&mut rx, UiState::Idle).await;

    // Signals change but no mutation notification fires.
    adapter.set_signals_silently(false, false, true);
    wait_for_state(&mut rx, UiState::Busy).await;
    detector.teardown().await;
}

#[tokio::test]
async fn test_signal_read_failure_is_conservative_busy() {
    let adapter = FakeAdapter::new();
    adapter.set_signals_silently(true, true, false);
    let detector = UiStateDetector::start(adapter.clone(), fast_config());
    let mut rx = detector.on_change();
    wait_for_state(&mut rx, UiState::Idle).await;

    adapter.set_failing(true);
    wait_for_state(&mut rx, UiState::Busy).await;
    detector.teardown().await;
}

#[tokio::test]
async fn test_teardown_is_idempotent_and_resets_to_unknown() {
    let adapter = FakeAdapter::new();
    adapter.set_signals_silently(true, true, false);
    let detector = UiStateDetector::start(adapter.clone(), fast_config());
    let mut rx = detector.on_change();
    wait_for_state(&mut rx, UiState::Idle).await;

    detector.teardown().await;
    assert_eq!(detector.current_state(), UiState::Unknown);
    detector.teardown().await;
    assert_eq!(detector.current_state(), UiState::Unknown);
}
