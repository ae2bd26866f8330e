use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use promptpilot_detector::DetectorConfig;
use promptpilot_protocols::{AdapterError, Mutation};

use super::*;

/// Scripted host page. In auto mode a triggered submission goes busy, then
/// after `auto_delay` produces an artifact `gen-<n>` and returns to idle.
struct FakePage {
    core: Arc<PageCore>,
}

struct PageCore {
    inner: StdMutex<PageInner>,
    mutation_tx: broadcast::Sender<Mutation>,
}

struct PageInner {
    input_enabled: bool,
    submit_enabled: bool,
    busy: bool,
    artifacts: Vec<ArtifactRef>,
    /// Recorded adapter mutations, e.g. "set:a red circle" / "submit".
    log: Vec<String>,
    auto_delay: Option<Duration>,
    generated: usize,
}

impl FakePage {
    fn idle() -> Arc<Self> {
        Self::build(true, None)
    }

    fn busy() -> Arc<Self> {
        Self::build(false, None)
    }

    fn auto(delay: Duration) -> Arc<Self> {
        Self::build(true, Some(delay))
    }

    fn build(idle: bool, auto_delay: Option<Duration>) -> Arc<Self> {
        let (mutation_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            core: Arc::new(PageCore {
                inner: StdMutex::new(PageInner {
                    input_enabled: idle,
                    submit_enabled: idle,
                    busy: !idle,
                    artifacts: Vec::new(),
                    log: Vec::new(),
                    auto_delay,
                    generated: 0,
                }),
                mutation_tx,
            }),
        })
    }

    fn go_busy(&self) {
        self.core.set_state(false);
    }

    fn add_artifact(&self, id: &str) {
        self.core.add_artifact(id);
    }

    fn log(&self) -> Vec<String> {
        self.core.inner.lock().unwrap().log.clone()
    }
}

impl PageCore {
    fn set_state(&self, idle: bool) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.input_enabled = idle;
            inner.submit_enabled = idle;
            inner.busy = !idle;
        }
        let _ = self.mutation_tx.send(Mutation);
    }

    fn add_artifact(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .artifacts
            .push(ArtifactRef::new(id));
        let _ = self.mutation_tx.send(Mutation);
    }
}

#[async_trait]
impl UiAdapter for FakePage {
    async fn is_input_enabled(&self) -> Result<bool, AdapterError> {
        Ok(self.core.inner.lock().unwrap().input_enabled)
    }

    async fn is_submit_enabled(&self) -> Result<bool, AdapterError> {
        Ok(self.core.inner.lock().unwrap().submit_enabled)
    }

    async fn is_busy_indicator_present(&self) -> Result<bool, AdapterError> {
        Ok(self.core.inner.lock().unwrap().busy)
    }

    async fn set_input_text(&self, text: &str) -> Result<(), AdapterError> {
        self.core.inner.lock().unwrap().log.push(format!("set:{}", text));
        Ok(())
    }

    async fn trigger_submit(&self) -> Result<(), AdapterError> {
        let auto = {
            let mut inner = self.core.inner.lock().unwrap();
            inner.log.push("submit".to_string());
            inner.auto_delay
        };
        if let Some(delay) = auto {
            let core = self.core.clone();
            tokio::spawn(async move {
                core.set_state(false);
                sleep(delay).await;
                let id = {
                    let mut inner = core.inner.lock().unwrap();
                    inner.generated += 1;
                    format!("gen-{}", inner.generated)
                };
                core.add_artifact(&id);
                core.set_state(true);
            });
        }
        Ok(())
    }

    async fn list_artifacts(&self) -> Result<Vec<ArtifactRef>, AdapterError> {
        Ok(self.core.inner.lock().unwrap().artifacts.clone())
    }

    fn subscribe_mutations(&self) -> broadcast::Receiver<Mutation> {
        self.core.mutation_tx.subscribe()
    }
}

fn fast_executor_config() -> ExecutorConfig {
    ExecutorConfig {
        idle_wait_timeout_ms: 2_000,
        submit_grace_ms: 2_000,
        artifact_timeout_ms: 3_000,
        artifact_poll_ms: 25,
        retention_ms: 60_000,
    }
}

fn fast_detector_config() -> DetectorConfig {
    DetectorConfig {
        debounce_ms: 30,
        fallback_tick_ms: 20,
    }
}

struct Rig {
    page: Arc<FakePage>,
    detector: Arc<UiStateDetector>,
    executor: Arc<PromptExecutor>,
}

async fn rig(page: Arc<FakePage>, config: ExecutorConfig) -> Rig {
    let detector = Arc::new(UiStateDetector::start(
        page.clone(),
        fast_detector_config(),
    ));
    let executor = Arc::new(PromptExecutor::new(
        page.clone(),
        detector.clone(),
        config,
    ));
    Rig {
        page,
        detector,
        executor,
    }
}

#[tokio::test]
async fn test_happy_path_produces_new_artifact() {
    let page = FakePage::auto(Duration::from_millis(150));
    page.add_artifact("old-1");
    let rig = rig(page, fast_executor_config()).await;

    let outcome = rig
        .executor
        .submit("c1", "a red circle", CancellationToken::new())
        .await
        .expect("submission should succeed");

    assert_eq!(outcome.artifact.id, "gen-1");
    assert_ne!(outcome.artifact.id, "old-1");
    assert_eq!(rig.page.log(), vec!["set:a red circle", "submit"]);

    let request = rig.executor.registry().get("c1").unwrap();
    assert_eq!(request.status, RequestStatus::Completed);
    assert!(request.submitted_at.is_some());

    rig.detector.teardown().await;
}

#[tokio::test]
async fn test_pre_existing_artifacts_are_never_reported() {
    let page = FakePage::auto(Duration::from_millis(100));
    page.add_artifact("old-1");
    page.add_artifact("old-2");
    let rig = rig(page, fast_executor_config()).await;

    let first = rig
        .executor
        .submit("c1", "p1", CancellationToken::new())
        .await
        .unwrap();
    assert!(!first.artifact.id.starts_with("old-"));

    // A second request's baseline includes the first result.
    let second = rig
        .executor
        .submit("c2", "p2", CancellationToken::new())
        .await
        .unwrap();
    assert_ne!(second.artifact.id, first.artifact.id);
    assert!(!second.artifact.id.starts_with("old-"));

    rig.detector.teardown().await;
}

#[tokio::test]
async fn test_busy_ui_blocks_submission_until_timeout() {
    let page = FakePage::busy();
    let config = ExecutorConfig {
        idle_wait_timeout_ms: 300,
        ..fast_executor_config()
    };
    let rig = rig(page, config).await;

    let err = rig
        .executor
        .submit("c1", "p", CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::UiBusyTimeout(300)));

    // The idle gate held: the page was never touched.
    assert!(rig.page.log().is_empty(), "no DOM calls while busy");
    let request = rig.executor.registry().get("c1").unwrap();
    assert_eq!(request.status, RequestStatus::TimedOut);
    assert_eq!(request.reason.as_deref(), Some("UiBusyTimeout"));

    rig.detector.teardown().await;
}

#[tokio::test]
async fn test_missing_busy_transition_is_submission_not_detected() {
    // No auto mode: the page ignores the submission and stays idle.
    let page = FakePage::idle();
    let config = ExecutorConfig {
        submit_grace_ms: 300,
        ..fast_executor_config()
    };
    let rig = rig(page.clone(), config).await;

    let err = rig
        .executor
        .submit("c1", "p", CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::SubmissionNotDetected));

    let request = rig.executor.registry().get("c1").unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert_eq!(request.reason.as_deref(), Some("SubmissionNotDetected"));

    // The artifact wait was never entered; adding one now changes nothing.
    page.add_artifact("late-1");
    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        rig.executor.registry().get("c1").unwrap().status,
        RequestStatus::Failed
    );

    rig.detector.teardown().await;
}

#[tokio::test]
async fn test_no_artifact_within_timeout() {
    let page = FakePage::idle();
    let config = ExecutorConfig {
        artifact_timeout_ms: 300,
        ..fast_executor_config()
    };
    let rig = rig(page.clone(), config).await;

    let handle = {
        let executor = rig.executor.clone();
        tokio::spawn(async move { executor.submit("c1", "p", CancellationToken::new()).await })
    };

    // React to the submission by going busy, but never produce an artifact.
    wait_for_log_entry(&rig.page, "submit").await;
    rig.page.go_busy();

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, ExecutorError::ArtifactTimeout(300)));
    assert_eq!(
        rig.executor.registry().get("c1").unwrap().status,
        RequestStatus::TimedOut
    );

    rig.detector.teardown().await;
}

#[tokio::test]
async fn test_concurrent_submissions_do_not_interleave() {
    let page = FakePage::auto(Duration::from_millis(120));
    let rig = rig(page, fast_executor_config()).await;

    let first = {
        let executor = rig.executor.clone();
        tokio::spawn(async move { executor.submit("c1", "one", CancellationToken::new()).await })
    };
    let second = {
        let executor = rig.executor.clone();
        tokio::spawn(async move { executor.submit("c2", "two", CancellationToken::new()).await })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // Each prompt's set/submit pair is adjacent: the second request only
    // started after the first reached a terminal status.
    let log = rig.page.log();
    assert_eq!(log.len(), 4);
    for pair in log.chunks(2) {
        assert!(pair[0].starts_with("set:"), "unexpected order: {:?}", log);
        assert_eq!(pair[1], "submit", "unexpected order: {:?}", log);
    }
    let prompts: Vec<&String> = log.iter().filter(|e| e.starts_with("set:")).collect();
    assert_eq!(prompts.len(), 2);
    assert_ne!(prompts[0], prompts[1]);

    rig.detector.teardown().await;
}

#[tokio::test]
async fn test_cancel_aborts_wait_and_releases_lock() {
    let page = FakePage::busy();
    let config = ExecutorConfig {
        idle_wait_timeout_ms: 10_000,
        ..fast_executor_config()
    };
    let rig = rig(page.clone(), config).await;

    // The first request holds the lock while it waits for idle; the second
    // queues behind it.
    let holder = {
        let executor = rig.executor.clone();
        tokio::spawn(async move { executor.submit("c1", "one", CancellationToken::new()).await })
    };
    let cancel = CancellationToken::new();
    let blocked = {
        let executor = rig.executor.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { executor.submit("c2", "queued", cancel).await })
    };

    sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let err = blocked.await.unwrap().unwrap_err();
    assert!(matches!(err, ExecutorError::Cancelled));
    assert_eq!(
        rig.executor.registry().get("c2").unwrap().status,
        RequestStatus::Failed
    );

    // The holder is still waiting on the busy page; stop it.
    holder.abort();
    rig.detector.teardown().await;
}

async fn wait_for_log_entry(page: &Arc<FakePage>, entry: &str) {
    for _ in 0..200 {
        if page.log().iter().any(|e| e == entry) {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("log entry {:?} never appeared", entry);
}
