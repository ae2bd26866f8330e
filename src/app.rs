//! Application wiring.
//!
//! Builds the subsystem stack (connection, dispatch, detection, execution)
//! from one [`AppConfig`] and runs the inbound message loop.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use promptpilot_connection::{ConnectionError, ConnectionManager};
use promptpilot_detector::UiStateDetector;
use promptpilot_dispatch::DispatchRouter;
use promptpilot_executor::PromptExecutor;
use promptpilot_protocols::{event_types, UiAdapter};

use crate::config::AppConfig;
use crate::handlers::{ImageRequestHandler, StatusQueryHandler};

/// The assembled core.
///
/// Inbound envelopes are dispatched sequentially: a long-running image
/// request blocks later messages until it finishes. That is deliberate,
/// the page has a single input surface anyway, and it means a redelivered
/// request can never race its own first delivery past the dedup cache.
pub(crate) struct App {
    connection: Arc<ConnectionManager>,
    detector: Arc<UiStateDetector>,
    router: Arc<DispatchRouter>,
    shutdown: CancellationToken,
    inbound: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    pub fn new(config: &AppConfig, adapter: Arc<dyn UiAdapter>) -> Self {
        let connection = Arc::new(ConnectionManager::new(config.connection.clone()));
        let detector = Arc::new(UiStateDetector::start(
            adapter.clone(),
            config.detector.clone(),
        ));
        let executor = Arc::new(PromptExecutor::new(
            adapter,
            detector.clone(),
            config.executor.clone(),
        ));
        let shutdown = CancellationToken::new();

        let router = Arc::new(DispatchRouter::new(config.dispatch.clone()));
        router.register(
            event_types::IMAGE_REQUEST_RECEIVED,
            Arc::new(ImageRequestHandler::new(
                executor.clone(),
                shutdown.clone(),
            )),
        );
        router.register(
            event_types::STATUS_QUERY,
            Arc::new(StatusQueryHandler::new(
                connection.clone(),
                detector.clone(),
                executor.registry(),
            )),
        );

        Self {
            connection,
            detector,
            router,
            shutdown,
            inbound: Mutex::new(None),
        }
    }

    pub fn connection(&self) -> Arc<ConnectionManager> {
        self.connection.clone()
    }

    /// Connect to the orchestration server and start dispatching inbound
    /// envelopes.
    pub async fn start(&self) -> Result<(), ConnectionError> {
        self.connection.connect().await?;

        let connection = self.connection.clone();
        let router = self.router.clone();
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            run_inbound(connection, router, shutdown).await;
        });
        *self.inbound.lock().await = Some(handle);
        info!("Core started");
        Ok(())
    }

    /// Stop everything: abort in-flight requests, stop the detector, close
    /// the connection. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.inbound.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Inbound loop panicked during shutdown: {}", e);
            }
        }
        self.detector.teardown().await;
        self.connection.close().await;
        info!("Core stopped");
    }
}

async fn run_inbound(
    connection: Arc<ConnectionManager>,
    router: Arc<DispatchRouter>,
    shutdown: CancellationToken,
) {
    let mut messages = connection.on_message();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            result = messages.recv() => match result {
                Ok(envelope) => {
                    if let Some(reply) = router.handle(envelope).await {
                        // A reply we cannot send right now is dropped; the
                        // dedup cache replays it when the server redelivers
                        // after reconnecting.
                        if let Err(e) = connection.send(&reply).await {
                            warn!("Dropping reply, connection unavailable: {}", e);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Inbound envelopes lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
