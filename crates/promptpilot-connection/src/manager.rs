//! Connection manager.
//!
//! One supervisor task owns the socket for the manager's whole life. It
//! connects, runs the frame loop, and on unexpected loss sleeps out the
//! backoff and tries again, forever, until `close()` cancels it. No other
//! component ever touches the socket.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use promptpilot_protocols::Envelope;

use crate::backoff::Backoff;
use crate::config::ConnectionConfig;
use crate::error::ConnectionError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle state, owned exclusively by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Transient state while an intentional `close()` is in progress.
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// Capacity of the broadcast channel for decoded inbound envelopes.
const MESSAGE_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the per-connection outbound frame queue. Small on purpose:
/// the manager does not buffer indefinitely while disconnected.
const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

/// Manages one logical WebSocket connection to the orchestration server.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    message_tx: broadcast::Sender<Envelope>,
    /// Sender into the live connection's outbound queue; `None` whenever
    /// there is no established connection.
    outbound: Arc<RwLock<Option<mpsc::Sender<Message>>>>,
    shutdown: CancellationToken,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager. No connection is attempted until [`connect`].
    ///
    /// [`connect`]: ConnectionManager::connect
    pub fn new(config: ConnectionConfig) -> Self {
        let (message_tx, _) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);
        Self {
            config,
            state_tx: Arc::new(watch::Sender::new(ConnectionState::Disconnected)),
            message_tx,
            outbound: Arc::new(RwLock::new(None)),
            shutdown: CancellationToken::new(),
            supervisor: Mutex::new(None),
        }
    }

    /// Start the supervisor task. Idempotent; a second call is a no-op.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        if self.shutdown.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        self.config.validate()?;

        let mut supervisor = self.supervisor.lock().await;
        if supervisor.is_some() {
            warn!("connect() called twice; supervisor already running");
            return Ok(());
        }

        let config = self.config.clone();
        let state_tx = self.state_tx.clone();
        let message_tx = self.message_tx.clone();
        let outbound = self.outbound.clone();
        let shutdown = self.shutdown.clone();
        *supervisor = Some(tokio::spawn(async move {
            run_supervisor(config, state_tx, message_tx, outbound, shutdown).await;
        }));
        Ok(())
    }

    /// Send an envelope over the live connection.
    ///
    /// Fails with [`ConnectionError::NotConnected`] unless the state is
    /// `Connected`; callers decide whether to queue or drop.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), ConnectionError> {
        if self.shutdown.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        let tx = self
            .outbound
            .read()
            .clone()
            .ok_or(ConnectionError::NotConnected)?;
        let encoded = envelope.encode()?;
        tx.send(Message::Text(encoded.into()))
            .await
            .map_err(|e| ConnectionError::SendFailed(e.to_string()))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to lifecycle transitions.
    pub fn on_state_change(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to decoded inbound envelopes.
    ///
    /// Frames that fail to decode are logged and dropped; they never appear
    /// here and never tear the connection down.
    pub fn on_message(&self) -> broadcast::Receiver<Envelope> {
        self.message_tx.subscribe()
    }

    /// Close the connection for good. Terminal and idempotent; never
    /// triggers a reconnect.
    pub async fn close(&self) {
        if !self.shutdown.is_cancelled() {
            self.state_tx.send_replace(ConnectionState::Closing);
            self.shutdown.cancel();
        }
        if let Some(handle) = self.supervisor.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Supervisor task panicked during close: {}", e);
            }
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }
}

/// Connect-run-backoff loop. Exits only on shutdown.
async fn run_supervisor(
    config: ConnectionConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    message_tx: broadcast::Sender<Envelope>,
    outbound: Arc<RwLock<Option<mpsc::Sender<Message>>>>,
    shutdown: CancellationToken,
) {
    let mut backoff = Backoff::new(config.base_delay(), config.max_delay());

    loop {
        if shutdown.is_cancelled() {
            break;
        }
        state_tx.send_replace(ConnectionState::Connecting);
        debug!(url = %config.server_url, "Connecting");

        let attempt = tokio::select! {
            _ = shutdown.cancelled() => break,
            res = tokio_tungstenite::connect_async(&config.server_url) => res,
        };

        match attempt {
            Ok((stream, _response)) => {
                info!(url = %config.server_url, "Connected to orchestration server");
                backoff.reset();

                // Install the outbound queue before announcing Connected so a
                // caller that reacts to the state change can send immediately.
                let (out_tx, out_rx) = mpsc::channel::<Message>(OUTBOUND_CHANNEL_CAPACITY);
                *outbound.write() = Some(out_tx);
                state_tx.send_replace(ConnectionState::Connected);

                let intentional =
                    run_connection(stream, out_rx, &config, &message_tx, &shutdown).await;
                outbound.write().take();
                if intentional {
                    break;
                }
            }
            Err(e) => {
                warn!(url = %config.server_url, "Connection attempt failed: {}", e);
            }
        }

        state_tx.send_replace(ConnectionState::Disconnected);
        if shutdown.is_cancelled() {
            break;
        }

        let delay = backoff.next_delay();
        info!(attempt = backoff.attempts(), "Reconnecting in {:?}", delay);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    state_tx.send_replace(ConnectionState::Disconnected);
}

/// Drive one established connection until it dies or shutdown is requested.
///
/// Returns `true` when the exit was an intentional shutdown, `false` when
/// the connection was lost and the supervisor should reconnect.
async fn run_connection(
    stream: WsStream,
    mut out_rx: mpsc::Receiver<Message>,
    config: &ConnectionConfig,
    message_tx: &broadcast::Sender<Envelope>,
    shutdown: &CancellationToken,
) -> bool {
    let (mut ws_tx, mut ws_rx) = stream.split();

    let mut heartbeat = tokio::time::interval_at(
        Instant::now() + config.heartbeat_interval(),
        config.heartbeat_interval(),
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Any received frame counts as traffic; pings we send do not, so a peer
    // that stops answering is still declared dead.
    let mut last_traffic = Instant::now();

    loop {
        let dead_deadline = last_traffic + config.dead_after();
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                return true;
            }

            Some(msg) = out_rx.recv() => {
                if let Err(e) = ws_tx.send(msg).await {
                    warn!("Outbound send failed: {}", e);
                    return false;
                }
            }

            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        last_traffic = Instant::now();
                        match Envelope::decode(text.as_str()) {
                            Ok(envelope) => {
                                let _ = message_tx.send(envelope);
                            }
                            Err(e) => {
                                warn!("Dropping undecodable frame: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        last_traffic = Instant::now();
                    }
                    Some(Ok(Message::Binary(_))) => {
                        last_traffic = Instant::now();
                        debug!("Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Server closed the connection");
                        return false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        return false;
                    }
                    None => {
                        info!("Connection stream ended");
                        return false;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if let Err(e) = ws_tx.send(Message::Ping(Bytes::new())).await {
                    warn!("Heartbeat send failed: {}", e);
                    return false;
                }
            }

            _ = tokio::time::sleep_until(dead_deadline) => {
                warn!(
                    "No traffic for {:?}, declaring connection dead",
                    config.dead_after()
                );
                return false;
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
