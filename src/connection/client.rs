//! The single persistent bidirectional channel to the backend.
//!
//! One `SessionConnection` exists per session-manager lifetime. It is
//! authenticated implicitly by the ambient session cookie, dispatches
//! inbound events in arrival order through one channel, and applies a
//! bounded reconnection policy on unexpected drops.

use futures::{SinkExt, StreamExt};
use reqwest::header::HeaderValue;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use super::messages::{ClientEvent, ServerEvent};
use crate::config::ConnectionConfig;
use crate::error::SessionError;

/// Inbound events buffered between the socket task and the dispatcher
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    /// Ambient session cookie attached to the upgrade request
    pub cookie: Option<HeaderValue>,
    pub reconnect: ConnectionConfig,
}

/// Why the active socket went away
enum Disconnect {
    /// Client asked to close; no auto-retry
    Client,
    /// Server closed the socket; reconnect immediately
    Server,
    /// Network-level failure; reconnect after the fixed delay
    Transport,
}

pub struct SessionConnection {
    outbound_tx: mpsc::Sender<ClientEvent>,
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
    max_attempts: u32,
}

impl SessionConnection {
    /// Open the persistent connection.
    ///
    /// The caller must have verified session identity first; this
    /// constructor only wires the socket task. Connect failures are
    /// reported through the state channel, never returned.
    pub fn connect(opts: ConnectOptions) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let max_attempts = opts.reconnect.reconnect_attempts;
        let task = tokio::spawn(run(opts, outbound_rx, shutdown_rx, event_tx, state_tx));

        (
            Self {
                outbound_tx,
                shutdown_tx,
                state_rx,
                task,
                max_attempts,
            },
            event_rx,
        )
    }

    /// Sender for outbound events (the state machine holds a clone).
    pub fn sender(&self) -> mpsc::Sender<ClientEvent> {
        self.outbound_tx.clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch channel for connection-state updates.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub async fn send(&self, event: ClientEvent) -> Result<(), SessionError> {
        self.outbound_tx
            .send(event)
            .await
            .map_err(|_| SessionError::ConnectionLost {
                attempts: self.max_attempts,
            })
    }

    /// Client-initiated teardown; the connection is not retried.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

async fn run(
    opts: ConnectOptions,
    mut outbound_rx: mpsc::Receiver<ClientEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    event_tx: mpsc::Sender<ServerEvent>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let delay = std::time::Duration::from_millis(opts.reconnect.reconnect_delay_ms);
    let max_attempts = opts.reconnect.reconnect_attempts;

    // Consecutive failed connect attempts; resets on every successful
    // connect, so the bound applies per outage.
    let mut attempts: u32 = 0;
    let mut ever_connected = false;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let _ = state_tx.send(if ever_connected {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        });

        match open_socket(&opts).await {
            Ok(ws) => {
                info!("Connected to {}", opts.url);
                attempts = 0;
                ever_connected = true;
                let _ = state_tx.send(ConnectionState::Connected);

                match drive(ws, &mut outbound_rx, &mut shutdown_rx, &event_tx).await {
                    Disconnect::Client => break,
                    Disconnect::Server => {
                        // Server-initiated close: retry without waiting
                        info!("Server closed connection, reconnecting");
                        continue;
                    }
                    Disconnect::Transport => {
                        // The drop itself is not an attempt; only
                        // failed reconnects count against the budget
                        warn!("Connection dropped, retrying in {:?}", delay);
                    }
                }
            }
            Err(e) => {
                warn!("Connect to {} failed: {}", opts.url, e);
                attempts += 1;
                if attempts >= max_attempts {
                    warn!("Giving up after {} reconnect attempts", attempts);
                    break;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    let _ = state_tx.send(ConnectionState::Disconnected);
}

async fn open_socket(
    opts: &ConnectOptions,
) -> anyhow::Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let mut request = opts.url.as_str().into_client_request()?;
    if let Some(cookie) = &opts.cookie {
        request.headers_mut().insert("Cookie", cookie.clone());
    }

    let (ws, _response) = connect_async(request).await?;
    Ok(ws)
}

/// Pump one live socket until it drops or the client shuts down.
async fn drive(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound_rx: &mut mpsc::Receiver<ClientEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
    event_tx: &mpsc::Sender<ServerEvent>,
) -> Disconnect {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return Disconnect::Client;
            }
            outbound = outbound_rx.recv() => match outbound {
                Some(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize outbound event: {}", e);
                            continue;
                        }
                    };

                    if let Err(e) = sink.send(Message::Text(text)).await {
                        warn!("Failed to send event: {}", e);
                        return Disconnect::Transport;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Disconnect::Client;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                // Dispatcher went away; treat as teardown
                                return Disconnect::Client;
                            }
                        }
                        Err(e) => warn!("Ignoring unparseable server event: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) => return Disconnect::Server,
                Some(Ok(_)) => {} // ping/pong/binary frames
                Some(Err(e)) => {
                    warn!("Socket error: {}", e);
                    return Disconnect::Transport;
                }
                None => return Disconnect::Transport,
            }
        }
    }
}
