//! WebSocket viewers
//!
//! Every upgraded connection becomes a [`WsSubscriber`] in exactly one
//! registry. Broadcasters push into a bounded per-connection queue; a writer
//! task drains it into the socket, so a slow viewer fills its own queue and
//! starts failing sends instead of stalling the producer.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

use crate::broadcast::{ClientRegistry, Subscriber, SubscriberId};
use crate::config::ServerConfig;
use crate::error::SendError;
use crate::ui::server::AppState;

/// Subscriber backed by a WebSocket writer task
pub struct WsSubscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Message>,
    depth: usize,
    open: AtomicBool,
}

impl WsSubscriber {
    pub fn new(tx: mpsc::Sender<Message>, depth: usize) -> Self {
        Self {
            id: SubscriberId::new(),
            tx,
            depth,
            open: AtomicBool::new(true),
        }
    }

    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn enqueue(&self, message: Message) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SendError::QueueFull(self.depth)),
            Err(TrySendError::Closed(_)) => {
                self.mark_closed();
                Err(SendError::Closed)
            }
        }
    }
}

impl Subscriber for WsSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn send_text(&self, frame: &str) -> Result<(), SendError> {
        self.enqueue(Message::Text(frame.to_string()))
    }

    fn send_binary(&self, frame: &Bytes) -> Result<(), SendError> {
        self.enqueue(Message::Binary(frame.to_vec()))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.tx.is_closed()
    }
}

/// Route: `GET /audio`
pub async fn audio_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let registry = state.audio.registry().clone();
    upgrade(ws, registry, &state)
}

/// Route: `GET /waveform`
pub async fn waveform_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let registry = state.waveform.registry().clone();
    upgrade(ws, registry, &state)
}

fn upgrade(ws: WebSocketUpgrade, registry: Arc<ClientRegistry>, state: &AppState) -> Response {
    let config = state.config.clone();
    let shutdown = state.shutdown_signal();
    ws.max_message_size(config.max_message_size)
        .max_frame_size(config.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, registry, config, shutdown))
}

/// Serve one connection until it closes, errors, goes idle, or the server
/// shuts down.
///
/// `shutdown` is held until the subscriber has left `registry`, so the
/// sender side can tell when every connection is gone.
pub async fn handle_socket(
    socket: WebSocket,
    registry: Arc<ClientRegistry>,
    config: ServerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(config.client_queue_depth);

    let subscriber = Arc::new(WsSubscriber::new(tx, config.client_queue_depth));
    let id = subscriber.id();
    let label = registry.label();
    registry.add(subscriber.clone());

    let idle = Duration::from_secs(config.idle_timeout_secs.max(1));

    // Pings keep passive viewers from tripping the inbound idle timeout
    let mut send_task = tokio::spawn(async move {
        let mut keepalive = tokio::time::interval(idle / 3);
        keepalive.tick().await;
        loop {
            let message = tokio::select! {
                queued = rx.recv() => match queued {
                    Some(message) => message,
                    None => break,
                },
                _ = keepalive.tick() => Message::Ping(Vec::new()),
            };
            if let Err(e) = sink.send(message).await {
                tracing::debug!(
                    registry = label,
                    subscriber = %id,
                    "Send error, closing connection: {}",
                    e
                );
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        loop {
            match tokio::time::timeout(idle, stream.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    tracing::debug!(
                        registry = label,
                        subscriber = %id,
                        "Received text message: {}",
                        text
                    );
                }
                Ok(Some(Ok(Message::Close(frame)))) => {
                    tracing::debug!(
                        registry = label,
                        subscriber = %id,
                        ?frame,
                        "Client closed connection"
                    );
                    break;
                }
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(e))) => {
                    tracing::warn!(registry = label, subscriber = %id, "WebSocket error: {}", e);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::info!(registry = label, subscriber = %id, "Connection idle, closing");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        _ = stopped(&mut shutdown) => {
            tracing::debug!(
                registry = label,
                subscriber = %id,
                "Server stopping, closing connection"
            );
            send_task.abort();
            recv_task.abort();
        }
    }

    subscriber.mark_closed();
    registry.remove(id);
    drop(shutdown);
}

/// Resolves once the server stops, or its state is gone
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stopping = *shutdown.borrow_and_update();
        if stopping || shutdown.changed().await.is_err() {
            return;
        }
    }
}
