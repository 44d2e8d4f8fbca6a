//! Web stream server
//!
//! Owns both broadcasters and the tap manager, serves the WebSocket and
//! control routes, and is the entry point for completed-segment and source
//! hot-plug notifications from the rest of the system.

use axum::{routing::get, Router};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use super::{handlers, websocket};
use crate::audio::AudioSegment;
use crate::broadcast::{AudioBroadcaster, TapLifecycleManager, WaveformBroadcaster};
use crate::channels::ChannelManager;
use crate::config::{AppConfig, ServerConfig};
use crate::error::Result;
use crate::source::SampleSource;

const SOCKET_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// State shared with every request handler
pub struct AppState {
    pub audio: AudioBroadcaster,
    pub waveform: Arc<WaveformBroadcaster>,
    pub taps: Arc<TapLifecycleManager>,
    pub channels: Arc<ChannelManager>,
    pub config: ServerConfig,
    started: Mutex<Instant>,
    running: AtomicBool,
    /// Flipped to true on stop; every open socket holds a receiver
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(config: &AppConfig, channels: Arc<ChannelManager>) -> Self {
        let waveform = Arc::new(WaveformBroadcaster::new(config.waveform.clone()));
        Self {
            audio: AudioBroadcaster::new(),
            taps: Arc::new(TapLifecycleManager::new(waveform.clone())),
            waveform,
            channels,
            config: config.server.clone(),
            started: Mutex::new(Instant::now()),
            running: AtomicBool::new(false),
            shutdown: watch::Sender::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Time since the server last started
    pub fn uptime(&self) -> Duration {
        self.started.lock().elapsed()
    }

    /// Watch that turns true when the server stops
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/audio", get(websocket::audio_ws_handler))
        .route("/waveform", get(websocket::waveform_ws_handler))
        .route(
            "/api/channels",
            get(handlers::get_channels).post(handlers::post_channels),
        )
        .route("/api/status", get(handlers::get_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct WebStreamServer {
    state: Arc<AppState>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    serve_handle: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl WebStreamServer {
    pub fn new(config: &AppConfig, channels: Arc<ChannelManager>) -> Self {
        Self {
            state: Arc::new(AppState::new(config, channels)),
            shutdown_tx: Mutex::new(None),
            serve_handle: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Address actually bound, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Bind and serve in the background, then attach taps to every ready
    /// source.
    pub async fn start(&self, sources: &[&dyn SampleSource]) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr().filter(|_| self.is_running()) {
            tracing::warn!("Web stream server is already running");
            return Ok(addr);
        }

        let config = &self.state.config;
        let listener =
            tokio::net::TcpListener::bind((config.bind_address.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;
        self.state.shutdown.send_replace(false);
        *self.state.started.lock() = Instant::now();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Web server error: {}", e);
            }
        });

        *self.shutdown_tx.lock() = Some(shutdown_tx);
        *self.serve_handle.lock() = Some(handle);
        *self.local_addr.lock() = Some(addr);
        self.state.running.store(true, Ordering::SeqCst);

        tracing::info!("Web stream server started on {}", addr);
        tracing::info!("Access the UI at: http://localhost:{}", addr.port());

        self.state.taps.attach_all(sources.iter().copied());
        Ok(addr)
    }

    pub async fn stop(&self) {
        if !self.is_running() {
            return;
        }
        self.state.running.store(false, Ordering::SeqCst);
        // Upgraded sockets are not tracked by graceful shutdown; close them directly
        self.state.shutdown.send_replace(true);

        let shutdown_tx = self.shutdown_tx.lock().take();
        if let Some(tx) = shutdown_tx {
            let _ = tx.send(());
        }
        let handle = self.serve_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        if tokio::time::timeout(SOCKET_DRAIN_TIMEOUT, self.state.shutdown.closed())
            .await
            .is_err()
        {
            tracing::warn!(
                sockets = self.state.shutdown.receiver_count(),
                "WebSocket connections still open after shutdown"
            );
        }
        self.state.taps.detach_all();
        tracing::info!("Web stream server stopped");
    }

    /// Hand over a segment from the decode pipeline; it is broadcast once
    /// complete. Ignored while the server is stopped.
    pub fn receive(&self, segment: &Arc<AudioSegment>) {
        if self.is_running() {
            self.state.audio.watch(segment);
        }
    }

    /// Source enabled / discovered
    pub fn attach_source(&self, source: &dyn SampleSource) -> bool {
        match source.buffer_stream() {
            Some(stream) => self.state.taps.attach(source.id(), stream),
            None => {
                tracing::warn!(
                    source = %source.id(),
                    "Cannot attach waveform tap - source not producing"
                );
                false
            }
        }
    }

    /// Source disabled / removed
    pub fn detach_source(&self, source_id: &str) -> bool {
        self.state.taps.detach(source_id)
    }
}
