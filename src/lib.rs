//! # Radio Web Stream
//!
//! Live fan-out of decoded radio audio and raw I/Q waveforms to remote
//! viewers over WebSocket.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │       Decode Pipeline        │        │      Hardware Source(s)      │
//! │   (segment completion)       │        │   (producer thread, hot)     │
//! └──────────────┬───────────────┘        └──────────────┬───────────────┘
//!                │ AudioSegment                          │ NativeBuffer
//!                ▼                                       ▼
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │ AudioBroadcaster             │        │ SampleTap (1 in N buffers)   │
//! │  metadata JSON + PCM16       │        │  bound by TapLifecycleManager│
//! └──────────────┬───────────────┘        └──────────────┬───────────────┘
//!                │                                       ▼
//!                │                        ┌──────────────────────────────┐
//!                │                        │ WaveformBroadcaster          │
//!                │                        │  decimate + I/Q f32 frame    │
//!                │                        └──────────────┬───────────────┘
//!                ▼                                       ▼
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │ ClientRegistry("audio")      │        │ ClientRegistry("waveform")   │
//! │  copy-on-write snapshot      │        │  copy-on-write snapshot      │
//! └──────────────┬───────────────┘        └──────────────┬───────────────┘
//!                ▼                                       ▼
//!         ws://host/audio                         ws://host/waveform
//! ```

pub mod audio;
pub mod broadcast;
pub mod channels;
pub mod codec;
pub mod config;
pub mod error;
pub mod source;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Decoder output sample rate for audio segments
    pub const AUDIO_SAMPLE_RATE: u32 = 8000;

    /// Full-scale multiplier for float to PCM16
    pub const PCM16_SCALE: f32 = 32767.0;

    /// Channel name sent when a segment has none
    pub const UNKNOWN_CHANNEL: &str = "Unknown";

    /// Stride into source I/Q arrays for waveform frames
    pub const DEFAULT_DECIMATION_FACTOR: usize = 100;

    /// Maximum I/Q pairs per waveform frame
    pub const DEFAULT_MAX_SAMPLES_PER_PACKET: usize = 512;

    /// The tap forwards one buffer out of this many
    pub const DEFAULT_SAMPLE_INTERVAL: u32 = 10;

    /// Default HTTP / WebSocket port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// Maximum WebSocket message size
    pub const MAX_MESSAGE_SIZE: usize = 65535;

    /// Idle connection timeout
    pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

    /// Outbound frames queued per client
    pub const DEFAULT_CLIENT_QUEUE_DEPTH: usize = 64;
}
