//! Application configuration
//!
//! Loaded from TOML. Every field has a default so a partial file (or no file
//! at all) is valid.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub waveform: WaveformConfig,
}

/// HTTP / WebSocket listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Largest inbound WebSocket message accepted, in bytes
    pub max_message_size: usize,
    /// Connections with no inbound traffic for this long are dropped
    pub idle_timeout_secs: u64,
    /// Outbound frames buffered per client before sends start failing
    pub client_queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_HTTP_PORT,
            max_message_size: MAX_MESSAGE_SIZE,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            client_queue_depth: DEFAULT_CLIENT_QUEUE_DEPTH,
        }
    }
}

/// Waveform frame layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformHeader {
    /// sample count + timestamp (8 bytes)
    #[default]
    Basic,
    /// basic + center frequency + sample rate (20 bytes)
    Extended,
}

impl WaveformHeader {
    pub fn size(self) -> usize {
        match self {
            WaveformHeader::Basic => 8,
            WaveformHeader::Extended => 20,
        }
    }
}

/// Waveform rate limiting and framing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Stride into the source I/Q arrays
    pub decimation_factor: usize,
    /// Cap on I/Q pairs per frame
    pub max_samples_per_packet: usize,
    /// The tap forwards one buffer out of this many
    pub sample_interval: u32,
    pub header: WaveformHeader,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            decimation_factor: DEFAULT_DECIMATION_FACTOR,
            max_samples_per_packet: DEFAULT_MAX_SAMPLES_PER_PACKET,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            header: WaveformHeader::Basic,
        }
    }
}

impl AppConfig {
    /// Default location of the config file for this platform
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "radio", "webstream")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from the platform default location when `None`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        let config = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.waveform.decimation_factor == 0 {
            return Err(Error::Config("waveform.decimation_factor must be > 0".into()));
        }
        if self.waveform.max_samples_per_packet == 0 {
            return Err(Error::Config("waveform.max_samples_per_packet must be > 0".into()));
        }
        if self.waveform.sample_interval == 0 {
            return Err(Error::Config("waveform.sample_interval must be > 0".into()));
        }
        if self.server.client_queue_depth == 0 {
            return Err(Error::Config("server.client_queue_depth must be > 0".into()));
        }
        Ok(())
    }
}
