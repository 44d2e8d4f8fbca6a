//! In-memory channel model driven by the control surface
//!
//! Start/stop only flip processing state here; wiring a channel to a
//! demodulator belongs to the decode pipeline that owns the manager.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::channel::{ChannelConfig, ChannelStatus};
use crate::error::ChannelError;

pub struct ChannelManager {
    channels: RwLock<BTreeMap<String, ChannelStatus>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(BTreeMap::new()),
        }
    }

    /// All channels, ordered by name
    pub fn list(&self) -> Vec<ChannelStatus> {
        self.channels.read().values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<ChannelStatus> {
        self.channels.read().get(name).cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    pub fn create(&self, config: ChannelConfig) -> Result<ChannelStatus, ChannelError> {
        config.validate()?;

        let mut channels = self.channels.write();
        if channels.contains_key(&config.name) {
            return Err(ChannelError::AlreadyExists(config.name));
        }

        let status = ChannelStatus {
            name: config.name.clone(),
            decoder: config.decoder,
            frequency: config.frequency,
            processing: false,
        };
        channels.insert(config.name, status.clone());
        tracing::info!(channel = %status.name, frequency = status.frequency, "Channel created");
        Ok(status)
    }

    pub fn start(&self, name: &str) -> Result<(), ChannelError> {
        self.set_processing(name, true)
    }

    pub fn stop(&self, name: &str) -> Result<(), ChannelError> {
        self.set_processing(name, false)
    }

    pub fn delete(&self, name: &str) -> Result<ChannelStatus, ChannelError> {
        let removed = self
            .channels
            .write()
            .remove(name)
            .ok_or_else(|| ChannelError::NotFound(name.to_string()))?;
        tracing::info!(channel = name, "Channel deleted");
        Ok(removed)
    }

    fn set_processing(&self, name: &str, processing: bool) -> Result<(), ChannelError> {
        let mut channels = self.channels.write();
        let channel = channels
            .get_mut(name)
            .ok_or_else(|| ChannelError::NotFound(name.to_string()))?;

        match (channel.processing, processing) {
            (true, true) => return Err(ChannelError::AlreadyRunning),
            (false, false) => return Err(ChannelError::NotRunning),
            _ => {}
        }
        channel.processing = processing;
        tracing::info!(channel = name, processing, "Channel state changed");
        Ok(())
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
