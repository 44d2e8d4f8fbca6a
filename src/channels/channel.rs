//! Channel definitions exposed through the control surface

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ChannelError;

/// Demodulator for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecoderType {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "NBFM")]
    Nbfm,
}

impl FromStr for DecoderType {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AM" => Ok(DecoderType::Am),
            "NBFM" => Ok(DecoderType::Nbfm),
            other => Err(ChannelError::InvalidConfig(format!(
                "Unsupported decoder type: {}",
                other
            ))),
        }
    }
}

/// Request body for channel creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub decoder: DecoderType,
    /// Hz
    pub frequency: u64,
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.name.trim().is_empty() {
            return Err(ChannelError::InvalidConfig("Channel name is required".into()));
        }
        if self.frequency == 0 {
            return Err(ChannelError::InvalidConfig("Frequency must be > 0".into()));
        }
        Ok(())
    }
}

/// Channel as reported by `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub decoder: DecoderType,
    pub frequency: u64,
    pub processing: bool,
}
