//! Channel control model

pub mod channel;
pub mod manager;

pub use channel::{ChannelConfig, ChannelStatus, DecoderType};
pub use manager::ChannelManager;
