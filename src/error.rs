//! Error types for the web streaming subsystem

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure producing or delivering a frame for a single subscriber.
///
/// Always transient from the broadcaster's point of view: it is logged where
/// it happens and never propagated to the producer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Subscriber is closed")]
    Closed,

    #[error("Outbound queue full ({0} frames)")]
    QueueFull(usize),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Malformed native sample data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("Interleaved buffer has odd length: {0}")]
    OddLength(usize),

    #[error("I/Q length mismatch: {i} vs {q}")]
    LengthMismatch { i: usize, q: usize },
}

/// Audio segment lifecycle violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("Segment is already complete")]
    AlreadyComplete,

    #[error("Consumer count underflow")]
    ConsumerUnderflow,
}

/// Control surface errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel not found: {0}")]
    NotFound(String),

    #[error("Channel already exists: {0}")]
    AlreadyExists(String),

    #[error("Channel is already running")]
    AlreadyRunning,

    #[error("Channel is not running")]
    NotRunning,

    #[error("Invalid channel configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
