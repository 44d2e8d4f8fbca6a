//! Subscriber capability
//!
//! Both the audio and the waveform channel deliver to the same trait; a
//! subscriber is whatever can take a text or binary frame without blocking.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::error::SendError;

/// Identity of a subscriber within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A remote viewer.
///
/// Sends must not block; implementations queue the frame and return.
pub trait Subscriber: Send + Sync {
    fn id(&self) -> SubscriberId;

    fn send_text(&self, frame: &str) -> Result<(), SendError>;

    fn send_binary(&self, frame: &Bytes) -> Result<(), SendError>;

    /// Broadcasters skip closed subscribers without encoding or sending
    fn is_open(&self) -> bool;
}

/// A frame as delivered to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// In-process subscriber that keeps what it receives.
///
/// Bounded: once `capacity` frames are held, further sends fail with
/// [`SendError::QueueFull`] until [`MemorySubscriber::take_frames`] drains it.
pub struct MemorySubscriber {
    id: SubscriberId,
    capacity: usize,
    frames: Mutex<Vec<Frame>>,
    open: AtomicBool,
}

impl MemorySubscriber {
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: SubscriberId::new(),
            capacity,
            frames: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    pub fn take_frames(&self) -> Vec<Frame> {
        std::mem::take(&mut *self.frames.lock())
    }

    fn push(&self, frame: Frame) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        let mut frames = self.frames.lock();
        if frames.len() >= self.capacity {
            return Err(SendError::QueueFull(self.capacity));
        }
        frames.push(frame);
        Ok(())
    }
}

impl Default for MemorySubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber for MemorySubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn send_text(&self, frame: &str) -> Result<(), SendError> {
        self.push(Frame::Text(frame.to_string()))
    }

    fn send_binary(&self, frame: &Bytes) -> Result<(), SendError> {
        self.push(Frame::Binary(frame.clone()))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_subscriber_bounds() {
        let sub = MemorySubscriber::with_capacity(1);
        assert!(sub.send_text("a").is_ok());
        assert_eq!(sub.send_text("b"), Err(SendError::QueueFull(1)));

        assert_eq!(sub.take_frames(), vec![Frame::Text("a".into())]);
        assert!(sub.send_binary(&Bytes::from_static(b"x")).is_ok());
    }

    #[test]
    fn test_closed_subscriber_rejects() {
        let sub = MemorySubscriber::new();
        sub.close();
        assert_eq!(sub.send_text("a"), Err(SendError::Closed));
        assert!(sub.frames().is_empty());
    }
}
