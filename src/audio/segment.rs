//! Decoded audio segments
//!
//! A segment is filled by the decode pipeline and then marked complete
//! exactly once. Consumers register a one-shot completion callback instead of
//! polling, and hold a consumer reference while they work so the pipeline
//! knows when the segment can be discarded.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::constants::AUDIO_SAMPLE_RATE;
use crate::error::SegmentError;

/// Callback fired once when a segment completes
pub type CompletionCallback = Box<dyn FnOnce(&AudioSegment) + Send + 'static>;

/// One unit of decoded mono audio.
pub struct AudioSegment {
    channel_name: Option<String>,
    /// Epoch milliseconds
    start_timestamp: i64,
    timeslot: i32,
    encrypted: AtomicBool,
    buffers: RwLock<Vec<Arc<[f32]>>>,
    sample_count: AtomicUsize,
    complete: AtomicBool,
    /// `None` once the completion callbacks have fired
    callbacks: Mutex<Option<Vec<CompletionCallback>>>,
    consumers: AtomicUsize,
}

impl AudioSegment {
    pub fn new(channel_name: Option<String>, start_timestamp: i64) -> Self {
        Self {
            channel_name,
            start_timestamp,
            timeslot: 0,
            encrypted: AtomicBool::new(false),
            buffers: RwLock::new(Vec::new()),
            sample_count: AtomicUsize::new(0),
            complete: AtomicBool::new(false),
            callbacks: Mutex::new(Some(Vec::new())),
            consumers: AtomicUsize::new(0),
        }
    }

    pub fn with_timeslot(mut self, timeslot: i32) -> Self {
        self.timeslot = timeslot;
        self
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel_name.as_deref()
    }

    pub fn start_timestamp(&self) -> i64 {
        self.start_timestamp
    }

    pub fn timeslot(&self) -> i32 {
        self.timeslot
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted.load(Ordering::Relaxed)
    }

    pub fn set_encrypted(&self, encrypted: bool) {
        self.encrypted.store(encrypted, Ordering::Relaxed);
    }

    /// Append a buffer of samples in [-1.0, 1.0].
    pub fn add_audio(&self, buffer: Vec<f32>) -> Result<(), SegmentError> {
        let mut buffers = self.buffers.write();
        if self.is_complete() {
            return Err(SegmentError::AlreadyComplete);
        }
        self.sample_count.fetch_add(buffer.len(), Ordering::Relaxed);
        buffers.push(buffer.into());
        Ok(())
    }

    /// Buffers in production order
    pub fn audio_buffers(&self) -> Vec<Arc<[f32]>> {
        self.buffers.read().clone()
    }

    pub fn audio_buffer_count(&self) -> usize {
        self.buffers.read().len()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count.load(Ordering::Relaxed)
    }

    pub fn has_audio(&self) -> bool {
        self.sample_count() > 0
    }

    /// Duration in milliseconds at the decoder output rate
    pub fn duration_ms(&self) -> i64 {
        (self.sample_count() as u64 * 1000 / AUDIO_SAMPLE_RATE as u64) as i64
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Mark the segment complete and fire the completion callbacks.
    ///
    /// Returns false if the segment was already complete.
    pub fn complete(&self) -> bool {
        let callbacks = {
            // Holding the buffer lock keeps add_audio from slipping in after the flag flips
            let _buffers = self.buffers.write();
            let mut slot = self.callbacks.lock();
            match slot.take() {
                Some(callbacks) => {
                    self.complete.store(true, Ordering::Release);
                    callbacks
                }
                None => return false,
            }
        };

        for callback in callbacks {
            callback(self);
        }
        true
    }

    /// Run `callback` once the segment completes, or immediately if it
    /// already has.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&AudioSegment) + Send + 'static,
    {
        let mut slot = self.callbacks.lock();
        match slot.as_mut() {
            Some(callbacks) => callbacks.push(Box::new(callback)),
            None => {
                drop(slot);
                callback(self);
            }
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.load(Ordering::Acquire)
    }

    pub fn increment_consumer_count(&self) -> usize {
        self.consumers.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Release one consumer reference. Never goes below zero.
    pub fn decrement_consumer_count(&self) -> Result<usize, SegmentError> {
        self.consumers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|prev| prev - 1)
            .map_err(|_| SegmentError::ConsumerUnderflow)
    }

    /// Complete with no outstanding consumers; the pipeline may discard it
    pub fn is_released(&self) -> bool {
        self.is_complete() && self.consumer_count() == 0
    }
}

impl std::fmt::Debug for AudioSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSegment")
            .field("channel_name", &self.channel_name)
            .field("start_timestamp", &self.start_timestamp)
            .field("timeslot", &self.timeslot)
            .field("samples", &self.sample_count())
            .field("complete", &self.is_complete())
            .field("consumers", &self.consumer_count())
            .finish()
    }
}
