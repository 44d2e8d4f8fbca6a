//! Rate-limited tap on a hardware source's buffer stream
//!
//! Runs on the producer thread for every buffer. With nobody watching it
//! costs one atomic load and returns.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use super::waveform::WaveformBroadcaster;
use crate::source::{BufferListener, NativeBuffer};

pub struct SampleTap {
    broadcaster: Arc<WaveformBroadcaster>,
    interval: u32,
    counter: AtomicU32,
    forwarded: AtomicU64,
}

impl SampleTap {
    pub fn new(broadcaster: Arc<WaveformBroadcaster>) -> Self {
        let interval = broadcaster.config().sample_interval.max(1);
        Self::with_interval(broadcaster, interval)
    }

    pub fn with_interval(broadcaster: Arc<WaveformBroadcaster>, interval: u32) -> Self {
        Self {
            broadcaster,
            interval: interval.max(1),
            counter: AtomicU32::new(0),
            forwarded: AtomicU64::new(0),
        }
    }

    /// Buffers handed to the broadcaster so far
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }
}

impl BufferListener for SampleTap {
    fn receive(&self, buffer: &NativeBuffer) {
        if self.broadcaster.client_count() == 0 {
            return;
        }

        // Single producer per tap, so load/store on the counter cannot race
        let seen = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        if seen < self.interval {
            return;
        }
        self.counter.store(0, Ordering::Relaxed);

        match buffer.first_block() {
            Ok(Some(block)) => {
                self.forwarded.fetch_add(1, Ordering::Relaxed);
                self.broadcaster.receive(&block);
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Error processing waveform sample tap: {}", e),
        }
    }
}
