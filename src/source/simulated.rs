//! Synthetic I/Q source
//!
//! Produces a complex tone on a dedicated thread, in the same interleaved
//! i16 layout a real tuner would deliver. Used when no hardware is attached.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::block::{NativeBuffer, NativeSamples};
use super::stream::BufferStream;
use super::{SampleSource, SourceId};
use crate::error::{Error, Result};

pub struct SimulatedSource {
    id: SourceId,
    center_frequency: i64,
    sample_rate: f32,
    /// Tone offset from center, Hz
    tone_offset: f32,
    stream: Arc<BufferStream>,
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    pub fn new(id: impl Into<SourceId>, center_frequency: i64, sample_rate: f32) -> Self {
        Self {
            id: id.into(),
            center_frequency,
            sample_rate,
            tone_offset: 12_500.0,
            stream: Arc::new(BufferStream::new()),
            stop_tx: None,
            thread_handle: None,
        }
    }

    pub fn stream(&self) -> Arc<BufferStream> {
        self.stream.clone()
    }

    /// Start producing `buffers_per_sec` buffers of `pairs` I/Q samples each
    pub fn start(&mut self, pairs: usize, buffers_per_sec: u32) -> Result<()> {
        if self.thread_handle.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let stream = self.stream.clone();
        let center_frequency = self.center_frequency;
        let sample_rate = self.sample_rate;
        let step = TAU * self.tone_offset / sample_rate;
        let period = Duration::from_secs(1) / buffers_per_sec.max(1);

        let handle = thread::Builder::new()
            .name(format!("simulated-{}", self.id))
            .spawn(move || {
                let mut phase = 0.0f32;
                loop {
                    let mut raw = Vec::with_capacity(pairs * 2);
                    for _ in 0..pairs {
                        raw.push((phase.cos() * 16_000.0) as i16);
                        raw.push((phase.sin() * 16_000.0) as i16);
                        phase = (phase + step) % TAU;
                    }

                    let timestamp = chrono::Utc::now().timestamp_millis() as u64;
                    let buffer = NativeBuffer::new(NativeSamples::Signed16(raw.into()), timestamp)
                        .with_tuning(center_frequency, sample_rate);
                    stream.broadcast(&buffer);

                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
            })
            .map_err(Error::Io)?;

        self.stop_tx = Some(stop_tx);
        self.thread_handle = Some(handle);
        tracing::info!(source = %self.id, pairs, buffers_per_sec, "Simulated source started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::info!(source = %self.id, "Simulated source stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }
}

impl SampleSource for SimulatedSource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn buffer_stream(&self) -> Option<Arc<BufferStream>> {
        self.is_running().then(|| self.stream.clone())
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.stop();
    }
}
