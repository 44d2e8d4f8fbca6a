//! Complex sample blocks and native-format buffers
//!
//! Hardware sources hand out buffers in whatever layout the device produces
//! (interleaved unsigned bytes for RTL-SDR style dongles, interleaved i16 for
//! most others). Conversion to float I/Q is deferred until a consumer asks for
//! it, so listeners that drop the buffer pay nothing.

use bytes::Bytes;
use std::sync::Arc;

use crate::error::SampleError;

/// A batch of I/Q samples from one hardware source.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSampleBlock {
    pub i: Arc<[f32]>,
    pub q: Arc<[f32]>,
    /// Source timestamp (milliseconds)
    pub timestamp: u64,
    pub center_frequency: i64,
    pub sample_rate: f32,
}

impl ComplexSampleBlock {
    pub fn new(i: Vec<f32>, q: Vec<f32>, timestamp: u64) -> Result<Self, SampleError> {
        if i.len() != q.len() {
            return Err(SampleError::LengthMismatch {
                i: i.len(),
                q: q.len(),
            });
        }
        Ok(Self {
            i: i.into(),
            q: q.into(),
            timestamp,
            center_frequency: 0,
            sample_rate: 0.0,
        })
    }

    pub fn with_tuning(mut self, center_frequency: i64, sample_rate: f32) -> Self {
        self.center_frequency = center_frequency;
        self.sample_rate = sample_rate;
        self
    }

    /// Usable sample pairs; tolerates blocks built with unequal arrays
    pub fn len(&self) -> usize {
        self.i.len().min(self.q.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sample layout of a native buffer
#[derive(Debug, Clone)]
pub enum NativeSamples {
    /// Interleaved unsigned 8-bit I/Q centred on 127.5
    Unsigned8(Bytes),
    /// Interleaved signed 16-bit I/Q
    Signed16(Arc<[i16]>),
    /// Already converted blocks
    Complex(Vec<ComplexSampleBlock>),
}

/// One buffer as delivered by a hardware source.
#[derive(Debug, Clone)]
pub struct NativeBuffer {
    samples: NativeSamples,
    timestamp: u64,
    center_frequency: i64,
    sample_rate: f32,
    /// Complex pairs per converted block
    chunk_len: usize,
}

impl NativeBuffer {
    pub fn new(samples: NativeSamples, timestamp: u64) -> Self {
        Self {
            samples,
            timestamp,
            center_frequency: 0,
            sample_rate: 0.0,
            chunk_len: usize::MAX,
        }
    }

    pub fn with_tuning(mut self, center_frequency: i64, sample_rate: f32) -> Self {
        self.center_frequency = center_frequency;
        self.sample_rate = sample_rate;
        self
    }

    /// Split conversion output into blocks of at most `chunk_len` pairs
    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len.max(1);
        self
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Convert and return the first block, if the buffer holds any samples.
    pub fn first_block(&self) -> Result<Option<ComplexSampleBlock>, SampleError> {
        match &self.samples {
            NativeSamples::Complex(blocks) => Ok(blocks.first().cloned()),
            NativeSamples::Unsigned8(raw) => {
                let pairs = Self::pair_count(raw.len())?;
                let take = pairs.min(self.chunk_len);
                let (i, q) = raw[..take * 2]
                    .chunks_exact(2)
                    .map(|p| ((p[0] as f32 - 127.5) / 128.0, (p[1] as f32 - 127.5) / 128.0))
                    .unzip();
                self.block(i, q, take)
            }
            NativeSamples::Signed16(raw) => {
                let pairs = Self::pair_count(raw.len())?;
                let take = pairs.min(self.chunk_len);
                let (i, q) = raw[..take * 2]
                    .chunks_exact(2)
                    .map(|p| (p[0] as f32 / 32768.0, p[1] as f32 / 32768.0))
                    .unzip();
                self.block(i, q, take)
            }
        }
    }

    fn pair_count(len: usize) -> Result<usize, SampleError> {
        if len % 2 != 0 {
            return Err(SampleError::OddLength(len));
        }
        Ok(len / 2)
    }

    fn block(
        &self,
        i: Vec<f32>,
        q: Vec<f32>,
        pairs: usize,
    ) -> Result<Option<ComplexSampleBlock>, SampleError> {
        if pairs == 0 {
            return Ok(None);
        }
        Ok(Some(
            ComplexSampleBlock::new(i, q, self.timestamp)?
                .with_tuning(self.center_frequency, self.sample_rate),
        ))
    }
}
