//! Wire framing for the audio and waveform channels
//!
//! Audio: one JSON text frame of segment metadata, then one binary frame of
//! little-endian PCM16. Waveform: one binary frame per forwarded block,
//! a fixed header followed by decimated `f32` I/Q pairs, all little-endian.
//!
//! ```text
//! basic:    [count i32][ts_low u32][I f32][Q f32]...
//! extended: [count i32][ts_low u32][center_hz i64][rate_hz f32][I f32][Q f32]...
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::audio::AudioSegment;
use crate::config::{WaveformConfig, WaveformHeader};
use crate::constants::{PCM16_SCALE, UNKNOWN_CHANNEL};
use crate::error::SendError;
use crate::source::ComplexSampleBlock;

/// Bytes per I/Q pair on the wire
pub const WAVEFORM_PAIR_SIZE: usize = 8;

/// Text frame preceding each PCM frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMetadata {
    pub channel_name: String,
    pub timestamp: i64,
    pub duration: i64,
    pub encrypted: bool,
    pub timeslot: i32,
}

impl SegmentMetadata {
    pub fn from_segment(segment: &AudioSegment) -> Self {
        Self {
            channel_name: segment.channel_name().unwrap_or(UNKNOWN_CHANNEL).to_string(),
            timestamp: segment.start_timestamp(),
            duration: segment.duration_ms(),
            encrypted: segment.is_encrypted(),
            timeslot: segment.timeslot(),
        }
    }
}

pub fn encode_metadata(segment: &AudioSegment) -> Result<String, SendError> {
    serde_json::to_string(&SegmentMetadata::from_segment(segment))
        .map_err(|e| SendError::Encoding(e.to_string()))
}

/// Convert one float sample to PCM16.
///
/// Clamps to [-1, 1] and rounds to nearest with ties toward zero, so 0.5
/// maps to 16383 and full scale to +/-32767.
pub fn pcm16_sample(sample: f32) -> i16 {
    let scaled = sample.clamp(-1.0, 1.0) * PCM16_SCALE;
    let magnitude = (scaled.abs() - 0.5).ceil().max(0.0);
    magnitude.copysign(scaled) as i16
}

/// Concatenate every buffer, in order, as little-endian PCM16
pub fn encode_pcm16<B: AsRef<[f32]>>(buffers: &[B]) -> Bytes {
    let total: usize = buffers.iter().map(|b| b.as_ref().len()).sum();
    let mut out = BytesMut::with_capacity(total * 2);
    for buffer in buffers {
        for &sample in buffer.as_ref() {
            out.put_i16_le(pcm16_sample(sample));
        }
    }
    out.freeze()
}

/// Number of I/Q pairs a block of `total` pairs decimates to
pub fn decimated_len(total: usize, config: &WaveformConfig) -> usize {
    (total / config.decimation_factor.max(1)).min(config.max_samples_per_packet)
}

/// Expected frame size for `pairs` decimated samples
pub fn waveform_frame_len(pairs: usize, header: WaveformHeader) -> usize {
    header.size() + pairs * WAVEFORM_PAIR_SIZE
}

/// Build a waveform frame, or `None` if the block decimates to nothing.
pub fn encode_waveform(block: &ComplexSampleBlock, config: &WaveformConfig) -> Option<Bytes> {
    let total = block.len();
    let pairs = decimated_len(total, config);
    if pairs == 0 {
        return None;
    }

    let mut out = BytesMut::with_capacity(waveform_frame_len(pairs, config.header));
    out.put_i32_le(pairs as i32);
    out.put_u32_le((block.timestamp & 0xFFFF_FFFF) as u32);
    if config.header == WaveformHeader::Extended {
        out.put_i64_le(block.center_frequency);
        out.put_f32_le(block.sample_rate);
    }

    let stride = config.decimation_factor.max(1);
    for k in 0..pairs {
        let index = k * stride;
        if index < total {
            out.put_f32_le(block.i[index]);
            out.put_f32_le(block.q[index]);
        } else {
            // Keep the frame length fixed
            out.put_f32_le(0.0);
            out.put_f32_le(0.0);
        }
    }
    Some(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn block(total: usize) -> ComplexSampleBlock {
        let i: Vec<f32> = (0..total).map(|n| n as f32).collect();
        let q: Vec<f32> = (0..total).map(|n| -(n as f32)).collect();
        ComplexSampleBlock::new(i, q, 0x1_2345_6789)
            .unwrap()
            .with_tuning(851_012_500, 2_400_000.0)
    }

    #[test]
    fn test_pcm16_reference_values() {
        let samples = [0.0f32, 1.0, -1.0, 0.5];
        let pcm: Vec<i16> = samples.iter().map(|&s| pcm16_sample(s)).collect();
        assert_eq!(pcm, vec![0, 32767, -32767, 16383]);
    }

    #[test]
    fn test_pcm16_clamps_and_rounds() {
        assert_eq!(pcm16_sample(2.0), 32767);
        assert_eq!(pcm16_sample(-3.5), -32767);
        assert_eq!(pcm16_sample(0.25), 8192); // 8191.75
        assert_eq!(pcm16_sample(-0.5), -16383);
        assert_eq!(pcm16_sample(f32::NAN), 0);
    }

    #[test]
    fn test_pcm16_buffer_order() {
        let buffers: Vec<Arc<[f32]>> = vec![Arc::from(vec![1.0, 0.0]), Arc::from(vec![-1.0])];
        let bytes = encode_pcm16(&buffers);
        assert_eq!(&bytes[..], &[0xFF, 0x7F, 0x00, 0x00, 0x01, 0x80]);
    }

    #[test]
    fn test_metadata_json() {
        let segment = AudioSegment::new(None, 1_700_000_000_000).with_timeslot(1);
        segment.add_audio(vec![0.0; 800]).unwrap();
        segment.set_encrypted(true);

        let text = encode_metadata(&segment).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["channelName"], "Unknown");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
        assert_eq!(json["duration"], 100);
        assert_eq!(json["encrypted"], true);
        assert_eq!(json["timeslot"], 1);
    }

    #[test]
    fn test_decimated_len() {
        let config = WaveformConfig::default();
        assert_eq!(decimated_len(1000, &config), 10);
        assert_eq!(decimated_len(100_000, &config), 512);
        assert_eq!(decimated_len(99, &config), 0);
    }

    #[test]
    fn test_basic_frame_layout() {
        let config = WaveformConfig::default();
        let frame = encode_waveform(&block(1000), &config).unwrap();

        assert_eq!(frame.len(), 8 + 10 * 8);
        assert_eq!(i32::from_le_bytes(frame[0..4].try_into().unwrap()), 10);
        assert_eq!(u32::from_le_bytes(frame[4..8].try_into().unwrap()), 0x2345_6789);
        // Pair 3 reads source index 300
        let at = 8 + 3 * 8;
        assert_eq!(f32::from_le_bytes(frame[at..at + 4].try_into().unwrap()), 300.0);
        assert_eq!(f32::from_le_bytes(frame[at + 4..at + 8].try_into().unwrap()), -300.0);
    }

    #[test]
    fn test_extended_frame_layout() {
        let config = WaveformConfig {
            header: WaveformHeader::Extended,
            ..WaveformConfig::default()
        };
        let frame = encode_waveform(&block(1000), &config).unwrap();

        assert_eq!(frame.len(), 20 + 10 * 8);
        assert_eq!(i64::from_le_bytes(frame[8..16].try_into().unwrap()), 851_012_500);
        assert_eq!(f32::from_le_bytes(frame[16..20].try_into().unwrap()), 2_400_000.0);
        // Pair 1 starts right after the 20 byte header and pair 0
        assert_eq!(f32::from_le_bytes(frame[28..32].try_into().unwrap()), 100.0);
        assert_eq!(f32::from_le_bytes(frame[32..36].try_into().unwrap()), -100.0);
    }

    #[test]
    fn test_degenerate_block_has_no_frame() {
        assert!(encode_waveform(&block(50), &WaveformConfig::default()).is_none());
    }
}
