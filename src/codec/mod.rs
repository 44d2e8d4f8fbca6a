//! Wire codecs
//!
//! Pure functions turning segments and sample blocks into frames ready to
//! hand to subscribers.

pub mod frame;

pub use frame::{
    decimated_len, encode_metadata, encode_pcm16, encode_waveform, pcm16_sample,
    waveform_frame_len, SegmentMetadata,
};
