//! Decoded audio model

pub mod segment;

pub use segment::{AudioSegment, CompletionCallback};
