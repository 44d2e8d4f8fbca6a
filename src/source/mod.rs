//! Hardware sample sources
//!
//! Only the boundary the broadcast layer needs: sources have a stable
//! identity and, once ready, a buffer stream taps can listen on.

pub mod block;
pub mod simulated;
pub mod stream;

use std::sync::Arc;

pub use block::{ComplexSampleBlock, NativeBuffer, NativeSamples};
pub use simulated::SimulatedSource;
pub use stream::{BufferListener, BufferStream, ListenerId};

/// Stable identity of a hardware source (tuner serial or similar)
pub type SourceId = String;

/// A hardware source that may or may not be producing samples yet
pub trait SampleSource: Send + Sync {
    fn id(&self) -> &SourceId;

    /// `None` until the source is enabled and producing
    fn buffer_stream(&self) -> Option<Arc<BufferStream>>;
}
