//! Broadcast fan-out
//!
//! ```text
//! decode pipeline ──segment complete──▶ AudioBroadcaster ──▶ ClientRegistry("audio") ──▶ viewers
//! source stream ──▶ SampleTap (1 in N) ──▶ WaveformBroadcaster ──▶ ClientRegistry("waveform") ──▶ viewers
//! ```

pub mod audio;
pub mod lifecycle;
pub mod registry;
pub mod subscriber;
pub mod tap;
pub mod waveform;

pub use audio::AudioBroadcaster;
pub use lifecycle::TapLifecycleManager;
pub use registry::{ClientRegistry, Snapshot, SubscriberRef};
pub use subscriber::{Frame, MemorySubscriber, Subscriber, SubscriberId};
pub use tap::SampleTap;
pub use waveform::WaveformBroadcaster;
