//! Tap bindings per hardware source
//!
//! At most one [`SampleTap`] per source identity. Attach and detach are
//! idempotent so they can be driven directly from source enable/disable
//! events without bookkeeping on the caller's side.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::tap::SampleTap;
use super::waveform::WaveformBroadcaster;
use crate::source::{BufferStream, ListenerId, SampleSource, SourceId};

struct TapBinding {
    tap: Arc<SampleTap>,
    stream: Arc<BufferStream>,
    listener: ListenerId,
}

pub struct TapLifecycleManager {
    broadcaster: Arc<WaveformBroadcaster>,
    bindings: DashMap<SourceId, TapBinding>,
}

impl TapLifecycleManager {
    pub fn new(broadcaster: Arc<WaveformBroadcaster>) -> Self {
        Self {
            broadcaster,
            bindings: DashMap::new(),
        }
    }

    /// Bind a new tap to `stream`. Returns false if `source_id` already has one.
    pub fn attach(&self, source_id: &str, stream: Arc<BufferStream>) -> bool {
        match self.bindings.entry(source_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let tap = Arc::new(SampleTap::new(self.broadcaster.clone()));
                let listener = stream.add_listener(tap.clone());
                slot.insert(TapBinding {
                    tap,
                    stream,
                    listener,
                });
                tracing::info!(source = source_id, "Attached waveform tap");
                true
            }
        }
    }

    /// Unbind the tap for `source_id`. Returns false if there was none.
    pub fn detach(&self, source_id: &str) -> bool {
        match self.bindings.remove(source_id) {
            Some((_, binding)) => {
                binding.stream.remove_listener(binding.listener);
                tracing::info!(
                    source = source_id,
                    forwarded = binding.tap.forwarded(),
                    "Detached waveform tap"
                );
                true
            }
            None => false,
        }
    }

    /// Attach to every source that is ready now. Sources that are not ready
    /// are skipped; their own enable event is expected to call [`attach`].
    ///
    /// [`attach`]: TapLifecycleManager::attach
    pub fn attach_all<'a, I>(&self, sources: I) -> usize
    where
        I: IntoIterator<Item = &'a dyn SampleSource>,
    {
        let mut attached = 0;
        for source in sources {
            match source.buffer_stream() {
                Some(stream) => {
                    self.attach(source.id(), stream);
                    attached += 1;
                }
                None => tracing::info!(source = %source.id(), "Source not ready, skipping tap"),
            }
        }

        if attached == 0 {
            tracing::warn!(
                "No sources available for waveform streaming - \
                 taps will attach when sources are enabled"
            );
        } else {
            tracing::info!("Attached waveform taps to {} source(s)", attached);
        }
        attached
    }

    pub fn is_attached(&self, source_id: &str) -> bool {
        self.bindings.contains_key(source_id)
    }

    pub fn tap_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn detach_all(&self) {
        let ids: Vec<SourceId> = self.bindings.iter().map(|b| b.key().clone()).collect();
        for id in ids {
            self.detach(&id);
        }
    }
}
