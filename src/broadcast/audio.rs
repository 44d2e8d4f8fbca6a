//! Audio segment fan-out
//!
//! Each completed segment becomes one metadata text frame and one PCM16
//! binary frame, sent in that order to every subscriber in the registry.
//! Subscribers already closed are skipped; a failed send is logged. Removal
//! of dead subscribers is left to the connection layer's close handling.

use std::sync::Arc;

use super::registry::{ClientRegistry, SubscriberRef};
use crate::audio::AudioSegment;
use crate::codec::frame::{encode_metadata, encode_pcm16};

#[derive(Clone)]
pub struct AudioBroadcaster {
    registry: Arc<ClientRegistry>,
}

impl AudioBroadcaster {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ClientRegistry::new("audio")))
    }

    pub fn with_registry(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn client_count(&self) -> usize {
        self.registry.count()
    }

    /// Broadcast a completed segment. Returns the number of subscribers that
    /// accepted both frames.
    pub fn receive(&self, segment: &AudioSegment) -> usize {
        if !segment.has_audio() {
            tracing::trace!(channel = ?segment.channel_name(), "Segment has no audio");
            return 0;
        }

        let snapshot = self.registry.snapshot();
        let open: Vec<&SubscriberRef> = snapshot.iter().filter(|c| c.is_open()).collect();
        if open.is_empty() {
            return 0;
        }

        let metadata = match encode_metadata(segment) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(registry = self.registry.label(), "Segment metadata: {}", e);
                return 0;
            }
        };
        let pcm = encode_pcm16(&segment.audio_buffers());

        let mut delivered = 0;
        for client in open {
            let result = client
                .send_text(&metadata)
                .and_then(|_| client.send_binary(&pcm));
            match result {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    registry = self.registry.label(),
                    subscriber = %client.id(),
                    "Error sending audio to client: {}",
                    e
                ),
            }
        }
        delivered
    }

    /// Broadcast `segment` once it completes.
    ///
    /// Holds one consumer reference on the segment from now until the
    /// completion callback has finished, on every path.
    pub fn watch(&self, segment: &Arc<AudioSegment>) {
        segment.increment_consumer_count();

        let broadcaster = self.clone();
        segment.on_complete(move |segment| {
            let _release = ConsumerGuard(segment);
            if segment.has_audio() {
                tracing::debug!(
                    channel = ?segment.channel_name(),
                    buffers = segment.audio_buffer_count(),
                    clients = broadcaster.client_count(),
                    "Broadcasting completed segment"
                );
                broadcaster.receive(segment);
            } else {
                tracing::debug!(
                    channel = ?segment.channel_name(),
                    "Completed segment has no audio"
                );
            }
        });
    }
}

impl Default for AudioBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases one consumer reference when dropped, including on unwind
struct ConsumerGuard<'a>(&'a AudioSegment);

impl Drop for ConsumerGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.decrement_consumer_count() {
            tracing::error!("Segment consumer count: {}", e);
        }
    }
}
