//! Waveform fan-out
//!
//! Decimates forwarded I/Q blocks into small binary frames. Unlike the audio
//! path, a subscriber that is closed or whose send fails is dropped from the
//! registry as soon as the current fan-out finishes.

use std::sync::Arc;

use super::registry::{ClientRegistry, SubscriberRef};
use super::subscriber::SubscriberId;
use crate::codec::frame::encode_waveform;
use crate::config::WaveformConfig;
use crate::source::ComplexSampleBlock;

pub struct WaveformBroadcaster {
    registry: Arc<ClientRegistry>,
    config: WaveformConfig,
}

impl WaveformBroadcaster {
    pub fn new(config: WaveformConfig) -> Self {
        Self {
            registry: Arc::new(ClientRegistry::new("waveform")),
            config,
        }
    }

    pub fn config(&self) -> &WaveformConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn add_client(&self, client: SubscriberRef) -> usize {
        self.registry.add(client)
    }

    pub fn remove_client(&self, id: SubscriberId) -> usize {
        self.registry.remove(id)
    }

    pub fn client_count(&self) -> usize {
        self.registry.count()
    }

    /// Encode and deliver one block. Returns the number of subscribers that
    /// accepted the frame.
    pub fn receive(&self, block: &ComplexSampleBlock) -> usize {
        if self.registry.is_empty() {
            return 0;
        }

        let Some(frame) = encode_waveform(block, &self.config) else {
            tracing::trace!(samples = block.len(), "Block too short to decimate");
            return 0;
        };

        let snapshot = self.registry.snapshot();
        let mut failed = Vec::new();
        for client in snapshot.iter() {
            if !client.is_open() {
                tracing::debug!(subscriber = %client.id(), "Waveform client closed, removing");
                failed.push(client.id());
                continue;
            }
            if let Err(e) = client.send_binary(&frame) {
                tracing::warn!(
                    subscriber = %client.id(),
                    "Error broadcasting to waveform client, removing: {}",
                    e
                );
                failed.push(client.id());
            }
        }

        for id in &failed {
            self.registry.remove(*id);
        }
        snapshot.len() - failed.len()
    }
}

impl Default for WaveformBroadcaster {
    fn default() -> Self {
        Self::new(WaveformConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::subscriber::{Frame, MemorySubscriber, Subscriber};
    use crate::config::WaveformHeader;

    fn block(total: usize) -> ComplexSampleBlock {
        ComplexSampleBlock::new(vec![0.5; total], vec![-0.5; total], 7).unwrap()
    }

    fn frame_len(sub: &MemorySubscriber) -> Vec<usize> {
        sub.frames()
            .into_iter()
            .map(|f| match f {
                Frame::Binary(b) => b.len(),
                Frame::Text(_) => panic!("waveform sends binary only"),
            })
            .collect()
    }

    #[test]
    fn test_decimation_and_cap() {
        let broadcaster = WaveformBroadcaster::default();
        let sub = Arc::new(MemorySubscriber::new());
        broadcaster.add_client(sub.clone());

        broadcaster.receive(&block(1000));
        broadcaster.receive(&block(100_000));
        assert_eq!(frame_len(&sub), vec![8 + 10 * 8, 8 + 512 * 8]);
    }

    #[test]
    fn test_extended_header_length() {
        let broadcaster = WaveformBroadcaster::new(WaveformConfig {
            header: WaveformHeader::Extended,
            ..WaveformConfig::default()
        });
        let sub = Arc::new(MemorySubscriber::new());
        broadcaster.add_client(sub.clone());

        broadcaster.receive(&block(1000));
        assert_eq!(frame_len(&sub), vec![20 + 10 * 8]);
    }

    #[test]
    fn test_short_block_is_noop() {
        let broadcaster = WaveformBroadcaster::default();
        let sub = Arc::new(MemorySubscriber::new());
        broadcaster.add_client(sub.clone());

        assert_eq!(broadcaster.receive(&block(99)), 0);
        assert!(sub.frames().is_empty());
    }

    #[test]
    fn test_failed_client_removed() {
        let broadcaster = WaveformBroadcaster::default();
        let dead = Arc::new(MemorySubscriber::new());
        dead.close();
        let live = Arc::new(MemorySubscriber::new());
        broadcaster.add_client(dead.clone());
        broadcaster.add_client(live.clone());

        assert_eq!(broadcaster.receive(&block(1000)), 1);
        assert!(!broadcaster.registry().contains(dead.id()));
        assert_eq!(broadcaster.client_count(), 1);
        assert_eq!(live.frames().len(), 1);

        assert_eq!(broadcaster.receive(&block(1000)), 1);
        assert_eq!(live.frames().len(), 2);
    }

    #[test]
    fn test_send_failure_removes_client() {
        let broadcaster = WaveformBroadcaster::default();
        let full = Arc::new(MemorySubscriber::with_capacity(1));
        broadcaster.add_client(full.clone());

        assert_eq!(broadcaster.receive(&block(1000)), 1);
        assert_eq!(broadcaster.receive(&block(1000)), 0);
        assert_eq!(broadcaster.client_count(), 0);
        assert_eq!(full.frames().len(), 1);
    }
}
