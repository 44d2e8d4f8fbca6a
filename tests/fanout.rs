//! End-to-end fan-out through taps, broadcasters and registries

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use radio_webstream::audio::AudioSegment;
use radio_webstream::broadcast::{
    AudioBroadcaster, Frame, MemorySubscriber, Subscriber, SubscriberId, SubscriberRef,
    TapLifecycleManager, WaveformBroadcaster,
};
use radio_webstream::codec::{decimated_len, encode_pcm16, encode_waveform, waveform_frame_len};
use radio_webstream::config::{WaveformConfig, WaveformHeader};
use radio_webstream::error::SendError;
use radio_webstream::source::{BufferStream, ComplexSampleBlock, NativeBuffer, NativeSamples};

fn native_buffer(pairs: usize) -> NativeBuffer {
    let raw: Vec<i16> = (0..pairs * 2).map(|n| (n % 1000) as i16).collect();
    NativeBuffer::new(NativeSamples::Signed16(raw.into()), 1234)
        .with_tuning(460_025_000, 2_048_000.0)
}

#[test]
fn identical_frames_for_every_audio_subscriber() {
    let broadcaster = AudioBroadcaster::new();
    let a = Arc::new(MemorySubscriber::new());
    let b = Arc::new(MemorySubscriber::new());
    broadcaster.registry().add(a.clone());
    broadcaster.registry().add(b.clone());

    let segment = Arc::new(
        AudioSegment::new(Some("County Fire".into()), 1_700_000_000_123).with_timeslot(2),
    );
    broadcaster.watch(&segment);
    segment.add_audio(vec![0.25; 160]).unwrap();
    segment.add_audio(vec![-0.25; 160]).unwrap();
    segment.complete();

    let frames_a = a.frames();
    assert_eq!(frames_a.len(), 2);
    assert_eq!(frames_a, b.frames());

    match &frames_a[0] {
        Frame::Text(json) => {
            let value: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(value["channelName"], "County Fire");
            assert_eq!(value["timeslot"], 2);
            assert_eq!(value["duration"], 40);
        }
        other => panic!("expected metadata first, got {:?}", other),
    }
    match &frames_a[1] {
        Frame::Binary(pcm) => assert_eq!(pcm.len(), 320 * 2),
        other => panic!("expected PCM second, got {:?}", other),
    }
    assert_eq!(segment.consumer_count(), 0);
}

#[test]
fn tap_to_viewer_through_source_stream() {
    let broadcaster = Arc::new(WaveformBroadcaster::default());
    let taps = TapLifecycleManager::new(broadcaster.clone());
    let stream = Arc::new(BufferStream::new());

    assert!(taps.attach("rtl-0", stream.clone()));
    assert!(!taps.attach("rtl-0", stream.clone()));
    assert_eq!(stream.listener_count(), 1);

    let viewer = Arc::new(MemorySubscriber::new());
    broadcaster.add_client(viewer.clone());

    let buffer = native_buffer(2048);
    for _ in 0..30 {
        stream.broadcast(&buffer);
    }

    let frames = viewer.frames();
    assert_eq!(frames.len(), 3);
    for frame in frames {
        match frame {
            Frame::Binary(bytes) => assert_eq!(bytes.len(), 8 + 20 * 8),
            Frame::Text(_) => panic!("unexpected text frame"),
        }
    }

    assert!(taps.detach("rtl-0"));
    stream.broadcast(&buffer);
    assert_eq!(stream.listener_count(), 0);
}

#[test]
fn tap_idle_when_nobody_watches() {
    let broadcaster = Arc::new(WaveformBroadcaster::default());
    let taps = TapLifecycleManager::new(broadcaster.clone());
    let stream = Arc::new(BufferStream::new());
    taps.attach("rtl-0", stream.clone());

    let buffer = native_buffer(2048);
    for _ in 0..25 {
        stream.broadcast(&buffer);
    }

    // A viewer joining now must wait a full interval, not inherit idle calls
    let viewer = Arc::new(MemorySubscriber::new());
    broadcaster.add_client(viewer.clone());
    for _ in 0..9 {
        stream.broadcast(&buffer);
    }
    assert!(viewer.frames().is_empty());
    stream.broadcast(&buffer);
    assert_eq!(viewer.frames().len(), 1);
}

/// Fails every send after the first `ok` ones
struct Flaky {
    id: SubscriberId,
    ok: usize,
    sent: AtomicUsize,
}

impl Subscriber for Flaky {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn send_text(&self, _frame: &str) -> Result<(), SendError> {
        Err(SendError::Closed)
    }

    fn send_binary(&self, _frame: &bytes::Bytes) -> Result<(), SendError> {
        if self.sent.fetch_add(1, Ordering::SeqCst) < self.ok {
            Ok(())
        } else {
            Err(SendError::QueueFull(1))
        }
    }

    fn is_open(&self) -> bool {
        true
    }
}

#[test]
fn waveform_self_heals_after_failure() {
    let broadcaster = WaveformBroadcaster::default();
    let flaky = Arc::new(Flaky {
        id: SubscriberId::new(),
        ok: 1,
        sent: AtomicUsize::new(0),
    });
    let steady = Arc::new(MemorySubscriber::new());
    broadcaster.add_client(flaky.clone());
    broadcaster.add_client(steady.clone());

    let block = ComplexSampleBlock::new(vec![0.0; 1000], vec![0.0; 1000], 0).unwrap();
    assert_eq!(broadcaster.receive(&block), 2);
    assert_eq!(broadcaster.receive(&block), 1);
    assert!(!broadcaster.registry().contains(flaky.id()));
    assert_eq!(broadcaster.receive(&block), 1);
    assert_eq!(flaky.sent.load(Ordering::SeqCst), 2);
    assert_eq!(steady.frames().len(), 3);
}

#[test]
fn audio_keeps_failing_subscriber() {
    let broadcaster = AudioBroadcaster::new();
    let flaky: SubscriberRef = Arc::new(Flaky {
        id: SubscriberId::new(),
        ok: 0,
        sent: AtomicUsize::new(0),
    });
    let steady = Arc::new(MemorySubscriber::new());
    broadcaster.registry().add(flaky.clone());
    broadcaster.registry().add(steady.clone());

    let segment = AudioSegment::new(None, 0);
    segment.add_audio(vec![0.1; 80]).unwrap();
    segment.complete();

    assert_eq!(broadcaster.receive(&segment), 1);
    assert_eq!(broadcaster.client_count(), 2);
    assert_eq!(steady.frames().len(), 2);
}

#[test]
fn disconnects_race_fan_out() {
    let broadcaster = Arc::new(AudioBroadcaster::new());
    let segment = AudioSegment::new(Some("Race".into()), 0);
    segment.add_audio(vec![0.5; 160]).unwrap();
    segment.complete();

    let churn = {
        let registry = broadcaster.registry().clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let subs: Vec<Arc<MemorySubscriber>> =
                    (0..4).map(|_| Arc::new(MemorySubscriber::new())).collect();
                for s in &subs {
                    registry.add(s.clone());
                }
                for s in &subs {
                    registry.remove(s.id());
                }
                // A removed viewer never sees frames started after its removal
                let before: Vec<usize> = subs.iter().map(|s| s.frames().len()).collect();
                thread::yield_now();
                let after: Vec<usize> = subs.iter().map(|s| s.frames().len()).collect();
                assert!(after.iter().zip(&before).all(|(a, b)| a - b <= 2));
            }
        })
    };

    for _ in 0..200 {
        let delivered = broadcaster.receive(&segment);
        assert!(delivered <= 4);
    }
    churn.join().unwrap();
    assert_eq!(broadcaster.client_count(), 0);
}

proptest! {
    #[test]
    fn waveform_frame_size(total in 0usize..200_000, extended in any::<bool>()) {
        let config = WaveformConfig {
            header: if extended { WaveformHeader::Extended } else { WaveformHeader::Basic },
            ..WaveformConfig::default()
        };
        let block = ComplexSampleBlock::new(vec![0.1; total], vec![0.2; total], 99).unwrap();
        let d = decimated_len(total, &config);
        prop_assert_eq!(d, (total / 100).min(512));

        match encode_waveform(&block, &config) {
            Some(frame) => prop_assert_eq!(frame.len(), waveform_frame_len(d, config.header)),
            None => prop_assert_eq!(d, 0),
        }
    }

    #[test]
    fn pcm_length_and_bounds(
        buffers in prop::collection::vec(prop::collection::vec(-4.0f32..4.0, 0..64), 0..8)
    ) {
        let total: usize = buffers.iter().map(Vec::len).sum();
        let pcm = encode_pcm16(&buffers);
        prop_assert_eq!(pcm.len(), total * 2);

        for pair in pcm.chunks_exact(2) {
            let value = i16::from_le_bytes([pair[0], pair[1]]);
            prop_assert!((-32767..=32767).contains(&value));
        }
    }
}
