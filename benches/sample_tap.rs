use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use radio_webstream::broadcast::{MemorySubscriber, SampleTap, WaveformBroadcaster};
use radio_webstream::source::{BufferListener, NativeBuffer, NativeSamples};

fn buffer() -> NativeBuffer {
    let raw: Vec<i16> = (0..32_768).map(|n| (n % 2048) as i16).collect();
    NativeBuffer::new(NativeSamples::Signed16(raw.into()), 0).with_tuning(162_550_000, 2_400_000.0)
}

fn bench_tap(c: &mut Criterion) {
    let buffer = buffer();

    let idle = SampleTap::new(Arc::new(WaveformBroadcaster::default()));
    c.bench_function("tap_no_subscribers", |b| {
        b.iter(|| idle.receive(black_box(&buffer)))
    });

    let broadcaster = Arc::new(WaveformBroadcaster::default());
    let viewer = Arc::new(MemorySubscriber::new());
    broadcaster.add_client(viewer.clone());
    let active = SampleTap::new(broadcaster);
    c.bench_function("tap_one_subscriber", |b| {
        b.iter(|| {
            active.receive(black_box(&buffer));
            viewer.take_frames();
        })
    });
}

criterion_group!(benches, bench_tap);
criterion_main!(benches);
