//! Benchmarks for frame decoding and rendering
//!
//! Measures pixel-map text parsing and the RGB conversion done per tick.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use frameloop::renderer::{mean_intensity, to_rgb8};
use frameloop::FrameMetadata;
use std::time::Duration;

/// A frame with a horizontal gradient, as written by the producer.
fn gradient_frame(width: u32, height: u32) -> (FrameMetadata, Vec<u16>, String) {
    let meta = FrameMetadata::new(width, height, 255);
    let mut samples = Vec::with_capacity(meta.sample_count());
    for _y in 0..height {
        for x in 0..width {
            let v = (x * 255 / width.max(1)) as u16;
            samples.extend_from_slice(&[v, v / 2, 255 - v]);
        }
    }
    let text = frameloop_ppm::encode(&meta, &samples);
    (meta, samples, text)
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.measurement_time(Duration::from_secs(5));

    for size in [16u32, 64, 256] {
        let (_, _, text) = gradient_frame(size, size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("p3", size), &text, |b, text| {
            b.iter(|| frameloop_ppm::decode(black_box(text)));
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    let (meta, samples, _) = gradient_frame(256, 256);
    group.throughput(Throughput::Elements(meta.pixel_count() as u64));

    group.bench_function("to_rgb8/flipped", |b| {
        b.iter(|| to_rgb8(black_box(&samples), &meta, true));
    });

    group.bench_function("mean_intensity", |b| {
        b.iter(|| mean_intensity(black_box(&samples), &meta));
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_render);
criterion_main!(benches);
