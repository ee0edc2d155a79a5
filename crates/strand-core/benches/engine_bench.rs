//! Criterion benchmarks for the strand-core tick loop
//!
//! Run with: cargo bench -p strand-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use strand_core::kernels::{Noise, Sine, Tone};
use strand_core::{Arg, Engine, EngineConfig};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

fn engine(buffer_size: usize) -> Engine {
    let mut engine = Engine::new();
    engine
        .boot(EngineConfig {
            sample_rate: SAMPLE_RATE,
            buffer_size,
            channels: 2,
            auto_start_children: true,
            seed: Some(1),
            ..EngineConfig::default()
        })
        .unwrap();
    engine.start().unwrap();
    engine
}

fn bench_oscillator_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("OscillatorBank");

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("16_sines", block_size),
            &block_size,
            |b, &block_size| {
                let mut e = engine(block_size);
                let freqs: Vec<f32> = (1..=16).map(|i| 110.0 * i as f32).collect();
                let osc = e
                    .create(&Sine, &[("freq", freqs.into()), ("mul", 0.05.into())])
                    .unwrap();
                e.out(osc, 0, 1, 0.0, 0.0).unwrap();
                b.iter(|| black_box(e.process_tick()[0]));
            },
        );
    }

    group.finish();
}

fn bench_filter_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("FilterChain");

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("noise_tone_x4", block_size),
            &block_size,
            |b, &block_size| {
                let mut e = engine(block_size);
                let mut last = e.create(&Noise, &[("mul", 0.1.into())]).unwrap();
                for freq in [4000.0, 2000.0, 1000.0, 500.0] {
                    last = e
                        .create(&Tone, &[("input", last.into()), ("freq", freq.into())])
                        .unwrap();
                }
                e.out(last, 0, 1, 0.0, 0.0).unwrap();
                b.iter(|| black_box(e.process_tick()[0]));
            },
        );
    }

    group.finish();
}

fn bench_crossfade(c: &mut Criterion) {
    c.bench_function("set_input_during_playback", |b| {
        let mut e = engine(256);
        let a = e.create(&Sine, &[("freq", Arg::from([220.0, 330.0]))]).unwrap();
        let bsrc = e.create(&Noise, &[]).unwrap();
        e.play(bsrc, 0.0, 0.0).unwrap();
        let lp = e.create(&Tone, &[("input", a.into())]).unwrap();
        e.out(lp, 0, 1, 0.0, 0.0).unwrap();
        let mut toggle = false;
        b.iter(|| {
            toggle = !toggle;
            let src = if toggle { bsrc } else { a };
            e.set_input(lp, src, 0.01).unwrap();
            black_box(e.process_tick()[0]);
        });
    });
}

criterion_group!(
    benches,
    bench_oscillator_bank,
    bench_filter_chain,
    bench_crossfade
);
criterion_main!(benches);
