//! Measurement kernel benchmarks.

use criterion::{criterion_group, criterion_main, Criterion};
use soundcheck_metrics::{anomaly::AnomalyReport, level, modulation, spectral, timing};
use soundcheck_signals::{generate, SignalKind, SignalParams};
use std::hint::black_box;

fn bench_kernel(c: &mut Criterion) {
    let sine = generate(SignalKind::Sine, 48000.0, 1.0, 0.5, SignalParams::default())
        .expect("generate")
        .block;
    let tremolo = generate(SignalKind::Burst, 48000.0, 2.0, 0.5, SignalParams::default())
        .expect("generate")
        .block;

    c.bench_function("rms_1s", |b| b.iter(|| level::rms(black_box(&sine))));

    c.bench_function("anomaly_scan_1s", |b| {
        b.iter(|| AnomalyReport::scan(black_box(&sine)));
    });

    c.bench_function("thd_4096", |b| {
        b.iter(|| spectral::thd_percent(black_box(&sine), 48000.0, 1000.0));
    });

    c.bench_function("peak_frequency_1s", |b| {
        b.iter(|| spectral::peak_frequency(black_box(&sine), 48000.0));
    });

    c.bench_function("modulation_profile_2s", |b| {
        b.iter(|| modulation::modulation_profile(black_box(&tremolo), 48000.0));
    });

    c.bench_function("rt60_1s", |b| {
        b.iter(|| timing::rt60_seconds(black_box(&sine), 48000.0));
    });
}

criterion_group!(benches, bench_kernel);
criterion_main!(benches);
