//! Benchmarks for low-level DSP primitives.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tonegraph::dsp::{AdsrParams, Envelope, FilterType, SvFilter, SvfCoefficients};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives/filter");
    let coefficients = SvfCoefficients::new(1_000.0, 0.5, SAMPLE_RATE);

    for &size in BLOCK_SIZES {
        // Sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut buffer = input.clone();

        for (name, filter_type) in [
            ("lowpass", FilterType::LowPass),
            ("highpass", FilterType::HighPass),
            ("bandpass", FilterType::BandPass),
            ("notch", FilterType::Notch),
        ] {
            let mut filter = SvFilter::new();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for (out, &x) in buffer.iter_mut().zip(&input) {
                        *out = filter.tick(black_box(x), &coefficients, filter_type);
                    }
                })
            });
        }

        // Coefficients recomputed every sample, as a modulated cutoff would.
        let mut filter = SvFilter::new();
        group.bench_with_input(BenchmarkId::new("lowpass_modulated", size), &size, |b, _| {
            b.iter(|| {
                for (i, (out, &x)) in buffer.iter_mut().zip(&input).enumerate() {
                    let c = SvfCoefficients::new(500.0 + i as f32, 0.5, SAMPLE_RATE);
                    *out = filter.tick(black_box(x), &c, FilterType::LowPass);
                }
            })
        });
    }

    group.finish();
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let mut env = Envelope::new(AdsrParams::new(0.01, 0.1, 0.7, 0.3));

        group.bench_with_input(BenchmarkId::new("held", size), &size, |b, _| {
            b.iter(|| {
                for out in buffer.iter_mut() {
                    *out = env.next_sample(black_box(1.0), SAMPLE_RATE);
                }
            })
        });
    }

    group.finish();
}
