//! Benchmarks for the graph compiler, the VM and whole-synth rendering.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - primitives/*  DSP building blocks the built-in nodes wrap
//!   - scenarios/*   Compiling patches and rendering chords through the synth

use criterion::{criterion_group, criterion_main};

mod primitives;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    primitives::bench_filter,
    primitives::bench_envelope,
    scenarios::bench_compile,
    scenarios::bench_voices,
);
criterion_main!(benches);
