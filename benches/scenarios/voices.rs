//! Whole-synth rendering: chords of compiled voices through post-FX.

use std::{hint::black_box, sync::Arc};

use criterion::{BenchmarkId, Criterion};
use tonegraph::{compile, nodes::builtin_registry, NodeGraph, Synth, SynthConfig};

use crate::BLOCK_SIZES;

fn synth(instrument: &NodeGraph, voices: u32) -> Synth {
    let registry = builtin_registry();
    let mut synth = Synth::new(SynthConfig::default());
    let (graph, _) = compile(instrument, &registry).expect("instrument compiles");
    synth
        .set_instrument(0, "bench", Arc::new(graph))
        .expect("instrument installs");
    let (fx, _) = compile(&super::master(), &registry).expect("post-fx compiles");
    synth.set_post_fx(Arc::new(fx)).expect("post-fx installs");
    for id in 0..voices {
        synth
            .note_on(id, 0, 110.0 * (1.0 + id as f32 * 0.25), 1.0)
            .expect("note starts");
    }
    synth
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // Baseline: what one typical voice costs end to end.
        let mut single = synth(&super::lead(), 1);
        group.bench_with_input(BenchmarkId::new("lead_x1", size), &size, |b, _| {
            b.iter(|| single.process(black_box(&mut left), black_box(&mut right)))
        });

        let mut chord = synth(&super::lead(), 8);
        group.bench_with_input(BenchmarkId::new("lead_x8", size), &size, |b, _| {
            b.iter(|| chord.process(black_box(&mut left), black_box(&mut right)))
        });

        // Registers and a 2x1 filter per voice.
        let mut wide = synth(&super::supersaw(), 8);
        group.bench_with_input(BenchmarkId::new("supersaw_x8", size), &size, |b, _| {
            b.iter(|| wide.process(black_box(&mut left), black_box(&mut right)))
        });
    }

    group.finish();
}
