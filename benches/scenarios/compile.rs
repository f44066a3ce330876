//! Compiler throughput. Not realtime, but patches get recompiled while the
//! user edits them.

use std::hint::black_box;

use criterion::Criterion;
use tonegraph::{compile, nodes::builtin_registry};

pub fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/compile");
    let registry = builtin_registry();

    for (name, graph) in [
        ("lead", super::lead()),
        ("supersaw", super::supersaw()),
        ("master", super::master()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| compile(black_box(&graph), &registry))
        });
    }

    group.finish();
}
