//! Real-world scenario benchmarks.
//!
//! Patches shaped like the ones a host would author: oscillator, filter and
//! envelope chains, shared subexpressions, a post-FX chain over the mix.

mod compile;
mod voices;

pub use compile::bench_compile;
pub use voices::bench_voices;

use tonegraph::{
    runtime::AutomationMode, GraphNode, ModDef, NodeGraph, NodeInput, NodeKind,
};

use NodeInput::{Constant, Expression, Gate, Node, Pitch};

/// saw -> filter, times an envelope that also keeps the note alive.
pub fn lead() -> NodeGraph {
    NodeGraph::new(
        vec![
            GraphNode::processor("saw", vec![Pitch]),
            GraphNode::processor(
                "envelope",
                vec![Gate, Constant(0.005), Constant(0.1), Constant(0.6), Constant(0.2)],
            ),
            GraphNode::intrinsic(NodeKind::MarkAlive, vec![Node(1)]),
            GraphNode::processor(
                "filter",
                vec![Node(0), NodeInput::Mod("cutoff".into()), Constant(0.5), Constant(0.0)],
            ),
            GraphNode::processor("mul", vec![Node(3), Node(2)]),
            GraphNode::processor("mul", vec![Node(4), Expression]),
            GraphNode::processor("pan", vec![Node(5), Constant(0.0)]),
        ],
        6,
    )
    .with_mod(ModDef::new("cutoff", 2_000.0, AutomationMode::Exponential))
}

/// Three detuned saws summed, built so the pitch product is shared.
pub fn supersaw() -> NodeGraph {
    NodeGraph::new(
        vec![
            GraphNode::processor("mul", vec![Pitch, Constant(1.0)]),
            GraphNode::processor("saw", vec![Node(0)]),
            GraphNode::processor("mul", vec![Node(0), Constant(1.007)]),
            GraphNode::processor("saw", vec![Node(2)]),
            GraphNode::processor("mul", vec![Node(0), Constant(0.993)]),
            GraphNode::processor("saw", vec![Node(4)]),
            GraphNode::processor("add", vec![Node(1), Node(3)]),
            GraphNode::processor("add", vec![Node(6), Node(5)]),
            GraphNode::intrinsic(
                NodeKind::BuildMatrix { rows: 2, cols: 1 },
                vec![Node(7), Node(7)],
            ),
            GraphNode::processor(
                "filter",
                vec![Node(8), Constant(3_000.0), Constant(0.2), Constant(0.0)],
            ),
            GraphNode::processor(
                "envelope",
                vec![Gate, Constant(0.02), Constant(0.3), Constant(0.8), Constant(0.4)],
            ),
            GraphNode::intrinsic(NodeKind::MarkAlive, vec![Node(10)]),
            GraphNode::processor("mul", vec![Node(9), Node(11)]),
        ],
        12,
    )
}

/// Stereo low-pass over the mix.
pub fn master() -> NodeGraph {
    NodeGraph::new(
        vec![GraphNode::processor(
            "filter",
            vec![NodeInput::InputSamples, Constant(8_000.0), Constant(0.0), Constant(0.0)],
        )],
        0,
    )
}
