//! Demo patches played by the binary.

use clap::ValueEnum;
use tonegraph::{
    runtime::AutomationMode, GraphNode, ModDef, NodeGraph, NodeInput, NodeKind,
};

use NodeInput::{Constant, Expression, Gate, Node, Pitch};

/// Wavetable the bell patch plays.
pub const BELL_WAVE: &str = "bell";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatchName {
    /// Filtered saw with an ADSR
    Lead,
    /// Wavetable bell, long release
    Bell,
    /// The post-FX chain: a low-pass over the instrument mix
    Master,
}

impl PatchName {
    pub fn graph(self) -> NodeGraph {
        match self {
            PatchName::Lead => lead(),
            PatchName::Bell => bell(),
            PatchName::Master => master(),
        }
    }
}

fn envelope(attack: f32, decay: f32, sustain: f32, release: f32) -> GraphNode {
    GraphNode::processor(
        "envelope",
        vec![
            Gate,
            Constant(attack),
            Constant(decay),
            Constant(sustain),
            Constant(release),
        ],
    )
}

/// Saw through a resonant low-pass, shaped by an envelope that also keeps
/// the note alive through its release.
pub fn lead() -> NodeGraph {
    NodeGraph::new(
        vec![
            GraphNode::processor("saw", vec![Pitch]),
            envelope(0.005, 0.2, 0.6, 0.35),
            GraphNode::intrinsic(NodeKind::MarkAlive, vec![Node(1)]),
            GraphNode::processor(
                "filter",
                vec![
                    Node(0),
                    NodeInput::Mod("cutoff".into()),
                    Constant(0.4),
                    Constant(0.0),
                ],
            ),
            GraphNode::processor("mul", vec![Node(3), Node(2)]),
            GraphNode::processor("mul", vec![Node(4), Expression]),
            GraphNode::processor("pan", vec![Node(5), Constant(-0.3)]),
        ],
        6,
    )
    .with_mod(
        ModDef::new("cutoff", 2_400.0, AutomationMode::Exponential).with_range(60.0, 12_000.0),
    )
}

/// Wavetable oscillator read at the note pitch.
pub fn bell() -> NodeGraph {
    NodeGraph::new(
        vec![
            GraphNode::intrinsic(NodeKind::UseWavetable(BELL_WAVE.into()), vec![]),
            GraphNode::processor("osc", vec![Pitch, Node(0), Constant(0.0)]),
            envelope(0.002, 0.8, 0.0, 1.2),
            GraphNode::intrinsic(NodeKind::MarkAlive, vec![Node(2)]),
            GraphNode::processor("mul", vec![Node(1), Node(3)]),
            GraphNode::processor("mul", vec![Node(4), Expression]),
            GraphNode::processor("pan", vec![Node(5), Constant(0.3)]),
        ],
        6,
    )
}

/// Stereo low-pass over the mix. The `tone` mod sets its cutoff.
pub fn master() -> NodeGraph {
    NodeGraph::new(
        vec![GraphNode::processor(
            "filter",
            vec![
                NodeInput::InputSamples,
                NodeInput::Mod("tone".into()),
                Constant(0.0),
                Constant(0.0),
            ],
        )],
        0,
    )
    .with_mod(ModDef::new("tone", 9_000.0, AutomationMode::Exponential).with_range(200.0, 18_000.0))
}

/// One cycle of a few inharmonic-ish partials.
pub fn bell_wave(len: usize) -> Vec<f32> {
    const PARTIALS: [(f32, f32); 4] = [(1.0, 1.0), (2.0, 0.5), (3.0, 0.3), (5.0, 0.15)];
    let norm: f32 = PARTIALS.iter().map(|(_, a)| a).sum();
    (0..len)
        .map(|i| {
            let phase = i as f32 / len as f32;
            PARTIALS
                .iter()
                .map(|(k, a)| a * (std::f32::consts::TAU * k * phase).sin())
                .sum::<f32>()
                / norm
        })
        .collect()
}
