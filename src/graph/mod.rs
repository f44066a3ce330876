//! Authored node graphs.
//!
//! A `NodeGraph` is the compiler's input: a flat, densely indexed list of
//! nodes whose inputs point at each other by index. Graphs are produced by an
//! editor or a higher-level language and may be partially invalid while being
//! edited; the compiler accepts them anyway and reports diagnostics.

/// The per-voice processor interface and the context handed to it.
pub mod node;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::runtime::automation::AutomationMode;

/// Where a node input reads its value from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum NodeInput {
    /// Output of another node in the same graph.
    Node(usize),
    /// Literal scalar.
    Constant(f32),
    /// Current note pitch (Hz).
    Pitch,
    /// 1 while the note is held, 0 once released.
    Gate,
    /// Current note expression.
    Expression,
    /// The 2x1 stereo frame fed into this voice (post-FX input).
    InputSamples,
    /// Named, host-automatable mod channel.
    Mod(String),
    /// Shared channel written by instruments or `SaveToChannel` nodes.
    Channel(String),
    /// Fragment input that was never bound; evaluates to the slot default.
    FragInput(String),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A processor type looked up in the registry by name.
    Processor(String),
    /// Assemble a `rows` x `cols` matrix from scalar element inputs.
    BuildMatrix { rows: usize, cols: usize },
    /// Pass the input through and latch it into the voice's alive flag.
    MarkAlive,
    /// Pass `value` through, storing it into a channel when `condition` > 0.
    SaveToChannel(String),
    /// The wave number bound to a named wavetable.
    UseWavetable(String),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub kind: NodeKind,
    pub inputs: Vec<NodeInput>,
}

impl GraphNode {
    pub fn processor(name: impl Into<String>, inputs: Vec<NodeInput>) -> Self {
        Self {
            kind: NodeKind::Processor(name.into()),
            inputs,
        }
    }

    pub fn intrinsic(kind: NodeKind, inputs: Vec<NodeInput>) -> Self {
        Self { kind, inputs }
    }
}

/// Declaration of a named mod channel.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ModDef {
    pub name: String,
    pub initial: f32,
    pub range: (f32, f32),
    pub mode: AutomationMode,
}

impl ModDef {
    pub fn new(name: impl Into<String>, initial: f32, mode: AutomationMode) -> Self {
        Self {
            name: name.into(),
            initial,
            range: (f32::NEG_INFINITY, f32::INFINITY),
            mode,
        }
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.range = (min, max);
        self
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeGraph {
    pub nodes: Vec<GraphNode>,
    /// Index of the node whose value is the voice output.
    pub out: usize,
    pub mods: Vec<ModDef>,
}

impl NodeGraph {
    pub fn new(nodes: Vec<GraphNode>, out: usize) -> Self {
        Self {
            nodes,
            out,
            mods: Vec::new(),
        }
    }

    pub fn with_mod(mut self, def: ModDef) -> Self {
        self.mods.push(def);
        self
    }
}
