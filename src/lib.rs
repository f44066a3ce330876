pub mod compiler; // NodeGraph -> bytecode
pub mod dsp;
pub mod graph; // Authored graphs and the processor interface
pub mod matrix;
pub mod nodes; // Built-in processor library
pub mod runtime; // VM, automation, channels, waves
pub mod synth; // Voices, instruments and the mixer

pub use compiler::{compile, CompileError, CompiledGraph, Diagnostic, ProcessorRegistry};
pub use graph::{GraphNode, ModDef, NodeGraph, NodeInput, NodeKind};
pub use matrix::Matrix;
pub use synth::{Synth, SynthConfig, SynthMessage};

pub const MAX_BLOCK_SIZE: usize = 2048;
