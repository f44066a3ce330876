//! NodeGraph -> CompiledGraph.
//!
//! Compilation runs in four passes over index-keyed arrays:
//!
//! 1. signatures: every node's declared input/output shapes, from the
//!    registry or from the intrinsic's fixed definition; input lists are
//!    padded or truncated to match
//! 2. duplicate detection: which nodes are referenced more than once
//! 3. dimension resolution ([`dims`])
//! 4. code generation ([`codegen`])
//!
//! Only structural problems that leave nothing to run are errors. Everything
//! else is reported as a [`Diagnostic`] next to a runnable program.

pub mod codegen;
pub mod diag;
pub(crate) mod dims;
pub mod program;
pub mod registry;

use std::fmt;

use tracing::debug;

pub use diag::{Axis, Diagnostic, ErrorReason};
pub use program::{Command, CompiledGraph, NodeInstance, Program, ProgramError};
pub use registry::{
    Dim, DimBindings, Dims, NodeInputDef, ProcessorDef, ProcessorFactory, ProcessorRegistry,
};

use crate::graph::{NodeGraph, NodeInput, NodeKind};
use codegen::{find_duplicates, Codegen};
use dims::resolve_dimensions;
use registry::{scalar_dims, var_dims};

/// Declared shapes of one node, whatever its kind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Signature {
    pub inputs: Vec<NodeInputDef>,
    pub output: Dims,
}

impl Signature {
    fn of(kind: &NodeKind, registry: &ProcessorRegistry, node: usize) -> Result<Self, CompileError> {
        Ok(match kind {
            NodeKind::Processor(name) => {
                let def = registry
                    .get(name)
                    .ok_or_else(|| CompileError::UnknownProcessor {
                        node,
                        name: name.clone(),
                    })?;
                Signature {
                    inputs: def.inputs.clone(),
                    output: def.output.clone(),
                }
            }
            NodeKind::BuildMatrix { rows, cols } => {
                let (rows, cols) = ((*rows).max(1), (*cols).max(1));
                Signature {
                    inputs: (0..rows * cols)
                        .map(|i| NodeInputDef::scalar(&format!("e{i}"), 0.0))
                        .collect(),
                    output: [Dim::Fixed(rows as u32), Dim::Fixed(cols as u32)],
                }
            }
            NodeKind::MarkAlive => Signature {
                inputs: vec![NodeInputDef::new("alive", var_dims("M", "N"), 0.0)],
                output: var_dims("M", "N"),
            },
            NodeKind::SaveToChannel(_) => Signature {
                inputs: vec![
                    NodeInputDef::new("value", var_dims("M", "N"), 0.0),
                    NodeInputDef::scalar("condition", 1.0),
                ],
                output: var_dims("M", "N"),
            },
            NodeKind::UseWavetable(_) => Signature {
                inputs: Vec::new(),
                output: scalar_dims(),
            },
        })
    }
}

/// Structural problems that leave no program to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    UnknownProcessor { node: usize, name: String },
    OutputOutOfRange { out: usize, nodes: usize },
    DanglingReference { node: usize, input: usize, target: usize },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownProcessor { node, name } => {
                write!(f, "node {node}: unknown processor '{name}'")
            }
            CompileError::OutputOutOfRange { out, nodes } => {
                write!(f, "output node {out} out of range (graph has {nodes} nodes)")
            }
            CompileError::DanglingReference {
                node,
                input,
                target,
            } => write!(f, "node {node} input {input} refers to missing node {target}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Compile `graph` against `registry`.
///
/// The returned program always satisfies [`Program::check_stack_discipline`].
pub fn compile(
    graph: &NodeGraph,
    registry: &ProcessorRegistry,
) -> Result<(CompiledGraph, Vec<Diagnostic>), CompileError> {
    let count = graph.nodes.len();
    if graph.out >= count {
        return Err(CompileError::OutputOutOfRange {
            out: graph.out,
            nodes: count,
        });
    }

    let mut diagnostics = Vec::new();
    let (signatures, inputs) = declare(graph, registry, &mut diagnostics)?;

    let kinds: Vec<NodeKind> = graph.nodes.iter().map(|n| n.kind.clone()).collect();
    let references = find_duplicates(&inputs, graph.out);
    let resolution = resolve_dimensions(&signatures, &inputs, &mut diagnostics);
    let emitted = Codegen::new(
        &kinds,
        &inputs,
        &signatures,
        &resolution,
        &references,
        &mut diagnostics,
    )
    .run(graph.out);

    let max_stack = match emitted.program.check_stack_discipline() {
        Ok(depth) => depth,
        Err(e) => panic!("compiler emitted a malformed program: {e}\n{}", emitted.program),
    };

    debug!(
        nodes = count,
        instances = emitted.nodes.len(),
        commands = emitted.program.len(),
        registers = emitted.registers.len(),
        constants = emitted.constants.len(),
        diagnostics = diagnostics.len(),
        "compiled graph"
    );
    for d in &diagnostics {
        debug!("{d}");
    }

    let compiled = CompiledGraph {
        program: emitted.program,
        constants: emitted.constants,
        registers: emitted.registers,
        nodes: emitted.nodes,
        mods: graph.mods.clone(),
        mod_refs: emitted.mod_refs,
        channel_refs: emitted.channel_refs,
        wave_refs: emitted.wave_refs,
        max_stack,
    };
    Ok((compiled, diagnostics))
}

/// Pass 1: signatures, and input lists padded or truncated to match them.
fn declare(
    graph: &NodeGraph,
    registry: &ProcessorRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(Vec<Signature>, Vec<Vec<NodeInput>>), CompileError> {
    let count = graph.nodes.len();
    let mut signatures = Vec::with_capacity(count);
    let mut inputs = Vec::with_capacity(count);
    for (node, gn) in graph.nodes.iter().enumerate() {
        for (input, i) in gn.inputs.iter().enumerate() {
            if let NodeInput::Node(target) = *i {
                if target >= count {
                    return Err(CompileError::DanglingReference {
                        node,
                        input,
                        target,
                    });
                }
            }
        }

        let sig = Signature::of(&gn.kind, registry, node)?;
        let mut node_inputs = gn.inputs.clone();
        if node_inputs.len() != sig.inputs.len() {
            diagnostics.push(Diagnostic::new(node, 0, Axis::Rows, ErrorReason::WrongNoOfArgs));
            node_inputs.resize(sig.inputs.len(), NodeInput::Constant(0.0));
        }
        signatures.push(sig);
        inputs.push(node_inputs);
    }
    Ok((signatures, inputs))
}
