//! Bytecode emission.
//!
//! Depth-first from the output node, then every node nothing references (their
//! results are dropped, their side effects kept). Multiply-referenced nodes
//! are computed once per sample: the first emission taps the value into a
//! register and every later reference reads it back.

use crate::{
    compiler::{
        diag::{Axis, Diagnostic, ErrorReason},
        dims::Resolution,
        program::{Command, NodeInstance, Program},
        Signature,
    },
    graph::{NodeInput, NodeKind},
    matrix::Matrix,
};

/// Node reference bookkeeping from a single pass over all inputs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct References {
    /// Referenced at least once (the output counts as one reference).
    pub seen: Vec<bool>,
    /// Register for nodes referenced more than once, numbered in the order
    /// their second reference was found.
    pub register: Vec<Option<usize>>,
    pub register_count: usize,
}

pub(crate) fn find_duplicates(inputs: &[Vec<NodeInput>], out: usize) -> References {
    let count = inputs.len();
    let mut seen = vec![false; count];
    let mut register = vec![None; count];
    let mut register_count = 0;
    seen[out] = true;
    for node_inputs in inputs {
        for input in node_inputs {
            if let NodeInput::Node(used) = *input {
                if seen[used] && register[used].is_none() {
                    register[used] = Some(register_count);
                    register_count += 1;
                }
                seen[used] = true;
            }
        }
    }
    References {
        seen,
        register,
        register_count,
    }
}

pub(crate) struct Emitted {
    pub program: Program,
    pub constants: Vec<Matrix>,
    pub registers: Vec<Matrix>,
    pub nodes: Vec<NodeInstance>,
    pub mod_refs: Vec<String>,
    pub channel_refs: Vec<String>,
    pub wave_refs: Vec<String>,
}

pub(crate) struct Codegen<'a> {
    kinds: &'a [NodeKind],
    inputs: &'a [Vec<NodeInput>],
    signatures: &'a [Signature],
    resolution: &'a Resolution,
    references: &'a References,
    diagnostics: &'a mut Vec<Diagnostic>,
    visited: Vec<bool>,
    code: Vec<Command>,
    constants: Vec<Matrix>,
    mod_refs: Vec<String>,
    channel_refs: Vec<String>,
    wave_refs: Vec<String>,
}

impl<'a> Codegen<'a> {
    pub fn new(
        kinds: &'a [NodeKind],
        inputs: &'a [Vec<NodeInput>],
        signatures: &'a [Signature],
        resolution: &'a Resolution,
        references: &'a References,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            kinds,
            inputs,
            signatures,
            resolution,
            references,
            diagnostics,
            visited: vec![false; kinds.len()],
            code: Vec::new(),
            constants: Vec::new(),
            mod_refs: Vec::new(),
            channel_refs: Vec::new(),
            wave_refs: Vec::new(),
        }
    }

    pub fn run(mut self, out: usize) -> Emitted {
        self.emit_node(out);
        for node in 0..self.kinds.len() {
            if !self.references.seen[node] {
                self.emit_node(node);
                self.code.push(Command::DropTop);
            }
        }
        let (nodes, registers) = self.renumber();
        Emitted {
            program: Program(self.code),
            constants: self.constants,
            registers,
            nodes,
            mod_refs: self.mod_refs,
            channel_refs: self.channel_refs,
            wave_refs: self.wave_refs,
        }
    }

    fn emit_node(&mut self, node: usize) {
        if self.visited[node] {
            match self.references.register[node] {
                Some(r) => self.code.push(Command::GetRegister(r)),
                None => panic!("node {node} reached twice without a register"),
            }
            return;
        }
        self.visited[node] = true;

        let (kinds, all_inputs) = (self.kinds, self.inputs);
        let inputs = &all_inputs[node];
        match &kinds[node] {
            NodeKind::Processor(_) => {
                for (slot, input) in inputs.iter().enumerate() {
                    self.emit_input(input, node, slot);
                }
                self.code.push(Command::CallNode {
                    node,
                    argc: inputs.len(),
                });
            }
            NodeKind::BuildMatrix { .. } => self.emit_build_matrix(node),
            NodeKind::MarkAlive => {
                self.emit_input(&inputs[0], node, 0);
                self.code.push(Command::MarkLiveState);
            }
            NodeKind::SaveToChannel(name) => {
                self.emit_input(&inputs[0], node, 0);
                self.emit_input(&inputs[1], node, 1);
                let slot = intern(&mut self.channel_refs, name);
                self.code.push(Command::MaybeStoreToChannel(slot));
            }
            NodeKind::UseWavetable(name) => {
                let slot = intern(&mut self.wave_refs, name);
                self.code.push(Command::PushWaveNumber(slot));
            }
        }

        if let Some(r) = self.references.register[node] {
            self.code.push(Command::TapRegister(r));
        }
    }

    /// Constant elements are baked into the pushed matrix; the rest are
    /// computed and written in with `SET_MATRIX_EL`.
    fn emit_build_matrix(&mut self, node: usize) {
        let [rows, cols] = self
            .resolution
            .concrete(node, &self.signatures[node].output);
        let all_inputs = self.inputs;
        let inputs = &all_inputs[node];
        let mut baked = Matrix::new(rows, cols);
        let mut computed = Vec::new();
        for (slot, input) in inputs.iter().enumerate() {
            let (row, col) = (slot / cols, slot % cols);
            match input {
                NodeInput::Constant(v) => baked.put(row, col, *v),
                NodeInput::FragInput(_) => {
                    self.diagnostics.push(Diagnostic::new(
                        node,
                        slot,
                        Axis::Rows,
                        ErrorReason::UnusedFragInput,
                    ));
                    baked.put(row, col, self.signatures[node].inputs[slot].default);
                }
                _ => computed.push(slot),
            }
        }
        let k = self.intern_constant(baked);
        self.code.push(Command::PushConstant(k));
        for slot in computed {
            self.emit_input(&inputs[slot], node, slot);
            self.code.push(Command::SetMatrixEl {
                row: slot / cols,
                col: slot % cols,
            });
        }
    }

    fn emit_input(&mut self, input: &NodeInput, consumer: usize, slot: usize) {
        let smear = self.smear_target(consumer, slot);
        let simple = match input {
            NodeInput::Node(source) => {
                self.emit_node(*source);
                None
            }
            NodeInput::Constant(v) => {
                self.push_scalar_constant(*v, smear);
                return;
            }
            NodeInput::FragInput(_) => {
                self.diagnostics.push(Diagnostic::new(
                    consumer,
                    slot,
                    Axis::Rows,
                    ErrorReason::UnusedFragInput,
                ));
                let default = self.signatures[consumer].inputs[slot].default;
                self.push_scalar_constant(default, smear);
                return;
            }
            NodeInput::Pitch => Some(Command::PushPitch),
            NodeInput::Gate => Some(Command::PushGate),
            NodeInput::Expression => Some(Command::PushExpression),
            NodeInput::InputSamples => Some(Command::PushInputSamples),
            NodeInput::Mod(name) => Some(Command::GetMod(intern(&mut self.mod_refs, name))),
            NodeInput::Channel(name) => {
                Some(Command::GetChannel(intern(&mut self.channel_refs, name)))
            }
        };
        if let Some(cmd) = simple {
            self.code.push(cmd);
        }
        if let Some([rows, cols]) = smear {
            self.code.push(Command::SmearMatrix { rows, cols });
        }
    }

    fn smear_target(&self, consumer: usize, slot: usize) -> Option<[usize; 2]> {
        self.resolution
            .needs_smear(consumer, slot)
            .then(|| {
                self.resolution
                    .concrete(consumer, &self.signatures[consumer].inputs[slot].dims)
            })
    }

    /// Literal inputs are broadcast at compile time.
    fn push_scalar_constant(&mut self, value: f32, smear: Option<[usize; 2]>) {
        let mut m = Matrix::scalar(value);
        if let Some([rows, cols]) = smear {
            m.smear(rows, cols);
        }
        let k = self.intern_constant(m);
        self.code.push(Command::PushConstant(k));
    }

    fn intern_constant(&mut self, value: Matrix) -> usize {
        match self.constants.iter().position(|c| *c == value) {
            Some(k) => k,
            None => {
                self.constants.push(value);
                self.constants.len() - 1
            }
        }
    }

    /// Make `CallNode` operands dense, dropping nodes that were never
    /// called, and size the registers.
    fn renumber(&mut self) -> (Vec<NodeInstance>, Vec<Matrix>) {
        let mut called = vec![false; self.kinds.len()];
        for cmd in &self.code {
            if let Command::CallNode { node, .. } = *cmd {
                called[node] = true;
            }
        }
        let mut instances = Vec::new();
        let mut index = vec![usize::MAX; self.kinds.len()];
        for (node, &used) in called.iter().enumerate() {
            if used {
                if let NodeKind::Processor(name) = &self.kinds[node] {
                    index[node] = instances.len();
                    instances.push(NodeInstance {
                        processor: name.clone(),
                        dims: self.resolution.bindings[node].clone(),
                    });
                }
            }
        }
        for cmd in &mut self.code {
            if let Command::CallNode { node, .. } = cmd {
                *node = index[*node];
            }
        }

        let mut registers = vec![Matrix::scalar(0.0); self.references.register_count];
        for (node, reg) in self.references.register.iter().enumerate() {
            if let Some(r) = *reg {
                let [rows, cols] = self
                    .resolution
                    .concrete(node, &self.signatures[node].output);
                registers[r] = Matrix::new(rows, cols);
            }
        }
        (instances, registers)
    }
}

fn intern(table: &mut Vec<String>, name: &str) -> usize {
    match table.iter().position(|n| n == name) {
        Some(i) => i,
        None => {
            table.push(name.to_string());
            table.len() - 1
        }
    }
}
