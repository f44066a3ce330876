//! Bytecode and the compiled-graph artifact.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{compiler::registry::DimBindings, graph::ModDef, matrix::Matrix};

/// One VM instruction. Operands are dense indices resolved at compile time;
/// the VM never looks anything up by name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Push a copy of constant-pool entry `k`.
    PushConstant(usize),
    PushPitch,
    PushExpression,
    PushGate,
    PushInputSamples,
    /// Push the mod referenced by slot `k`, or 0 if the voice has no such mod.
    GetMod(usize),
    /// Push the current value of channel slot `k`.
    GetChannel(usize),
    /// Pop a condition; if > 0 store the (kept) top into channel slot `k`.
    MaybeStoreToChannel(usize),
    /// Push the wave number bound to wave slot `k`.
    PushWaveNumber(usize),
    DropTop,
    GetRegister(usize),
    /// Store the top into register `r` without popping.
    TapRegister(usize),
    /// Pop a scalar and write it into the matrix now on top.
    SetMatrixEl { row: usize, col: usize },
    /// Broadcast the top to `rows` x `cols`.
    SmearMatrix { rows: usize, cols: usize },
    /// Latch the top (not popped) into the voice's alive flag.
    MarkLiveState,
    /// Pop `argc` operands and push the result of node instance `node`.
    CallNode { node: usize, argc: usize },
}

impl Command {
    /// `(operands required, net stack change)`
    pub fn stack_effect(&self) -> (usize, isize) {
        match *self {
            Command::PushConstant(_)
            | Command::PushPitch
            | Command::PushExpression
            | Command::PushGate
            | Command::PushInputSamples
            | Command::GetMod(_)
            | Command::GetChannel(_)
            | Command::PushWaveNumber(_)
            | Command::GetRegister(_) => (0, 1),
            Command::DropTop => (1, -1),
            Command::TapRegister(_) | Command::SmearMatrix { .. } | Command::MarkLiveState => (1, 0),
            Command::SetMatrixEl { .. } | Command::MaybeStoreToChannel(_) => (2, -1),
            Command::CallNode { argc, .. } => (argc, 1 - argc as isize),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PushConstant(k) => write!(f, "PUSH_CONSTANT {k}"),
            Command::PushPitch => write!(f, "PUSH_PITCH"),
            Command::PushExpression => write!(f, "PUSH_EXPRESSION"),
            Command::PushGate => write!(f, "PUSH_GATE"),
            Command::PushInputSamples => write!(f, "PUSH_INPUT_SAMPLES"),
            Command::GetMod(k) => write!(f, "GET_MOD {k}"),
            Command::GetChannel(k) => write!(f, "GET_CHANNEL {k}"),
            Command::MaybeStoreToChannel(k) => write!(f, "MAYBE_STORE_TO_CHANNEL {k}"),
            Command::PushWaveNumber(k) => write!(f, "PUSH_WAVE_NUMBER {k}"),
            Command::DropTop => write!(f, "DROP_TOP"),
            Command::GetRegister(r) => write!(f, "GET_REGISTER {r}"),
            Command::TapRegister(r) => write!(f, "TAP_REGISTER {r}"),
            Command::SetMatrixEl { row, col } => write!(f, "SET_MATRIX_EL {row} {col}"),
            Command::SmearMatrix { rows, cols } => write!(f, "SMEAR_MATRIX {rows} {cols}"),
            Command::MarkLiveState => write!(f, "MARK_LIVE_STATE"),
            Command::CallNode { node, argc } => write!(f, "CALL_NODE {node} {argc}"),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program(pub Vec<Command>);

impl Program {
    pub fn commands(&self) -> &[Command] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Simulate stack depth. Returns the maximum depth reached if every
    /// instruction has enough operands and exactly one value is left.
    pub fn check_stack_discipline(&self) -> Result<usize, ProgramError> {
        let mut depth = 0usize;
        let mut max = 0usize;
        for (pc, cmd) in self.0.iter().enumerate() {
            let (needs, delta) = cmd.stack_effect();
            if depth < needs {
                return Err(ProgramError::StackUnderflow { pc, depth, needs });
            }
            depth = (depth as isize + delta) as usize;
            max = max.max(depth);
        }
        if depth != 1 {
            return Err(ProgramError::UnbalancedResult { depth });
        }
        Ok(max)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, cmd) in self.0.iter().enumerate() {
            writeln!(f, "{pc:4}  {cmd}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    StackUnderflow { pc: usize, depth: usize, needs: usize },
    UnbalancedResult { depth: usize },
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::StackUnderflow { pc, depth, needs } => write!(
                f,
                "stack underflow at {pc}: depth {depth}, instruction needs {needs}"
            ),
            ProgramError::UnbalancedResult { depth } => {
                write!(f, "program leaves {depth} values on the stack, expected 1")
            }
        }
    }
}

impl std::error::Error for ProgramError {}

/// One runtime node instance: which processor to build and with what sizes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInstance {
    pub processor: String,
    pub dims: DimBindings,
}

/// Output of the compiler. Immutable once built; every Tone shares one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledGraph {
    pub program: Program,
    pub constants: Vec<Matrix>,
    /// Initial register contents, zeroed at each register's resolved shape.
    pub registers: Vec<Matrix>,
    /// Dense node-instance table; `CallNode { node }` indexes it.
    pub nodes: Vec<NodeInstance>,
    pub mods: Vec<ModDef>,
    /// Names behind `GetMod` slots.
    pub mod_refs: Vec<String>,
    /// Names behind `GetChannel` / `MaybeStoreToChannel` slots.
    pub channel_refs: Vec<String>,
    /// Names behind `PushWaveNumber` slots.
    pub wave_refs: Vec<String>,
    pub max_stack: usize,
}

impl CompiledGraph {
    /// Emits the voice input unchanged. Default post-FX chain.
    pub fn passthrough() -> Self {
        Self {
            program: Program(vec![Command::PushInputSamples]),
            max_stack: 1,
            ..Self::default()
        }
    }

    /// Emits constant zero.
    pub fn silence() -> Self {
        Self {
            program: Program(vec![Command::PushConstant(0)]),
            constants: vec![Matrix::scalar(0.0)],
            max_stack: 1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_check_reports_max_depth() {
        let program = Program(vec![
            Command::PushPitch,
            Command::PushConstant(0),
            Command::CallNode { node: 0, argc: 2 },
        ]);
        assert_eq!(program.check_stack_discipline(), Ok(2));
    }

    #[test]
    fn stack_check_rejects_underflow() {
        let program = Program(vec![Command::PushGate, Command::SetMatrixEl { row: 0, col: 0 }]);
        assert_eq!(
            program.check_stack_discipline(),
            Err(ProgramError::StackUnderflow {
                pc: 1,
                depth: 1,
                needs: 2
            })
        );
    }

    #[test]
    fn stack_check_rejects_leftovers() {
        let program = Program(vec![Command::PushGate, Command::PushPitch]);
        assert_eq!(
            program.check_stack_discipline(),
            Err(ProgramError::UnbalancedResult { depth: 2 })
        );
    }

    #[test]
    fn listing_uses_opcode_names() {
        let program = Program(vec![
            Command::CallNode { node: 1, argc: 0 },
            Command::TapRegister(0),
        ]);
        assert_eq!(program.to_string(), "   0  CALL_NODE 1 0\n   1  TAP_REGISTER 0\n");
    }

    #[test]
    fn builtin_graphs_are_well_formed() {
        assert_eq!(CompiledGraph::passthrough().program.check_stack_discipline(), Ok(1));
        assert_eq!(CompiledGraph::silence().program.check_stack_discipline(), Ok(1));
    }
}
