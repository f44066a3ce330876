//! Bytecode interpreter.
//!
//! One `ProgramState` per Tone. Stack slots, registers and the argument
//! window are matrices allocated once at their compiled shapes and then
//! reused, so a warmed-up voice never touches the allocator.

use crate::{
    compiler::{Command, CompiledGraph},
    graph::node::{AudioProcessor, ProcessCtx},
    matrix::Matrix,
    runtime::channels::Channels,
};

/// Everything outside the program that it can read this sample.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub pitch: f32,
    pub expression: f32,
    pub gate: f32,
    pub input: [f32; 2],
    /// Current mod value for each `GetMod` slot.
    pub mods: &'a [f32],
    /// Channel id for each channel slot.
    pub channels: &'a [usize],
    /// Wave number for each wave slot.
    pub waves: &'a [f32],
}

pub struct ProgramState {
    stack: Vec<Matrix>,
    registers: Vec<Matrix>,
    /// Result buffer for `CallNode`, swapped into the stack afterwards.
    scratch: Matrix,
    out: Matrix,
}

impl ProgramState {
    pub fn new(graph: &CompiledGraph) -> Self {
        Self {
            stack: (0..graph.max_stack.max(1)).map(|_| Matrix::new(2, 1)).collect(),
            registers: graph.registers.clone(),
            scratch: Matrix::new(2, 1),
            out: Matrix::new(2, 1),
        }
    }

    /// Output of the last `run`, always 2x1.
    #[inline]
    pub fn output(&self) -> &Matrix {
        &self.out
    }

    pub fn registers(&self) -> &[Matrix] {
        &self.registers
    }

    /// Execute `graph`'s program once. Returns the updated alive flag.
    ///
    /// # Panics
    ///
    /// On a malformed program (underflow, overflow of the compiled stack
    /// depth, or an out of range operand). The compiler never emits one.
    #[inline]
    pub fn run(
        &mut self,
        graph: &CompiledGraph,
        processors: &mut [Box<dyn AudioProcessor>],
        frame: &Frame,
        channels: &mut Channels,
        ctx: &ProcessCtx,
        mut alive: bool,
    ) -> bool {
        let stack = &mut self.stack;
        let mut sp = 0usize;

        for cmd in graph.program.commands() {
            match *cmd {
                Command::PushConstant(k) => {
                    stack[sp].copy_from(&graph.constants[k]);
                    sp += 1;
                }
                Command::PushPitch => {
                    stack[sp].set_scalar(frame.pitch);
                    sp += 1;
                }
                Command::PushExpression => {
                    stack[sp].set_scalar(frame.expression);
                    sp += 1;
                }
                Command::PushGate => {
                    stack[sp].set_scalar(frame.gate);
                    sp += 1;
                }
                Command::PushInputSamples => {
                    let slot = &mut stack[sp];
                    slot.resize(2, 1);
                    slot.put(0, 0, frame.input[0]);
                    slot.put(1, 0, frame.input[1]);
                    sp += 1;
                }
                Command::GetMod(k) => {
                    stack[sp].set_scalar(frame.mods[k]);
                    sp += 1;
                }
                Command::GetChannel(k) => {
                    stack[sp].copy_from(channels.get(frame.channels[k]));
                    sp += 1;
                }
                Command::MaybeStoreToChannel(k) => {
                    sp -= 1;
                    if stack[sp].to_scalar() > 0.0 {
                        channels.put(frame.channels[k], &stack[sp - 1]);
                    }
                }
                Command::PushWaveNumber(k) => {
                    stack[sp].set_scalar(frame.waves[k]);
                    sp += 1;
                }
                Command::DropTop => {
                    sp -= 1;
                }
                Command::GetRegister(r) => {
                    stack[sp].copy_from(&self.registers[r]);
                    sp += 1;
                }
                Command::TapRegister(r) => {
                    self.registers[r].copy_from(&stack[sp - 1]);
                }
                Command::SetMatrixEl { row, col } => {
                    sp -= 1;
                    let value = stack[sp].to_scalar();
                    stack[sp - 1].put(row, col, value);
                }
                Command::SmearMatrix { rows, cols } => {
                    stack[sp - 1].smear(rows, cols);
                }
                Command::MarkLiveState => {
                    alive = stack[sp - 1].to_scalar() != 0.0;
                }
                Command::CallNode { node, argc } => {
                    let base = sp - argc;
                    let args = &stack[base..sp];
                    let processor = &mut processors[node];
                    if ctx.start_of_block {
                        processor.update_control(args, ctx);
                    }
                    processor.update_sample(args, ctx, &mut self.scratch);
                    std::mem::swap(&mut stack[base], &mut self.scratch);
                    sp = base + 1;
                }
            }
        }

        assert_eq!(sp, 1, "program left {sp} values on the stack");
        self.out.copy_from(&stack[0]);
        if self.out.dims() != (2, 1) {
            self.out.smear(2, 1);
        }
        alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::Program,
        runtime::wave::WaveBank,
    };

    struct Sum;

    impl AudioProcessor for Sum {
        fn update_sample(&mut self, args: &[Matrix], _ctx: &ProcessCtx, out: &mut Matrix) {
            out.copy_from(&args[0]);
            for a in &args[1..] {
                out.apply_binary(a, |x, y| x + y);
            }
        }
    }

    fn frame<'a>(mods: &'a [f32], channels: &'a [usize]) -> Frame<'a> {
        Frame {
            pitch: 440.0,
            expression: 0.5,
            gate: 1.0,
            input: [0.1, 0.2],
            mods,
            channels,
            waves: &[],
        }
    }

    fn graph(commands: Vec<Command>, constants: Vec<Matrix>, registers: usize) -> CompiledGraph {
        let program = Program(commands);
        let max_stack = program.check_stack_discipline().unwrap();
        CompiledGraph {
            program,
            constants,
            registers: vec![Matrix::new(1, 1); registers],
            max_stack,
            ..CompiledGraph::default()
        }
    }

    #[test]
    fn call_node_sees_arguments_in_push_order() {
        let g = graph(
            vec![
                Command::PushPitch,
                Command::PushConstant(0),
                Command::CallNode { node: 0, argc: 2 },
            ],
            vec![Matrix::scalar(2.0)],
            0,
        );
        let mut procs: Vec<Box<dyn AudioProcessor>> = vec![Box::new(Sum)];
        let mut state = ProgramState::new(&g);
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 48_000.0, &waves);
        let alive = state.run(&g, &mut procs, &frame(&[], &[]), &mut Channels::new(), &ctx, true);
        assert!(alive);
        assert_eq!(state.output().as_stereo(), [442.0, 442.0]);
    }

    #[test]
    fn register_round_trip() {
        let g = graph(
            vec![
                Command::PushExpression,
                Command::TapRegister(0),
                Command::GetRegister(0),
                Command::CallNode { node: 0, argc: 2 },
            ],
            vec![],
            1,
        );
        let mut procs: Vec<Box<dyn AudioProcessor>> = vec![Box::new(Sum)];
        let mut state = ProgramState::new(&g);
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 48_000.0, &waves);
        state.run(&g, &mut procs, &frame(&[], &[]), &mut Channels::new(), &ctx, true);
        assert_eq!(state.output().to_scalar(), 1.0);
        assert_eq!(state.registers()[0].to_scalar(), 0.5);
    }

    #[test]
    fn build_smear_and_store() {
        let g = graph(
            vec![
                Command::PushConstant(0),
                Command::PushGate,
                Command::SetMatrixEl { row: 1, col: 0 },
                Command::PushConstant(1),
                Command::MaybeStoreToChannel(0),
                Command::PushInputSamples,
                Command::DropTop,
            ],
            vec![Matrix::column(&[0.25, 0.0]), Matrix::scalar(1.0)],
            0,
        );
        let mut channels = Channels::new();
        let bus = channels.resolve("bus");
        let mut state = ProgramState::new(&g);
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 48_000.0, &waves);
        state.run(&g, &mut [], &frame(&[], &[bus]), &mut channels, &ctx, true);
        assert_eq!(state.output().as_stereo(), [0.25, 1.0]);
        assert_eq!(channels.get(bus).as_stereo(), [0.25, 1.0]);
    }

    #[test]
    fn mark_live_state_reads_without_popping() {
        let g = graph(
            vec![Command::GetMod(0), Command::MarkLiveState],
            vec![],
            0,
        );
        let mut state = ProgramState::new(&g);
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 48_000.0, &waves);
        let mut channels = Channels::new();
        assert!(!state.run(&g, &mut [], &frame(&[0.0], &[]), &mut channels, &ctx, true));
        assert!(state.run(&g, &mut [], &frame(&[0.3], &[]), &mut channels, &ctx, false));
        assert_eq!(state.output().as_stereo(), [0.3, 0.3]);
    }

    #[test]
    fn scalar_output_is_smeared_to_stereo() {
        let g = graph(
            vec![Command::PushConstant(0), Command::SmearMatrix { rows: 3, cols: 3 }],
            vec![Matrix::scalar(0.7)],
            0,
        );
        let mut state = ProgramState::new(&g);
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 48_000.0, &waves);
        state.run(&g, &mut [], &frame(&[], &[]), &mut Channels::new(), &ctx, true);
        assert_eq!(state.output().dims(), (2, 1));
        assert_eq!(state.output().as_stereo(), [0.7, 0.7]);
    }

    #[test]
    #[should_panic]
    fn malformed_program_panics() {
        let g = CompiledGraph {
            program: Program(vec![Command::DropTop]),
            max_stack: 1,
            ..CompiledGraph::default()
        };
        let mut state = ProgramState::new(&g);
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 48_000.0, &waves);
        state.run(&g, &mut [], &frame(&[], &[]), &mut Channels::new(), &ctx, true);
    }
}
