//! Elementwise arithmetic and panning.

use crate::{
    graph::node::{AudioProcessor, ProcessCtx},
    matrix::Matrix,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Mul,
}

/// `[M, N] op [M, N] -> [M, N]`. Scalar operands broadcast.
#[derive(Debug, Clone, Copy)]
pub struct Elementwise {
    op: BinaryOp,
}

impl Elementwise {
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }
}

impl AudioProcessor for Elementwise {
    #[inline]
    fn update_sample(&mut self, args: &[Matrix], _ctx: &ProcessCtx, out: &mut Matrix) {
        out.copy_from(&args[0]);
        match self.op {
            BinaryOp::Add => out.apply_binary(&args[1], |a, b| a + b),
            BinaryOp::Mul => out.apply_binary(&args[1], |a, b| a * b),
        };
    }
}

/// Equal-power pan of a scalar into a stereo frame. `pan` runs from -1
/// (left) to 1 (right).
#[derive(Debug, Clone, Copy, Default)]
pub struct Pan;

impl AudioProcessor for Pan {
    #[inline]
    fn update_sample(&mut self, args: &[Matrix], _ctx: &ProcessCtx, out: &mut Matrix) {
        let signal = args[0].to_scalar();
        let pan = args[1].to_scalar().clamp(-1.0, 1.0);
        let angle = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
        out.resize(2, 1);
        out.put(0, 0, signal * angle.cos());
        out.put(1, 0, signal * angle.sin());
    }
}
