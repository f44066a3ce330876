//! Compile diagnostics.
//!
//! Diagnostics are findings, not failures: the compiler always returns a
//! runnable program next to them so a half-edited graph keeps playing.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    /// Two concrete sizes disagree and neither can be broadcast.
    DimMismatch,
    /// A size variable had no concrete evidence and was defaulted to 1.
    Unbound,
    /// A fragment input was left unconnected.
    UnusedFragInput,
    /// The node's input list length disagrees with its definition.
    WrongNoOfArgs,
}

impl ErrorReason {
    pub fn code(self) -> &'static str {
        match self {
            ErrorReason::DimMismatch => "DIM_MISMATCH",
            ErrorReason::Unbound => "UNBOUND",
            ErrorReason::UnusedFragInput => "UNUSED_FRAG_INPUT",
            ErrorReason::WrongNoOfArgs => "WRONG_NO_OF_ARGS",
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Rows = 0,
    Cols = 1,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Rows, Axis::Cols];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One finding, located at `node`'s input `input` on `dim`.
///
/// `input` is `None` when the finding concerns the node's own output shape.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub node: usize,
    pub input: Option<usize>,
    pub dim: Axis,
    pub reason: ErrorReason,
}

impl Diagnostic {
    pub fn new(node: usize, input: usize, dim: Axis, reason: ErrorReason) -> Self {
        Self {
            node,
            input: Some(input),
            dim,
            reason,
        }
    }

    pub fn on_output(node: usize, dim: Axis, reason: ErrorReason) -> Self {
        Self {
            node,
            input: None,
            dim,
            reason,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim = match self.dim {
            Axis::Rows => "rows",
            Axis::Cols => "cols",
        };
        match self.input {
            Some(input) => write!(
                f,
                "warning[{}]: node {} input {} ({})",
                self.reason, self.node, input, dim
            ),
            None => write!(
                f,
                "warning[{}]: node {} output ({})",
                self.reason, self.node, dim
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_input_slot() {
        let d = Diagnostic::new(3, 1, Axis::Cols, ErrorReason::DimMismatch);
        assert_eq!(
            d.to_string(),
            "warning[DIM_MISMATCH]: node 3 input 1 (cols)"
        );
    }

    #[test]
    fn display_names_output() {
        let d = Diagnostic::on_output(0, Axis::Rows, ErrorReason::Unbound);
        assert_eq!(d.to_string(), "warning[UNBOUND]: node 0 output (rows)");
    }
}
