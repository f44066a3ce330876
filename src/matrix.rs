//! Dense row-major `f32` matrices.
//!
//! Every value flowing through a compiled program is a `Matrix`. Scalars are
//! 1x1 matrices and a stereo frame is a 2x1 column. The buffers are resized in
//! place and keep their capacity, so once a voice has warmed up nothing on the
//! render path allocates.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Smearing
========

A 1x1 operand combined with an RxC operand is broadcast by replication:

    [k]  smear(2, 3)  ->  [k k k]
                          [k k k]

The element written into the new cells is the LAST element of the old data,
which for a scalar is the scalar itself. Shrinking keeps the leading
elements in row-major order.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.data() == other.data()
    }
}

impl Matrix {
    /// Zero-filled `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "invalid dimensions: {rows}x{cols}");
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn scalar(value: f32) -> Self {
        Self {
            rows: 1,
            cols: 1,
            data: vec![value],
        }
    }

    /// Build a matrix from row slices. Short rows are zero-padded.
    pub fn from_rows(rows: &[&[f32]]) -> Self {
        let cols = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
        let mut m = Self::new(rows.len().max(1), cols);
        for (r, row) in rows.iter().enumerate() {
            m.data[r * cols..r * cols + row.len()].copy_from_slice(row);
        }
        m
    }

    pub fn column(values: &[f32]) -> Self {
        let mut m = Self::new(values.len().max(1), 1);
        m.data[..values.len()].copy_from_slice(values);
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    /// The live elements in row-major order.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data[..self.rows * self.cols]
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        let len = self.rows * self.cols;
        &mut self.data[..len]
    }

    /// First element. Processors that take scalar inputs read this so a
    /// mis-shaped operand degrades instead of aborting the render.
    #[inline]
    pub fn to_scalar(&self) -> f32 {
        self.data[0]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(
            row < self.rows && col < self.cols,
            "row {row}, col {col} out of range for {}x{} matrix",
            self.rows,
            self.cols
        );
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn put(&mut self, row: usize, col: usize, value: f32) {
        assert!(
            row < self.rows && col < self.cols,
            "row {row}, col {col} out of range for {}x{} matrix",
            self.rows,
            self.cols
        );
        self.data[row * self.cols + col] = value;
    }

    /// Change the logical shape. Existing elements keep their linear
    /// positions, new ones are zero. Only grows the backing buffer.
    pub fn resize(&mut self, rows: usize, cols: usize) -> &mut Self {
        assert!(rows > 0 && cols > 0, "invalid dimensions: {rows}x{cols}");
        let old_len = self.rows * self.cols;
        let new_len = rows * cols;
        if self.data.len() < new_len {
            self.data.resize(new_len, 0.0);
        }
        for v in &mut self.data[old_len.min(new_len)..new_len] {
            *v = 0.0;
        }
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Broadcast to `rows` x `cols`, filling new cells with the last element.
    pub fn smear(&mut self, rows: usize, cols: usize) -> &mut Self {
        let old_len = self.rows * self.cols;
        let last = self.data[old_len - 1];
        self.resize(rows, cols);
        let new_len = rows * cols;
        if new_len > old_len {
            for v in &mut self.data[old_len..new_len] {
                *v = last;
            }
        }
        self
    }

    pub fn set_scalar(&mut self, value: f32) -> &mut Self {
        self.resize(1, 1);
        self.data[0] = value;
        self
    }

    pub fn fill(&mut self, value: f32) -> &mut Self {
        for v in self.data_mut() {
            *v = value;
        }
        self
    }

    /// Copy shape and contents of `other` into `self`, reusing the buffer.
    pub fn copy_from(&mut self, other: &Matrix) -> &mut Self {
        self.resize(other.rows, other.cols);
        let len = other.rows * other.cols;
        self.data[..len].copy_from_slice(&other.data[..len]);
        self
    }

    /// Apply `op(value, row, col)` to every element.
    pub fn apply_unary(&mut self, mut op: impl FnMut(f32, usize, usize) -> f32) -> &mut Self {
        let cols = self.cols;
        for (i, v) in self.data_mut().iter_mut().enumerate() {
            *v = op(*v, i / cols, i % cols);
        }
        self
    }

    /// Elementwise `self = op(self, right)`. A 1x1 on either side is
    /// broadcast against the other operand; the result takes the larger
    /// shape. Mismatched non-scalar shapes combine over the overlapping
    /// prefix.
    pub fn apply_binary(&mut self, right: &Matrix, mut op: impl FnMut(f32, f32) -> f32) -> &mut Self {
        if self.is_scalar() && !right.is_scalar() {
            self.smear(right.rows, right.cols);
        }
        if right.is_scalar() {
            let r = right.data[0];
            for v in self.data_mut() {
                *v = op(*v, r);
            }
        } else {
            for (v, &r) in self.data_mut().iter_mut().zip(right.data()) {
                *v = op(*v, r);
            }
        }
        self
    }

    /// Left/right pair for the output frame. A single element feeds both
    /// channels.
    #[inline]
    pub fn as_stereo(&self) -> [f32; 2] {
        let data = self.data();
        match data.len() {
            1 => [data[0], data[0]],
            _ => [data[0], data[1]],
        }
    }
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..self.rows {
            if r > 0 {
                writeln!(f)?;
            }
            let row = &self.data[r * self.cols..(r + 1) * self.cols];
            for (c, v) in row.iter().enumerate() {
                if c > 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{v}")?;
            }
        }
        Ok(())
    }
}
