//! A small dense row-major matrix with reusable storage.
//!
//! The butterfly engine multiplies a handful of tiny matrices per node pair,
//! millions of times. [`Matrix::resize`] only reallocates when the new shape
//! needs more cells than ever held before, so a scratch matrix settles at the
//! largest shape it sees and is reused from then on.
//!
//! Matrices are not `Clone`; scratch buffers are moved and reused, never
//! duplicated.

use std::ops::{Add, Index, IndexMut, Mul};

/// Whether an operand of [`Matrix::mult`] is read transposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transpose {
    No,
    Yes,
}

#[derive(Debug)]
pub struct Matrix<E> {
    height: usize,
    width: usize,
    data: Vec<E>,
}

impl<E> Default for Matrix<E> {
    fn default() -> Self {
        Matrix { height: 0, width: 0, data: Vec::new() }
    }
}

impl<E: Copy + Default> Matrix<E> {
    /// A `height × width` matrix filled with `E::default()`.
    pub fn new(height: usize, width: usize) -> Self {
        Matrix { height, width, data: vec![E::default(); height * width] }
    }

    /// Change the shape, growing the backing storage only when it is too small.
    ///
    /// Cell contents are unspecified afterwards; callers overwrite every cell
    /// they read.
    pub fn resize(&mut self, height: usize, width: usize) {
        let cells = height * width;
        if cells > self.data.len() {
            self.data = vec![E::default(); cells];
        }
        self.height = height;
        self.width = width;
    }

    pub fn fill(&mut self, value: E) {
        let cells = self.height * self.width;
        self.data[..cells].fill(value);
    }
}

impl<E> Matrix<E> {
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of cells the backing storage can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.height && j < self.width, "({i}, {j}) outside {}x{}", self.height, self.width);
        i * self.width + j
    }

    /// Shape of `op(self)`.
    fn shape(&self, op: Transpose) -> (usize, usize) {
        match op {
            Transpose::No => (self.height, self.width),
            Transpose::Yes => (self.width, self.height),
        }
    }
}

impl<E: Copy> Matrix<E> {
    /// Cell `(i, j)` of `op(self)`.
    #[inline]
    fn get_op(&self, op: Transpose, i: usize, j: usize) -> E {
        match op {
            Transpose::No => self[(i, j)],
            Transpose::Yes => self[(j, i)],
        }
    }
}

impl<E> Matrix<E>
where
    E: Copy + Default + Add<Output = E> + Mul<Output = E>,
{
    /// `out = op_a(a) × op_b(b)`, with `E::default()` as zero.
    ///
    /// `out` is reshaped to fit the product.
    ///
    /// # Panics
    /// If the inner dimensions of the two operands differ.
    pub fn mult(a: &Self, op_a: Transpose, b: &Self, op_b: Transpose, out: &mut Self) {
        let (rows, inner) = a.shape(op_a);
        let (inner_b, cols) = b.shape(op_b);
        assert_eq!(inner, inner_b, "cannot multiply {rows}x{inner} by {inner_b}x{cols}");

        out.resize(rows, cols);
        out.fill(E::default());
        for i in 0..rows {
            for k in 0..inner {
                let lhs = a.get_op(op_a, i, k);
                for j in 0..cols {
                    let cell = &mut out[(i, j)];
                    *cell = *cell + lhs * b.get_op(op_b, k, j);
                }
            }
        }
    }
}

impl<E> Index<(usize, usize)> for Matrix<E> {
    type Output = E;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &E {
        &self.data[self.offset(i, j)]
    }
}

impl<E> IndexMut<(usize, usize)> for Matrix<E> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut E {
        let offset = self.offset(i, j);
        &mut self.data[offset]
    }
}
