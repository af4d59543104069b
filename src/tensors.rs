//! Core tensor data structures and shape bookkeeping.
//!
//! # Core Tensor Utilities
//!
//! This module defines how multi-dimensional arrays are represented and reshaped
//! between layers.
//!
//! It supports:
//! - Construction of N-dimensional tensors with shape and row-major data layout
//! - Reshaping and general axis permutation (used by the spatial batch norm adapter)
//! - Elementwise mapping and combination of equally shaped tensors
//! - Symmetric zero padding of the spatial axes of `(N, C, H, W)` tensors
//! - Compile-time tensor macros
//!
//! ## Design Highlights
//! - Tensors are strongly typed: `Tensor<T>` for any element type, layers use [`Ten64`]
//! - Shape is stored as a `Vec<usize>` and enforced at runtime
//! - Every operation allocates a fresh tensor; nothing aliases a caller's buffer
//! - The `tensor!` macro supports ergonomic tensor creation from nested arrays
//!
//! ## Limitations
//! - Row-major only
//! - No broadcasting; shape mismatches panic
//!
//! ## Example
//!
//! ```rust
//! use backprop_layers::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![2, 3]);
//! assert_eq!(t.permute(&[1, 0]).data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
//! ```

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - All elements must be the same type (`T`).
/// - `shape` defines the structure, e.g., `[2, 3]` for a 2×3 matrix.
/// - `data` holds the flattened content in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

/// Double precision tensor, the working type of every layer.
pub type Ten64 = Tensor<f64>;

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Reinterprets the data under a new shape without moving any element.
    ///
    /// # Panics
    /// Panics if the element counts differ.
    pub fn reshape(self, shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            self.data.len(),
            "cannot reshape {:?} into {:?}",
            self.shape,
            shape
        );
        Self { shape, data: self.data }
    }

    /// Destructures a 4D shape as `(N, C, H, W)`.
    ///
    /// # Panics
    /// Panics if the tensor is not 4-dimensional.
    pub fn dims4(&self) -> (usize, usize, usize, usize) {
        match self.shape[..] {
            [n, c, h, w] => (n, c, h, w),
            _ => panic!("expected a 4D tensor, got shape {:?}", self.shape),
        }
    }

    /// Destructures a 2D shape as `(rows, cols)`.
    ///
    /// # Panics
    /// Panics if the tensor is not 2-dimensional.
    pub fn dims2(&self) -> (usize, usize) {
        match self.shape[..] {
            [r, c] => (r, c),
            _ => panic!("expected a 2D tensor, got shape {:?}", self.shape),
        }
    }
}

impl<T: Copy> Tensor<T> {
    /// Builds a tensor by evaluating `f` at every flat index.
    pub fn from_fn(shape: impl Into<Vec<usize>>, f: impl FnMut(usize) -> T) -> Self {
        let shape = shape.into();
        let len = shape.iter().product::<usize>();
        Self { shape, data: (0..len).map(f).collect() }
    }

    /// Applies `f` elementwise into a new tensor of the same shape.
    pub fn map(&self, f: impl Fn(T) -> T) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combines two equally shaped tensors elementwise.
    ///
    /// # Panics
    /// Panics if shapes do not match.
    pub fn zip_map(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        assert_eq!(self.shape, other.shape, "shape mismatch");
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        }
    }

    /// Returns the tensor with its axes reordered: output axis `i` is input axis `axes[i]`.
    ///
    /// # Panics
    /// Panics if `axes` is not a permutation of `0..ndim`.
    pub fn permute(&self, axes: &[usize]) -> Self {
        let ndim = self.shape.len();
        assert_eq!(axes.len(), ndim, "permutation rank mismatch");
        let mut seen = vec![false; ndim];
        for &a in axes {
            assert!(a < ndim && !seen[a], "invalid permutation {axes:?}");
            seen[a] = true;
        }

        let in_strides = strides(&self.shape);
        let out_shape: Vec<usize> = axes.iter().map(|&a| self.shape[a]).collect();
        let src_strides: Vec<usize> = axes.iter().map(|&a| in_strides[a]).collect();

        let mut data = Vec::with_capacity(self.data.len());
        if self.data.is_empty() {
            return Self { shape: out_shape, data };
        }

        let mut idx = vec![0usize; ndim];
        let mut src = 0usize;
        loop {
            data.push(self.data[src]);

            // odometer increment over the output index, tracking the source offset
            let mut d = ndim;
            loop {
                if d == 0 {
                    return Self { shape: out_shape, data };
                }
                d -= 1;
                idx[d] += 1;
                src += src_strides[d];
                if idx[d] < out_shape[d] {
                    break;
                }
                src -= src_strides[d] * idx[d];
                idx[d] = 0;
            }
        }
    }
}

impl Ten64 {
    /// Creates a zero-filled tensor.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let len = shape.iter().product::<usize>();
        Self { shape, data: vec![0.0; len] }
    }

    /// Creates a zero-filled tensor with the shape of `other`.
    pub fn zeros_like(other: &Self) -> Self {
        Self::zeros(other.shape.clone())
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Largest absolute elementwise difference.
    ///
    /// # Panics
    /// Panics if shapes do not match.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        assert_eq!(self.shape, other.shape, "shape mismatch");
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Borrows row `i` of a 2D tensor.
    pub fn row(&self, i: usize) -> &[f64] {
        let (_, cols) = self.dims2();
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Iterates the rows of a 2D tensor.
    pub fn rows(&self) -> core::slice::Chunks<'_, f64> {
        let (_, cols) = self.dims2();
        self.data.chunks(cols.max(1))
    }

    /// Sums a 2D tensor over its rows, giving one value per column.
    pub fn sum_rows(&self) -> Vec<f64> {
        let (_, cols) = self.dims2();
        let mut out = vec![0.0; cols];
        for row in self.data.chunks(cols.max(1)) {
            for (o, &v) in out.iter_mut().zip(row) {
                *o += v;
            }
        }
        out
    }

    /// Zero-pads the two spatial axes of an `(N, C, H, W)` tensor by `pad` on every side.
    pub fn pad2d(&self, pad: usize) -> Self {
        if pad == 0 {
            return self.clone();
        }
        let (n, c, h, w) = self.dims4();
        let (hp, wp) = (h + 2 * pad, w + 2 * pad);
        let mut out = Self::zeros(vec![n, c, hp, wp]);
        for (src, dst) in self.data.chunks(h * w).zip(out.data.chunks_mut(hp * wp)) {
            for i in 0..h {
                let at = (i + pad) * wp + pad;
                dst[at..at + w].copy_from_slice(&src[i * w..(i + 1) * w]);
            }
        }
        out
    }

    /// Strips a `pad`-wide border from the spatial axes; the inverse of [`Ten64::pad2d`].
    pub fn unpad2d(&self, pad: usize) -> Self {
        if pad == 0 {
            return self.clone();
        }
        let (n, c, hp, wp) = self.dims4();
        let (h, w) = (hp - 2 * pad, wp - 2 * pad);
        let mut out = Self::zeros(vec![n, c, h, w]);
        for (src, dst) in self.data.chunks(hp * wp).zip(out.data.chunks_mut(h * w)) {
            for i in 0..h {
                let at = (i + pad) * wp + pad;
                dst[i * w..(i + 1) * w].copy_from_slice(&src[at..at + w]);
            }
        }
        out
    }
}

/// Row-major strides of a shape.
pub(crate) fn strides(shape: &[usize]) -> Vec<usize> {
    let mut out = vec![1; shape.len()];
    for d in (0..shape.len().saturating_sub(1)).rev() {
        out[d] = out[d + 1] * shape[d + 1];
    }
    out
}

/// Defines a tensor from nested literal arrays.
///
/// Supports arbitrary dimensionality as long as sublists are uniform in shape.
///
/// # Example
/// ```
/// use backprop_layers::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape, vec![2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($lit:literal) => {
        $crate::tensors::Tensor::new(Vec::<usize>::new(), vec![$lit])
    };

    ([ $( $inner:tt ),+ $(,)? ]) => {{
        let children = vec![ $( $crate::tensor!($inner) ),+ ];
        let first_shape = children[0].shape.clone();
        assert!(children.iter().all(|c| c.shape == first_shape),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = vec![children.len()];
        shape.extend_from_slice(&first_shape);
        let mut data = Vec::with_capacity(children.len() * children[0].data.len());
        for c in children { data.extend(c.data); }
        $crate::tensors::Tensor::new(shape, data)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permute_matches_manual_transpose() {
        let t = Tensor::from_fn(vec![2, 3, 4], |i| i as f64);
        let p = t.permute(&[2, 0, 1]);
        assert_eq!(p.shape, vec![4, 2, 3]);
        for a in 0..2 {
            for b in 0..3 {
                for c in 0..4 {
                    let src = t.data[a * 12 + b * 4 + c];
                    let dst = p.data[c * 6 + a * 3 + b];
                    assert_eq!(src, dst);
                }
            }
        }
    }

    #[test]
    fn permute_then_inverse_is_identity() {
        let t = Tensor::from_fn(vec![2, 3, 2, 5], |i| i as f64 * 0.5);
        let back = t.permute(&[0, 2, 3, 1]).permute(&[0, 3, 1, 2]);
        assert_eq!(back, t);
    }

    #[test]
    fn pad_and_unpad() {
        let t = Tensor::from_fn(vec![1, 2, 2, 3], |i| i as f64 + 1.0);
        let p = t.pad2d(1);
        assert_eq!(p.shape, vec![1, 2, 4, 5]);
        assert_eq!(p.sum(), t.sum());
        assert_eq!(p.data[0], 0.0);
        assert_eq!(p.data[6], 1.0);
        assert_eq!(p.unpad2d(1), t);
    }

    #[test]
    fn sum_rows_handles_zero_columns() {
        assert!(Ten64::zeros(vec![3, 0]).sum_rows().is_empty());
        assert_eq!(Ten64::from_fn(vec![2, 2], |i| i as f64).sum_rows(), vec![2.0, 4.0]);
    }

    #[test]
    #[should_panic(expected = "cannot reshape")]
    fn reshape_rejects_wrong_count() {
        let _ = Ten64::zeros(vec![2, 3]).reshape(vec![4, 2]);
    }

    #[test]
    fn macro_builds_nested_shape() {
        let t = tensor!([[[1.0], [2.0]], [[3.0], [4.0]]]);
        assert_eq!(t.shape, vec![2, 2, 1]);
        assert_eq!(t.sum(), 10.0);
    }

    #[test]
    fn sum_rows_collapses_batch_axis() {
        let t = tensor!([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(t.sum_rows(), vec![9.0, 12.0]);
    }

    #[test]
    fn row_access() {
        let t = tensor!([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(t.row(1), &[3.0, 4.0]);
        assert_eq!(t.rows().count(), 3);
    }
}
