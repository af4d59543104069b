//! Parallel CPU matrix kernels
//!
//! # CPU Kernels
//!
//! Dense row-major matrix products on flat `f64` slices. Every layer that
//! reduces to linear algebra (affine, the batched convolution, the linear
//! softmax classifier) funnels through these three functions.
//!
//! ## Features
//!
//! - Parallel execution over output rows using [`rayon`](https://docs.rs/rayon)
//! - `i-k-j` loop order so the innermost loop streams contiguous rows
//! - Transposed variants that never materialize the transpose
//!
//! ## Implemented Ops
//!
//! - `matmul`: `A (m×k) · B (k×n)`
//! - `matmul_tn`: `Aᵀ · B` for `A (k×m)`, `B (k×n)`
//! - `matmul_nt`: `A · Bᵀ` for `A (m×k)`, `B (n×k)`
//!
//! ## Design Goals
//!
//! - Deterministic results: each output element is summed in a fixed order
//!   regardless of thread scheduling
//! - Inner-dimension mismatches panic, like any other shape error

use rayon::prelude::*;

/// Performs a matrix multiplication `C = A × B` on two row-major matrices
/// (`A: m×k`, `B: k×n`).
///
/// # Panics
/// - If the slice lengths do not match the given dimensions.
///
/// # Example
/// ```rust
/// use backprop_layers::ops::cpu::matmul;
///
/// let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; // 2×3
/// let b = [7.0, 8.0, 9.0, 10.0, 11.0, 12.0]; // 3×2
/// assert_eq!(matmul(&a, &b, 2, 3, 2), vec![58.0, 64.0, 139.0, 154.0]);
/// ```
pub fn matmul(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    assert_eq!(a.len(), m * k, "matmul shape mismatch");
    assert_eq!(b.len(), k * n, "matmul shape mismatch");

    let mut out = vec![0.0; m * n];
    if n == 0 {
        return out;
    }

    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        let a_row = &a[i * k..(i + 1) * k];
        for (l, &av) in a_row.iter().enumerate() {
            let b_row = &b[l * n..(l + 1) * n];
            for (o, &bv) in row.iter_mut().zip(b_row) {
                *o += av * bv;
            }
        }
    });

    out
}

/// Computes `Aᵀ × B` for `A: k×m` and `B: k×n`, giving `m×n`.
///
/// # Panics
/// - If the slice lengths do not match the given dimensions.
pub fn matmul_tn(a: &[f64], b: &[f64], k: usize, m: usize, n: usize) -> Vec<f64> {
    assert_eq!(a.len(), k * m, "matmul shape mismatch");
    assert_eq!(b.len(), k * n, "matmul shape mismatch");

    let mut out = vec![0.0; m * n];
    if n == 0 {
        return out;
    }

    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for l in 0..k {
            let av = a[l * m + i];
            let b_row = &b[l * n..(l + 1) * n];
            for (o, &bv) in row.iter_mut().zip(b_row) {
                *o += av * bv;
            }
        }
    });

    out
}

/// Computes `A × Bᵀ` for `A: m×k` and `B: n×k`, giving `m×n`.
///
/// # Panics
/// - If the slice lengths do not match the given dimensions.
pub fn matmul_nt(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    assert_eq!(a.len(), m * k, "matmul shape mismatch");
    assert_eq!(b.len(), n * k, "matmul shape mismatch");

    let mut out = vec![0.0; m * n];
    if n == 0 {
        return out;
    }

    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        let a_row = &a[i * k..(i + 1) * k];
        for (j, o) in row.iter_mut().enumerate() {
            let b_row = &b[j * k..(j + 1) * k];
            *o = a_row.iter().zip(b_row).map(|(x, y)| x * y).sum();
        }
    });

    out
}
