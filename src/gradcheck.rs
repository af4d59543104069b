//! Numerical gradient checking.
//!
//! Central differences against which the analytic backward passes are
//! verified:
//!
//! $$ \\frac{\\partial f}{\\partial x_i} \\approx \\frac{f(x + h e_i) - f(x - h e_i)}{2h} $$
//!
//! Each estimate costs two evaluations of `f` per input element, so keep
//! inputs small. Only `x` is perturbed; any other input `f` closes over stays
//! fixed, and `f` should be deterministic (fix dropout seeds, use
//! training-mode batch norm with a scratch [`RunningStats`](crate::config::RunningStats)).

use tracing::debug;

use crate::tensors::Ten64;

/// Step used by the crate's own tests.
pub const DEFAULT_STEP: f64 = 1e-5;

/// Numerical gradient of a scalar function `f` at `x`.
///
/// # Returns
/// A tensor shaped like `x`.
pub fn eval_numerical_gradient(mut f: impl FnMut(&Ten64) -> f64, x: &Ten64, h: f64) -> Ten64 {
    let mut probe = x.clone();
    let mut grad = Ten64::zeros_like(x);
    for i in 0..x.len() {
        let orig = probe.data[i];
        probe.data[i] = orig + h;
        let plus = f(&probe);
        probe.data[i] = orig - h;
        let minus = f(&probe);
        probe.data[i] = orig;
        grad.data[i] = (plus - minus) / (2.0 * h);
    }
    debug!(elements = x.len(), h, "evaluated numerical gradient");
    grad
}

/// Numerical gradient of a tensor-valued `f` at `x`, contracted with the
/// upstream gradient `df`: the estimate of `Σ_j df_j · ∂f_j/∂x`.
///
/// # Panics
/// Panics if `f` does not return a tensor shaped like `df`.
pub fn eval_numerical_gradient_array(
    mut f: impl FnMut(&Ten64) -> Ten64,
    x: &Ten64,
    df: &Ten64,
    h: f64,
) -> Ten64 {
    let mut probe = x.clone();
    let mut grad = Ten64::zeros_like(x);
    for i in 0..x.len() {
        let orig = probe.data[i];
        probe.data[i] = orig + h;
        let plus = f(&probe);
        probe.data[i] = orig - h;
        let minus = f(&probe);
        probe.data[i] = orig;

        assert_eq!(plus.shape, df.shape, "function output does not match upstream gradient");
        grad.data[i] = plus
            .data
            .iter()
            .zip(&minus.data)
            .zip(&df.data)
            .map(|((p, m), d)| (p - m) * d)
            .sum::<f64>()
            / (2.0 * h);
    }
    debug!(elements = x.len(), outputs = df.len(), h, "evaluated numerical array gradient");
    grad
}

/// Largest elementwise relative error `|a - b| / max(1e-8, |a| + |b|)`.
///
/// # Panics
/// Panics if shapes do not match.
pub fn rel_error(a: &Ten64, b: &Ten64) -> f64 {
    assert_eq!(a.shape, b.shape, "shape mismatch");
    a.data
        .iter()
        .zip(&b.data)
        .map(|(x, y)| (x - y).abs() / (x.abs() + y.abs()).max(1e-8))
        .fold(0.0, f64::max)
}
