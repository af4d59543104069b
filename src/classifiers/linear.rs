//! Linear softmax classifier: scores are `X · W` for data `X (N, D)` and
//! weights `W (D, C)`.
//!
//! The loss is the mean softmax cross-entropy plus `reg · Σ W²`, and the
//! gradient carries the matching `2 · reg · W` term. The naive and vectorized
//! versions compute the same quantities and exist to be checked against each
//! other.

use crate::error::{LayerError, Result};
use crate::loss::softmax_loss;
use crate::ops::cpu::{matmul, matmul_tn};
use crate::tensors::Ten64;

fn l2(w: &Ten64, reg: f64) -> (f64, Ten64) {
    let loss = reg * w.data.iter().map(|v| v * v).sum::<f64>();
    (loss, w.map(|v| 2.0 * reg * v))
}

/// Softmax loss and `dW` with explicit loops over samples and classes.
///
/// # Errors
/// [`LayerError::LabelOutOfRange`] if a label is not below `C`.
pub fn softmax_loss_naive(w: &Ten64, x: &Ten64, y: &[usize], reg: f64) -> Result<(f64, Ten64)> {
    let (d, c) = w.dims2();
    let (n, xd) = x.dims2();
    assert_eq!(xd, d, "data has {xd} features but weights expect {d}");
    assert_eq!(y.len(), n, "{} labels for {n} samples", y.len());
    if let Some((index, &label)) = y.iter().enumerate().find(|&(_, &l)| l >= c) {
        return Err(LayerError::LabelOutOfRange { index, label, classes: c });
    }

    let mut loss = 0.0;
    let mut dw = Ten64::zeros(vec![d, c]);
    for (i, xi) in x.rows().enumerate() {
        let mut scores = vec![0.0; c];
        for (k, &xv) in xi.iter().enumerate() {
            for j in 0..c {
                scores[j] += xv * w.data[k * c + j];
            }
        }
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp_sum: f64 = scores.iter().map(|s| (s - max).exp()).sum();
        loss -= (scores[y[i]] - max) - exp_sum.ln();

        for j in 0..c {
            let p = (scores[j] - max).exp() / exp_sum;
            let coef = if j == y[i] { p - 1.0 } else { p };
            for (k, &xv) in xi.iter().enumerate() {
                dw.data[k * c + j] += xv * coef;
            }
        }
    }

    let (reg_loss, reg_grad) = l2(w, reg);
    let dw = dw.zip_map(&reg_grad, |g, r| g / n as f64 + r);
    Ok((loss / n as f64 + reg_loss, dw))
}

/// Softmax loss and `dW` through whole-matrix products.
///
/// # Errors
/// [`LayerError::LabelOutOfRange`] if a label is not below `C`.
pub fn softmax_loss_vectorized(
    w: &Ten64,
    x: &Ten64,
    y: &[usize],
    reg: f64,
) -> Result<(f64, Ten64)> {
    let (d, c) = w.dims2();
    let (n, xd) = x.dims2();
    assert_eq!(xd, d, "data has {xd} features but weights expect {d}");

    let scores = Ten64::new(vec![n, c], matmul(&x.data, &w.data, n, d, c));
    let (data_loss, dscores) = softmax_loss(&scores, y)?;
    let dw = Ten64::new(vec![d, c], matmul_tn(&x.data, &dscores.data, n, d, c));

    let (reg_loss, reg_grad) = l2(w, reg);
    Ok((data_loss + reg_loss, dw.zip_map(&reg_grad, |g, r| g + r)))
}
