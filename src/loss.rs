//! Classification losses.
//!
//! Both losses take an `(N, C)` score matrix and `N` class labels and return
//! the mean loss over the batch together with its gradient with respect to the
//! scores. They terminate the forward pass, so the gradient is what seeds the
//! backward pass.
//!
//! Labels are validated up front; an out-of-range label is reported as
//! [`LayerError::LabelOutOfRange`] rather than indexing past the row.

use rayon::prelude::*;

use crate::error::{LayerError, Result};
use crate::tensors::Ten64;

/// Checks label count and range, returning `(N, C)`.
///
/// # Panics
/// Panics if `labels` does not have one entry per row.
fn check_labels(scores: &Ten64, labels: &[usize]) -> Result<(usize, usize)> {
    let (n, c) = scores.dims2();
    assert_eq!(labels.len(), n, "{} labels for {n} score rows", labels.len());
    match labels.iter().enumerate().find(|&(_, &y)| y >= c) {
        Some((index, &label)) => Err(LayerError::LabelOutOfRange { index, label, classes: c }),
        None => Ok((n, c)),
    }
}

/// Multiclass SVM (hinge) loss with margin 1.
///
/// $$ L = \\frac{1}{N} \\sum_i \\sum_{j \\ne y_i} \\max(0, s_{ij} - s_{iy_i} + 1) $$
///
/// # Returns
/// `(loss, dscores)`; each positive margin adds `1/N` to its class and
/// subtracts `1/N` from the correct class.
///
/// # Errors
/// [`LayerError::LabelOutOfRange`] if a label is not below `C`.
///
/// # Example
/// ```rust
/// use backprop_layers::loss::svm_loss;
/// use backprop_layers::tensor;
///
/// let scores = tensor!([[5.0, 1.0, 2.0]]);
/// let (loss, dx) = svm_loss(&scores, &[0])?;
/// assert_eq!(loss, 0.0);
/// assert!(dx.data.iter().all(|&g| g == 0.0));
/// # Ok::<(), backprop_layers::error::LayerError>(())
/// ```
pub fn svm_loss(scores: &Ten64, labels: &[usize]) -> Result<(f64, Ten64)> {
    let (n, c) = check_labels(scores, labels)?;
    let inv_n = 1.0 / n as f64;

    let mut dx = Ten64::zeros(vec![n, c]);
    let loss: f64 = dx
        .data
        .par_chunks_mut(c)
        .zip(scores.data.par_chunks(c))
        .zip(labels.par_iter())
        .map(|((grad, row), &y)| {
            let correct = row[y];
            let mut total = 0.0;
            let mut positive = 0usize;
            for (j, &s) in row.iter().enumerate() {
                if j == y {
                    continue;
                }
                let margin = s - correct + 1.0;
                if margin > 0.0 {
                    total += margin;
                    positive += 1;
                    grad[j] = inv_n;
                }
            }
            grad[y] = -(positive as f64) * inv_n;
            total
        })
        .sum();

    Ok((loss * inv_n, dx))
}

/// Softmax cross-entropy loss.
///
/// Each row is shifted by its maximum before exponentiating, so large scores do
/// not overflow.
///
/// # Returns
/// `(loss, dscores)` where `dscores = (softmax(scores) - one_hot(labels)) / N`;
/// every gradient row sums to zero.
///
/// # Errors
/// [`LayerError::LabelOutOfRange`] if a label is not below `C`.
pub fn softmax_loss(scores: &Ten64, labels: &[usize]) -> Result<(f64, Ten64)> {
    let (n, c) = check_labels(scores, labels)?;
    let inv_n = 1.0 / n as f64;

    let mut dx = Ten64::zeros(vec![n, c]);
    let loss: f64 = dx
        .data
        .par_chunks_mut(c)
        .zip(scores.data.par_chunks(c))
        .zip(labels.par_iter())
        .map(|((grad, row), &y)| {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let log_z = row.iter().map(|&s| (s - max).exp()).sum::<f64>().ln();
            for (g, &s) in grad.iter_mut().zip(row) {
                *g = (s - max - log_z).exp() * inv_n;
            }
            grad[y] -= inv_n;
            -(row[y] - max - log_z)
        })
        .sum();

    Ok((loss * inv_n, dx))
}
