//! Batch normalization over the batch axis of an `(N, D)` tensor.
//!
//! Training mode normalizes with the mean and biased (divide-by-`N`) variance of
//! the batch and folds them into the caller's [`RunningStats`]:
//!
//! ```text
//! running = momentum * running + (1 - momentum) * batch_stat
//! ```
//!
//! Test mode normalizes with the stored running statistics and leaves them alone.
//!
//! Two backward passes are provided. [`batchnorm_backward_alt`] is the
//! simplified closed form used in production; [`batchnorm_backward`] stages the
//! chain rule through the variance and the mean separately and serves as a
//! cross-check. Both agree to floating tolerance.

use tracing::trace;

use crate::config::{BatchNormParam, Mode, RunningStats};
use crate::tensors::Ten64;

/// Intermediates of a training-mode [`batchnorm_forward`] call.
#[derive(Debug, Clone)]
pub struct BatchNormCache {
    /// `(x - mean) / std`, shape `(N, D)`.
    norm: Ten64,
    /// `sqrt(var + eps)` per feature.
    std: Vec<f64>,
    gamma: Vec<f64>,
    x: Ten64,
    mean: Vec<f64>,
}

impl BatchNormCache {
    pub(crate) fn features(&self) -> usize {
        self.std.len()
    }
}

/// Forward pass for batch normalization.
///
/// `x` is `(N, D)`; `gamma` and `beta` are `(D,)`.
///
/// # Returns
/// - `out`: `gamma * norm + beta`, shape `(N, D)`.
/// - `cache`: `Some` in [`Mode::Train`], `None` in [`Mode::Test`] (there is no
///   backward pass through inference-mode normalization).
///
/// # Panics
/// Panics if `gamma`/`beta` do not have `D` entries, or if `stats` is
/// non-empty and tracks a different number of features. An empty `stats` is
/// treated as zeros (and sized to `D` on the first training call).
pub fn batchnorm_forward(
    x: &Ten64,
    gamma: &Ten64,
    beta: &Ten64,
    param: &BatchNormParam,
    stats: &mut RunningStats,
) -> (Ten64, Option<BatchNormCache>) {
    let (n, d) = x.dims2();
    assert_eq!(gamma.len(), d, "gamma has {} entries for {d} features", gamma.len());
    assert_eq!(beta.len(), d, "beta has {} entries for {d} features", beta.len());

    match param.mode {
        Mode::Train => {
            let mean: Vec<f64> = x.sum_rows().into_iter().map(|s| s / n as f64).collect();
            let mut var = vec![0.0; d];
            for row in x.rows() {
                for ((v, &xi), &m) in var.iter_mut().zip(row).zip(&mean) {
                    *v += (xi - m) * (xi - m);
                }
            }
            for v in &mut var {
                *v /= n as f64;
            }
            let std: Vec<f64> = var.iter().map(|v| (v + param.eps).sqrt()).collect();

            let mut norm = Ten64::zeros(vec![n, d]);
            let mut out = Ten64::zeros(vec![n, d]);
            for (i, row) in x.rows().enumerate() {
                for j in 0..d {
                    let z = (row[j] - mean[j]) / std[j];
                    norm.data[i * d + j] = z;
                    out.data[i * d + j] = gamma.data[j] * z + beta.data[j];
                }
            }

            stats.ensure_features(d);
            let mom = param.momentum;
            for j in 0..d {
                stats.mean[j] = mom * stats.mean[j] + (1.0 - mom) * mean[j];
                stats.var[j] = mom * stats.var[j] + (1.0 - mom) * var[j];
            }
            trace!(batch = n, features = d, momentum = mom, "updated running statistics");

            let cache = BatchNormCache {
                norm,
                std,
                gamma: gamma.data.clone(),
                x: x.clone(),
                mean,
            };
            (out, Some(cache))
        }
        Mode::Test => {
            let (mean, var) = if stats.is_empty() {
                (vec![0.0; d], vec![0.0; d])
            } else {
                assert!(
                    stats.mean.len() == d && stats.var.len() == d,
                    "running statistics track {} features, input has {}",
                    stats.mean.len(),
                    d
                );
                (stats.mean.clone(), stats.var.clone())
            };
            let inv_std: Vec<f64> = var.iter().map(|v| 1.0 / (v + param.eps).sqrt()).collect();

            let mut out = Ten64::zeros(vec![n, d]);
            for (i, row) in x.rows().enumerate() {
                for j in 0..d {
                    out.data[i * d + j] =
                        gamma.data[j] * (row[j] - mean[j]) * inv_std[j] + beta.data[j];
                }
            }
            (out, None)
        }
    }
}

/// Column sums of `dout` and of `norm * dout`: `(dgamma, dbeta)`.
fn affine_grads(dout: &Ten64, norm: &Ten64) -> (Ten64, Ten64) {
    let d = norm.shape[1];
    let dbeta = dout.sum_rows();
    let dgamma = norm.zip_map(dout, |z, g| z * g).sum_rows();
    (Ten64::new(vec![d], dgamma), Ten64::new(vec![d], dbeta))
}

/// Backward pass for batch normalization, staged through the intermediate
/// nodes of the forward graph: scale, variance, mean, input.
///
/// # Returns
/// `(dx, dgamma, dbeta)` with shapes `(N, D)`, `(D,)`, `(D,)`.
pub fn batchnorm_backward(dout: &Ten64, cache: BatchNormCache) -> (Ten64, Ten64, Ten64) {
    let (n, d) = cache.x.dims2();
    assert_eq!(dout.shape, cache.x.shape, "upstream gradient shape mismatch");
    let nf = n as f64;

    let dnorm = Ten64::from_fn(vec![n, d], |k| dout.data[k] * cache.gamma[k % d]);

    // dL/dvar through norm = (x - mean) * (var + eps)^-1/2
    let mut dvar = vec![0.0; d];
    // dL/dmean along the direct path and the path through var
    let mut dmean = vec![0.0; d];
    let mut centered_sum = vec![0.0; d];
    for i in 0..n {
        for j in 0..d {
            let k = i * d + j;
            let centered = cache.x.data[k] - cache.mean[j];
            dvar[j] += dnorm.data[k] * centered * -0.5 * cache.std[j].powi(-3);
            dmean[j] -= dnorm.data[k] / cache.std[j];
            centered_sum[j] += -2.0 * centered;
        }
    }
    for j in 0..d {
        dmean[j] += dvar[j] * centered_sum[j] / nf;
    }

    let dx = Ten64::from_fn(vec![n, d], |k| {
        let j = k % d;
        let centered = cache.x.data[k] - cache.mean[j];
        dnorm.data[k] / cache.std[j] + dvar[j] * 2.0 * centered / nf + dmean[j] / nf
    });

    let (dgamma, dbeta) = affine_grads(dout, &cache.norm);
    (dx, dgamma, dbeta)
}

/// Simplified backward pass for batch normalization:
///
/// ```text
/// dy = dout * gamma
/// dx = (N * dy - Σ dy - norm * Σ (dy * norm)) / (N * std)
/// ```
///
/// Takes the same cache as [`batchnorm_backward`] and returns the same values.
pub fn batchnorm_backward_alt(dout: &Ten64, cache: BatchNormCache) -> (Ten64, Ten64, Ten64) {
    let (n, d) = cache.norm.dims2();
    assert_eq!(dout.shape, cache.norm.shape, "upstream gradient shape mismatch");
    let nf = n as f64;

    let dy = Ten64::from_fn(vec![n, d], |k| dout.data[k] * cache.gamma[k % d]);
    let dy_sum = dy.sum_rows();
    let dy_norm_sum = dy.zip_map(&cache.norm, |a, z| a * z).sum_rows();

    let dx = Ten64::from_fn(vec![n, d], |k| {
        let j = k % d;
        (nf * dy.data[k] - dy_sum[j] - cache.norm.data[k] * dy_norm_sum[j]) / (nf * cache.std[j])
    });

    let (dgamma, dbeta) = affine_grads(dout, &cache.norm);
    (dx, dgamma, dbeta)
}
