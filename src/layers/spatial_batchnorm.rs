use super::batchnorm::{batchnorm_backward_alt, batchnorm_forward, BatchNormCache};
use crate::config::{BatchNormParam, RunningStats};
use crate::tensors::Ten64;

/// Inner batch norm cache plus the `(N, C, H, W)` layout needed to undo the reshape.
#[derive(Debug, Clone)]
pub struct SpatialBatchNormCache {
    inner: BatchNormCache,
    dims: (usize, usize, usize, usize),
}

/// Moves channels last and flattens: `(N, C, H, W)` → `(N·H·W, C)`.
fn channels_last(x: &Ten64) -> Ten64 {
    let (n, c, h, w) = x.dims4();
    x.permute(&[0, 2, 3, 1]).reshape(vec![n * h * w, c])
}

/// Inverse of [`channels_last`].
fn channels_first(y: Ten64, (n, c, h, w): (usize, usize, usize, usize)) -> Ten64 {
    y.reshape(vec![n, h, w, c]).permute(&[0, 3, 1, 2])
}

/// Batch normalization per channel of an `(N, C, H, W)` tensor.
///
/// Statistics are taken over the `N·H·W` values of each channel, so `gamma`,
/// `beta` and `stats` all have `C` entries. Mode semantics are those of
/// [`batchnorm_forward`](super::batchnorm_forward).
pub fn spatial_batchnorm_forward(
    x: &Ten64,
    gamma: &Ten64,
    beta: &Ten64,
    param: &BatchNormParam,
    stats: &mut RunningStats,
) -> (Ten64, Option<SpatialBatchNormCache>) {
    let dims = x.dims4();
    let (flat, cache) = batchnorm_forward(&channels_last(x), gamma, beta, param, stats);
    let out = channels_first(flat, dims);
    (out, cache.map(|inner| SpatialBatchNormCache { inner, dims }))
}

/// Backward pass of [`spatial_batchnorm_forward`].
///
/// # Returns
/// `(dx, dgamma, dbeta)` with shapes `(N, C, H, W)`, `(C,)`, `(C,)`.
pub fn spatial_batchnorm_backward(
    dout: &Ten64,
    cache: SpatialBatchNormCache,
) -> (Ten64, Ten64, Ten64) {
    let SpatialBatchNormCache { inner, dims } = cache;
    assert_eq!(dout.dims4(), dims, "upstream gradient shape mismatch");
    debug_assert_eq!(inner.features(), dims.1);
    let (dx, dgamma, dbeta) = batchnorm_backward_alt(&channels_last(dout), inner);
    (channels_first(dx, dims), dgamma, dbeta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn normalizes_each_channel_over_batch_and_space() {
        let x = Ten64::from_fn(vec![2, 3, 2, 2], |k| (k as f64 * 0.37).cos() * 4.0 + (k / 8) as f64);
        let gamma = Ten64::new(vec![3], vec![1.0; 3]);
        let beta = Ten64::zeros(vec![3]);
        let mut stats = RunningStats::default();
        let (out, _) =
            spatial_batchnorm_forward(&x, &gamma, &beta, &BatchNormParam::default(), &mut stats);

        assert_eq!(out.shape, x.shape);
        assert_eq!(stats.len(), 3);
        for ch in 0..3 {
            let vals: Vec<f64> = (0..2)
                .flat_map(|n| (0..4).map(move |s| (n, s)))
                .map(|(n, s)| out.data[n * 12 + ch * 4 + s])
                .collect();
            let mean = vals.iter().sum::<f64>() / 8.0;
            assert!(mean.abs() < 1e-12);
        }
    }

    #[test]
    fn test_mode_has_no_cache() {
        let x = Ten64::zeros(vec![1, 2, 2, 2]);
        let gamma = Ten64::new(vec![2], vec![1.0, 1.0]);
        let beta = Ten64::new(vec![2], vec![3.0, -3.0]);
        let mut stats = RunningStats::default();
        let (out, cache) =
            spatial_batchnorm_forward(&x, &gamma, &beta, &BatchNormParam::new(Mode::Test), &mut stats);
        assert!(cache.is_none());
        assert!(stats.is_empty());
        assert_eq!(&out.data[..4], &[3.0; 4]);
        assert_eq!(&out.data[4..], &[-3.0; 4]);
    }
}
