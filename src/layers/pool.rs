use crate::config::PoolParam;
use crate::ops::dispatch;
use crate::tensors::Ten64;

/// Input and configuration of a [`max_pool_forward`] call.
#[derive(Debug, Clone)]
pub struct PoolCache {
    x: Ten64,
    param: PoolParam,
}

/// Max pooling forward pass over each `(N, C)` plane of an `(N, C, H, W)` input.
///
/// Windows never pad; trailing rows and columns that do not fill a window
/// are ignored.
///
/// # Example
/// ```rust
/// use backprop_layers::config::PoolParam;
/// use backprop_layers::layers::max_pool_forward;
/// use backprop_layers::tensors::Ten64;
///
/// let x = Ten64::from_fn(vec![1, 1, 4, 4], |i| i as f64);
/// let (out, _) = max_pool_forward(&x, &PoolParam::default());
/// assert_eq!(out.data, vec![5.0, 7.0, 13.0, 15.0]);
/// ```
pub fn max_pool_forward(x: &Ten64, param: &PoolParam) -> (Ten64, PoolCache) {
    let out = dispatch::max_pool_forward(x, param);
    (out, PoolCache { x: x.clone(), param: *param })
}

/// Max pooling backward pass.
///
/// Each upstream value goes entirely to the first maximum of its window in
/// row-major order; overlapping windows accumulate.
pub fn max_pool_backward(dout: &Ten64, cache: PoolCache) -> Ten64 {
    dispatch::max_pool_backward(dout, &cache.x, &cache.param)
}
