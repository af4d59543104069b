//! Common layer combinations.
//!
//! Each sandwich chains core layers forward and unwinds them in reverse, so
//! it follows the same forward/cache/backward pattern as a single layer.

use crate::config::{ConvParam, PoolParam};
use crate::layers::{
    affine_backward, affine_forward, conv_backward, conv_forward, max_pool_backward,
    max_pool_forward, relu_backward, relu_forward, AffineCache, ConvCache, PoolCache, ReluCache,
};
use crate::tensors::Ten64;

/// Caches of an affine layer followed by ReLU.
#[derive(Debug, Clone)]
pub struct AffineReluCache {
    affine: AffineCache,
    relu: ReluCache,
}

/// Affine transform followed by ReLU.
pub fn affine_relu_forward(x: &Ten64, w: &Ten64, b: &Ten64) -> (Ten64, AffineReluCache) {
    let (a, affine) = affine_forward(x, w, b);
    let (out, relu) = relu_forward(&a);
    (out, AffineReluCache { affine, relu })
}

/// Backward pass of [`affine_relu_forward`], returning `(dx, dw, db)`.
pub fn affine_relu_backward(dout: &Ten64, cache: AffineReluCache) -> (Ten64, Ten64, Ten64) {
    let da = relu_backward(dout, cache.relu);
    affine_backward(&da, cache.affine)
}

/// Caches of a convolution followed by ReLU.
#[derive(Debug, Clone)]
pub struct ConvReluCache {
    conv: ConvCache,
    relu: ReluCache,
}

/// Convolution followed by ReLU.
pub fn conv_relu_forward(
    x: &Ten64,
    w: &Ten64,
    b: &Ten64,
    param: &ConvParam,
) -> (Ten64, ConvReluCache) {
    let (a, conv) = conv_forward(x, w, b, param);
    let (out, relu) = relu_forward(&a);
    (out, ConvReluCache { conv, relu })
}

/// Backward pass of [`conv_relu_forward`], returning `(dx, dw, db)`.
pub fn conv_relu_backward(dout: &Ten64, cache: ConvReluCache) -> (Ten64, Ten64, Ten64) {
    let da = relu_backward(dout, cache.relu);
    conv_backward(&da, cache.conv)
}

/// Caches of convolution, ReLU and max pooling.
#[derive(Debug, Clone)]
pub struct ConvReluPoolCache {
    conv: ConvCache,
    relu: ReluCache,
    pool: PoolCache,
}

/// Convolution, ReLU, then max pooling: the first stage of
/// [`ThreeLayerConvNet`](crate::classifiers::ThreeLayerConvNet).
pub fn conv_relu_pool_forward(
    x: &Ten64,
    w: &Ten64,
    b: &Ten64,
    conv_param: &ConvParam,
    pool_param: &PoolParam,
) -> (Ten64, ConvReluPoolCache) {
    let (a, conv) = conv_forward(x, w, b, conv_param);
    let (s, relu) = relu_forward(&a);
    let (out, pool) = max_pool_forward(&s, pool_param);
    (out, ConvReluPoolCache { conv, relu, pool })
}

/// Backward pass of [`conv_relu_pool_forward`], returning `(dx, dw, db)`.
pub fn conv_relu_pool_backward(dout: &Ten64, cache: ConvReluPoolCache) -> (Ten64, Ten64, Ten64) {
    let ds = max_pool_backward(dout, cache.pool);
    let da = relu_backward(&ds, cache.relu);
    conv_backward(&da, cache.conv)
}
