use crate::config::ConvParam;
use crate::ops::dispatch;
use crate::tensors::Ten64;

/// Inputs of a [`conv_forward`] call. `x` is kept unpadded.
#[derive(Debug, Clone)]
pub struct ConvCache {
    x: Ten64,
    w: Ten64,
    b: Ten64,
    param: ConvParam,
}

/// 2D convolution (cross-correlation) forward pass.
///
/// - `x`: `(N, C, H, W)` input
/// - `w`: `(F, C, HH, WW)` filters
/// - `b`: `(F,)` biases
///
/// The input is zero-padded by `param.pad` on every side of both spatial axes
/// and every filter is slid across it with step `param.stride`.
///
/// # Returns
/// - `out`: `(N, F, H', W')` with `H' = 1 + (H + 2·pad - HH) / stride` and `W'` alike.
/// - `cache`: the inputs and configuration.
///
/// # Panics
/// Panics if channel counts or the bias length disagree, or if a filter does not
/// fit the padded input.
///
/// # Example
/// ```rust
/// use backprop_layers::config::ConvParam;
/// use backprop_layers::layers::conv_forward;
/// use backprop_layers::tensors::Ten64;
///
/// let x = Ten64::zeros(vec![2, 3, 8, 8]);
/// let w = Ten64::zeros(vec![4, 3, 3, 3]);
/// let b = Ten64::zeros(vec![4]);
/// let (out, _) = conv_forward(&x, &w, &b, &ConvParam::new(2, 1)?);
/// assert_eq!(out.shape, vec![2, 4, 4, 4]);
/// # Ok::<(), backprop_layers::error::LayerError>(())
/// ```
pub fn conv_forward(x: &Ten64, w: &Ten64, b: &Ten64, param: &ConvParam) -> (Ten64, ConvCache) {
    let out = dispatch::conv_forward(x, w, b, param);
    let cache = ConvCache { x: x.clone(), w: w.clone(), b: b.clone(), param: *param };
    (out, cache)
}

/// 2D convolution backward pass.
///
/// Overlapping receptive fields accumulate into `dx` and `dw`.
///
/// # Returns
/// `(dx, dw, db)` shaped like `x`, `w` and `b`.
pub fn conv_backward(dout: &Ten64, cache: ConvCache) -> (Ten64, Ten64, Ten64) {
    let ConvCache { x, w, b, param } = cache;
    dispatch::conv_backward(dout, &x, &w, &b, &param)
}
