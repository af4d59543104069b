use rayon::prelude::*;

use crate::tensors::Ten64;

/// Pre-activation input captured by [`relu_forward`].
#[derive(Debug, Clone)]
pub struct ReluCache {
    x: Ten64,
}

/// Applies the ReLU activation function element-wise on the input tensor:
/// $$ f(x) = \\max(0, x) $$
///
/// # Returns
/// - Output tensor of same shape
/// - Cache holding the input, which decides where gradients pass in [`relu_backward`]
///
/// # Example
/// ```rust
/// use backprop_layers::layers::relu_forward;
/// use backprop_layers::tensors::Tensor;
///
/// let (out, _) = relu_forward(&Tensor::new(vec![3], vec![-1.0, 0.0, 2.0]));
/// assert_eq!(out.data, vec![0.0, 0.0, 2.0]);
/// ```
pub fn relu_forward(x: &Ten64) -> (Ten64, ReluCache) {
    let data = x.data.par_iter().map(|&v| if v > 0.0 { v } else { 0.0 }).collect();
    (Ten64::new(x.shape.clone(), data), ReluCache { x: x.clone() })
}

/// Propagates upstream gradients through ReLU:
/// $$ \\frac{\\partial f}{\\partial x} = 1 \\text{ if } x > 0 \\text{ else } 0 $$
///
/// Inputs exactly at zero receive zero gradient. A fresh tensor is returned;
/// `dout` is left untouched.
pub fn relu_backward(dout: &Ten64, cache: ReluCache) -> Ten64 {
    assert_eq!(dout.shape, cache.x.shape, "upstream gradient shape mismatch");
    let data = dout
        .data
        .par_iter()
        .zip(cache.x.data.par_iter())
        .map(|(&g, &x)| if x > 0.0 { g } else { 0.0 })
        .collect();
    Ten64::new(dout.shape.clone(), data)
}
