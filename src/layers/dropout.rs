//! Inverted dropout.
//!
//! In training mode every activation is kept with probability `1 - p` and the
//! survivors are scaled by `1 / (1 - p)`, so the expected activation matches
//! test mode, where the layer is the identity.
//!
//! The mask is drawn from a seeded [`StdRng`] when [`DropoutParam::seed`] is set
//! (gradient checks need the same mask on every evaluation) and from a fresh
//! generator seeded by the thread-local RNG otherwise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::{DropoutParam, Mode};
use crate::tensors::Ten64;

/// Configuration and the (already scaled) mask of a [`dropout_forward`] call.
#[derive(Debug, Clone)]
pub struct DropoutCache {
    param: DropoutParam,
    /// `keep / (1 - p)` per element; `None` in test mode.
    mask: Option<Ten64>,
}

/// Forward pass for inverted dropout.
///
/// # Returns
/// - `out`: `x * mask / (1 - p)` in training mode, a copy of `x` in test mode.
/// - `cache`: the configuration and mask for [`dropout_backward`].
///
/// # Example
/// ```rust
/// use backprop_layers::config::{DropoutParam, Mode};
/// use backprop_layers::layers::dropout_forward;
/// use backprop_layers::tensors::Ten64;
///
/// let x = Ten64::from_fn(vec![4, 4], |i| i as f64);
/// let param = DropoutParam::new(0.0, Mode::Train)?;
/// let (out, _) = dropout_forward(&x, &param);
/// assert_eq!(out, x);
/// # Ok::<(), backprop_layers::error::LayerError>(())
/// ```
pub fn dropout_forward(x: &Ten64, param: &DropoutParam) -> (Ten64, DropoutCache) {
    match param.mode {
        Mode::Train => {
            let mut rng = match param.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            let scale = 1.0 / (1.0 - param.p);
            let mask = Ten64::from_fn(x.shape.clone(), |_| {
                if rng.random::<f64>() >= param.p { scale } else { 0.0 }
            });
            trace!(
                p = param.p,
                seeded = param.seed.is_some(),
                kept = mask.data.iter().filter(|&&m| m != 0.0).count(),
                total = mask.len(),
                "drew dropout mask"
            );
            let out = x.zip_map(&mask, |v, m| v * m);
            (out, DropoutCache { param: *param, mask: Some(mask) })
        }
        Mode::Test => (x.clone(), DropoutCache { param: *param, mask: None }),
    }
}

/// Backward pass for inverted dropout: `dout * mask / (1 - p)` in training
/// mode, `dout` unchanged in test mode.
pub fn dropout_backward(dout: &Ten64, cache: DropoutCache) -> Ten64 {
    match (cache.param.mode, cache.mask) {
        (Mode::Train, Some(mask)) => dout.zip_map(&mask, |g, m| g * m),
        _ => dout.clone(),
    }
}
