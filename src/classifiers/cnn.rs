//! A three-layer convolutional network.
//!
//! ```text
//! conv - relu - 2x2 max pool - affine - relu - affine - softmax
//! ```
//!
//! The network owns its parameters and wires the layer functions together; it
//! does not train itself. An external optimizer reads [`ConvNetGrads`] and
//! updates the public parameter fields.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::config::{ConvParam, PoolParam};
use crate::error::{LayerError, Result};
use crate::layers::{affine_backward, affine_forward};
use crate::loss::softmax_loss;
use crate::sandwich::{
    affine_relu_backward, affine_relu_forward, conv_relu_pool_backward, conv_relu_pool_forward,
};
use crate::tensors::Ten64;

/// Hyperparameters of a [`ThreeLayerConvNet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvNetConfig {
    /// `(C, H, W)` of a single input image.
    pub input_dim: (usize, usize, usize),
    pub num_filters: usize,
    /// Side of the square filters; odd sizes preserve the spatial extent.
    pub filter_size: usize,
    pub hidden_dim: usize,
    pub num_classes: usize,
    /// Standard deviation of the initial weights.
    pub weight_scale: f64,
    /// L2 regularization strength.
    pub reg: f64,
}

impl Default for ConvNetConfig {
    fn default() -> Self {
        Self {
            input_dim: (3, 32, 32),
            num_filters: 32,
            filter_size: 7,
            hidden_dim: 100,
            num_classes: 10,
            weight_scale: 1e-3,
            reg: 0.0,
        }
    }
}

impl ConvNetConfig {
    fn violation(&self) -> Option<&'static str> {
        let (c, h, w) = self.input_dim;
        let pad = self.conv_param().pad;
        // the convolution output must be at least 2x2 to feed the pool
        let covers_pool = |size: usize| size + 2 * pad + 1 >= self.filter_size + 2;
        if c == 0 || self.num_filters == 0 || self.hidden_dim == 0 || self.num_classes == 0 {
            Some("every dimension must be at least 1")
        } else if self.filter_size == 0 || !(covers_pool(h) && covers_pool(w)) {
            Some("convolution output must cover a 2x2 pooling window")
        } else if !(self.weight_scale.is_finite() && self.weight_scale >= 0.0) {
            Some("weight_scale must be finite and non-negative")
        } else if !(self.reg.is_finite() && self.reg >= 0.0) {
            Some("reg must be finite and non-negative")
        } else {
            None
        }
    }

    fn conv_param(&self) -> ConvParam {
        ConvParam::same(self.filter_size)
    }

    /// `(F, H', W')` of the pooled convolution output.
    fn pooled_dims(&self) -> (usize, usize, usize) {
        let (_, h, w) = self.input_dim;
        let fs = self.filter_size;
        let (ch, cw) = self.conv_param().output_dims(h, w, fs, fs);
        let (ph, pw) = PoolParam::default().output_dims(ch, cw);
        (self.num_filters, ph, pw)
    }
}

/// Gradients of the loss with respect to every parameter of a
/// [`ThreeLayerConvNet`], shaped like the parameters.
#[derive(Debug, Clone)]
pub struct ConvNetGrads {
    pub w1: Ten64,
    pub b1: Ten64,
    pub w2: Ten64,
    pub b2: Ten64,
    pub w3: Ten64,
    pub b3: Ten64,
}

/// Convolutional classifier over `(N, C, H, W)` minibatches.
#[derive(Debug, Clone)]
pub struct ThreeLayerConvNet {
    /// `(F, C, filter_size, filter_size)`
    pub w1: Ten64,
    pub b1: Ten64,
    /// `(F·H'·W', hidden_dim)`
    pub w2: Ten64,
    pub b2: Ten64,
    /// `(hidden_dim, num_classes)`
    pub w3: Ten64,
    pub b3: Ten64,
    config: ConvNetConfig,
}

impl ThreeLayerConvNet {
    /// Draws weights from `N(0, weight_scale²)`; biases start at zero.
    ///
    /// # Errors
    /// [`LayerError::InvalidConfig`] if a dimension is zero, the filter or the
    /// pooling window does not fit, or `weight_scale`/`reg` is negative or not
    /// finite.
    pub fn new<R: Rng + ?Sized>(config: ConvNetConfig, rng: &mut R) -> Result<Self> {
        let invalid = |reason: &'static str| LayerError::InvalidConfig {
            layer: "three-layer convnet",
            reason,
        };
        if let Some(reason) = config.violation() {
            debug!(reason, "rejected network configuration");
            return Err(invalid(reason));
        }
        let normal = Normal::new(0.0, config.weight_scale)
            .map_err(|_| invalid("weight_scale must be finite and non-negative"))?;

        let (c, _, _) = config.input_dim;
        let (f, ph, pw) = config.pooled_dims();
        let fs = config.filter_size;
        let mut draw = |shape: Vec<usize>| Ten64::from_fn(shape, |_| normal.sample(&mut *rng));

        let w1 = draw(vec![f, c, fs, fs]);
        let w2 = draw(vec![f * ph * pw, config.hidden_dim]);
        let w3 = draw(vec![config.hidden_dim, config.num_classes]);
        debug!(
            filters = f,
            pooled = ?(ph, pw),
            hidden = config.hidden_dim,
            classes = config.num_classes,
            "initialized three-layer convnet"
        );

        Ok(Self {
            w1,
            b1: Ten64::zeros(vec![f]),
            w2,
            b2: Ten64::zeros(vec![config.hidden_dim]),
            w3,
            b3: Ten64::zeros(vec![config.num_classes]),
            config,
        })
    }

    pub fn config(&self) -> &ConvNetConfig {
        &self.config
    }

    /// Class scores `(N, num_classes)` for a minibatch.
    pub fn scores(&self, x: &Ten64) -> Ten64 {
        let (a1, _) = conv_relu_pool_forward(
            x,
            &self.w1,
            &self.b1,
            &self.config.conv_param(),
            &PoolParam::default(),
        );
        let (a2, _) = affine_relu_forward(&a1, &self.w2, &self.b2);
        affine_forward(&a2, &self.w3, &self.b3).0
    }

    /// Softmax loss plus `0.5 · reg · Σ‖W‖²` and the gradient of that total.
    ///
    /// # Errors
    /// [`LayerError::LabelOutOfRange`] if a label is not below `num_classes`.
    pub fn loss(&self, x: &Ten64, labels: &[usize]) -> Result<(f64, ConvNetGrads)> {
        let (a1, cache1) = conv_relu_pool_forward(
            x,
            &self.w1,
            &self.b1,
            &self.config.conv_param(),
            &PoolParam::default(),
        );
        let (a2, cache2) = affine_relu_forward(&a1, &self.w2, &self.b2);
        let (scores, cache3) = affine_forward(&a2, &self.w3, &self.b3);

        let (data_loss, dscores) = softmax_loss(&scores, labels)?;
        let reg = self.config.reg;
        let squares = |w: &Ten64| w.data.iter().map(|v| v * v).sum::<f64>();
        let reg_loss = 0.5 * reg * (squares(&self.w1) + squares(&self.w2) + squares(&self.w3));

        let (da2, dw3, db3) = affine_backward(&dscores, cache3);
        let (da1, dw2, db2) = affine_relu_backward(&da2, cache2);
        let (_, dw1, db1) = conv_relu_pool_backward(&da1, cache1);

        let decay = |dw: Ten64, w: &Ten64| dw.zip_map(w, |g, v| g + reg * v);
        let grads = ConvNetGrads {
            w1: decay(dw1, &self.w1),
            b1: db1,
            w2: decay(dw2, &self.w2),
            b2: db2,
            w3: decay(dw3, &self.w3),
            b3: db3,
        };

        debug!(batch = labels.len(), data_loss, reg_loss, "evaluated convnet loss");
        Ok((data_loss + reg_loss, grads))
    }
}
