//! Typed per-layer configuration records.
//!
//! # Layer Configuration
//!
//! Every layer invocation that needs scalar settings takes one of the records
//! below instead of a loosely keyed map. Records are checked when built through
//! their constructors; records assembled from public fields can be checked
//! after the fact with [`briny`]'s [`Validate`] trait or the inherent `check`
//! method, which reports which bound was violated.
//!
//! | Record             | Layer                        | Defaults                     |
//! |--------------------|------------------------------|------------------------------|
//! | [`ConvParam`]      | convolution                  | stride 1, pad 0              |
//! | [`PoolParam`]      | max pooling                  | 2×2 window, stride 2         |
//! | [`BatchNormParam`] | (spatial) batch norm         | train, eps 1e-5, momentum 0.9|
//! | [`DropoutParam`]   | inverted dropout             | no seed                      |
//!
//! [`RunningStats`] is not configuration in the strict sense: it is the mutable
//! state batch norm threads through successive training calls. The caller owns
//! it for the lifetime of the model.

use core::fmt;
use core::str::FromStr;

use briny::prelude::*;
use tracing::debug;

use crate::error::{LayerError, Result};

/// Whether a layer runs with training or inference semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Batch statistics, running-stat updates, random dropout masks.
    #[default]
    Train,
    /// Stored running statistics, identity dropout.
    Test,
}

impl FromStr for Mode {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Self::Train),
            "test" => Ok(Self::Test),
            other => {
                debug!(mode = other, "rejected layer mode");
                Err(LayerError::InvalidMode(other.to_owned()))
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Train => "train",
            Self::Test => "test",
        })
    }
}

/// Bound checks shared by the configuration records.
trait Bounds {
    const LAYER: &'static str;

    /// First violated bound, if any.
    fn violation(&self) -> Option<&'static str>;

    fn checked(self) -> Result<Self>
    where
        Self: Sized,
    {
        match self.violation() {
            Some(reason) => {
                debug!(layer = Self::LAYER, reason, "rejected layer configuration");
                Err(LayerError::InvalidConfig { layer: Self::LAYER, reason })
            }
            None => Ok(self),
        }
    }
}

macro_rules! impl_validate {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Validate for $ty {
                fn validate(&self) -> core::result::Result<(), ValidationError> {
                    match self.violation() {
                        Some(_) => Err(ValidationError),
                        None => Ok(()),
                    }
                }
            }

            impl $ty {
                /// Reports the first violated bound as a [`LayerError::InvalidConfig`].
                ///
                /// # Errors
                /// Fails if any field is outside its documented range.
                pub fn check(&self) -> Result<()> {
                    match self.violation() {
                        Some(reason) => Err(LayerError::InvalidConfig { layer: <$ty as Bounds>::LAYER, reason }),
                        None => Ok(()),
                    }
                }
            }
        )+
    };
}

/// Output extent of a sliding window: `1 + (size + 2*pad - window) / stride`.
///
/// # Panics
/// Panics if the window does not fit in the (padded) input.
pub fn window_output(size: usize, window: usize, pad: usize, stride: usize) -> usize {
    let padded = size + 2 * pad;
    assert!(
        window <= padded,
        "window of {window} does not fit an input of {size} padded by {pad}"
    );
    1 + (padded - window) / stride
}

/// Convolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvParam {
    /// Pixels between adjacent receptive fields, both directions.
    pub stride: usize,
    /// Zero padding added on each side of both spatial axes.
    pub pad: usize,
}

impl Default for ConvParam {
    fn default() -> Self {
        Self { stride: 1, pad: 0 }
    }
}

impl Bounds for ConvParam {
    const LAYER: &'static str = "convolution";

    fn violation(&self) -> Option<&'static str> {
        (self.stride == 0).then_some("stride must be at least 1")
    }
}

impl ConvParam {
    /// # Errors
    /// Fails if `stride` is zero.
    pub fn new(stride: usize, pad: usize) -> Result<Self> {
        Self { stride, pad }.checked()
    }

    /// Stride 1 with the padding that preserves spatial size for an odd `filter_size`.
    pub fn same(filter_size: usize) -> Self {
        Self { stride: 1, pad: filter_size.saturating_sub(1) / 2 }
    }

    /// `(H', W')` for an `h × w` input and an `hh × ww` filter.
    pub fn output_dims(&self, h: usize, w: usize, hh: usize, ww: usize) -> (usize, usize) {
        (
            window_output(h, hh, self.pad, self.stride),
            window_output(w, ww, self.pad, self.stride),
        )
    }
}

/// Max-pooling settings. Pooling never pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParam {
    pub pool_height: usize,
    pub pool_width: usize,
    pub stride: usize,
}

impl Default for PoolParam {
    fn default() -> Self {
        Self { pool_height: 2, pool_width: 2, stride: 2 }
    }
}

impl Bounds for PoolParam {
    const LAYER: &'static str = "max pool";

    fn violation(&self) -> Option<&'static str> {
        if self.pool_height == 0 || self.pool_width == 0 {
            Some("pool window must be at least 1×1")
        } else if self.stride == 0 {
            Some("stride must be at least 1")
        } else {
            None
        }
    }
}

impl PoolParam {
    /// # Errors
    /// Fails if the window or the stride is zero.
    pub fn new(pool_height: usize, pool_width: usize, stride: usize) -> Result<Self> {
        Self { pool_height, pool_width, stride }.checked()
    }

    /// `(H', W')` for an `h × w` input.
    pub fn output_dims(&self, h: usize, w: usize) -> (usize, usize) {
        (
            window_output(h, self.pool_height, 0, self.stride),
            window_output(w, self.pool_width, 0, self.stride),
        )
    }
}

/// Batch normalization settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchNormParam {
    pub mode: Mode,
    /// Added to the variance before the square root.
    pub eps: f64,
    /// Weight of the old running statistic in each update; 0 forgets, 1 never learns.
    pub momentum: f64,
}

impl Default for BatchNormParam {
    fn default() -> Self {
        Self { mode: Mode::Train, eps: 1e-5, momentum: 0.9 }
    }
}

impl Bounds for BatchNormParam {
    const LAYER: &'static str = "batch norm";

    fn violation(&self) -> Option<&'static str> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            Some("eps must be finite and positive")
        } else if !(0.0..=1.0).contains(&self.momentum) {
            Some("momentum must lie in [0, 1]")
        } else {
            None
        }
    }
}

impl BatchNormParam {
    /// Default `eps` and `momentum` in the given mode.
    pub fn new(mode: Mode) -> Self {
        Self { mode, ..Self::default() }
    }

    /// # Errors
    /// Fails unless `eps` is finite and positive.
    pub fn with_eps(self, eps: f64) -> Result<Self> {
        Self { eps, ..self }.checked()
    }

    /// # Errors
    /// Fails unless `momentum` lies in `[0, 1]`.
    pub fn with_momentum(self, momentum: f64) -> Result<Self> {
        Self { momentum, ..self }.checked()
    }
}

/// Exponentially averaged per-feature statistics used by batch norm at test time.
///
/// Training-mode calls take it by `&mut`, so a record shared between workers has
/// to sit behind a lock; the read-update-store sequence is then one critical
/// section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunningStats {
    pub mean: Vec<f64>,
    pub var: Vec<f64>,
}

impl RunningStats {
    /// Zero-initialized statistics for `features` features.
    pub fn new(features: usize) -> Self {
        Self { mean: vec![0.0; features], var: vec![0.0; features] }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// True only when neither `mean` nor `var` holds any entries.
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty() && self.var.is_empty()
    }

    /// Sizes an empty record to `features` zeros.
    ///
    /// # Panics
    /// Panics if a non-empty record tracks a different number of features.
    pub(crate) fn ensure_features(&mut self, features: usize) {
        if self.is_empty() {
            *self = Self::new(features);
        }
        assert!(
            self.mean.len() == features && self.var.len() == features,
            "running statistics track {} features, input has {}",
            self.mean.len(),
            features
        );
    }
}

/// Inverted dropout settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropoutParam {
    /// Probability of dropping each activation.
    pub p: f64,
    pub mode: Mode,
    /// Fixes the mask for reproducible gradient checks.
    pub seed: Option<u64>,
}

impl Bounds for DropoutParam {
    const LAYER: &'static str = "dropout";

    fn violation(&self) -> Option<&'static str> {
        (!(0.0..1.0).contains(&self.p)).then_some("drop probability must lie in [0, 1)")
    }
}

impl DropoutParam {
    /// # Errors
    /// Fails unless `p` lies in `[0, 1)`.
    pub fn new(p: f64, mode: Mode) -> Result<Self> {
        Self { p, mode, seed: None }.checked()
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed: Some(seed), ..self }
    }
}

impl_validate!(ConvParam, PoolParam, BatchNormParam, DropoutParam);
