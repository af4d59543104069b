//! Differentiable layer primitives.
//!
//! # Forward/Backward Pairs
//!
//! Provides the building blocks of manual backpropagation for small
//! convolutional classifiers.
//!
//! **Key Features:**
//! - **Affine:** fully connected transform over a flattened batch.
//! - **ReLU:** zero-out non-positive inputs and their gradients.
//! - **Batch normalization:** vanilla `(N, D)` and spatial `(N, C, H, W)` variants
//!   with caller-owned running statistics.
//! - **Dropout:** inverted dropout with optional fixed seed.
//! - **Convolution / max pooling:** dispatched to the active [`crate::backend::Backend`].
//!
//! ## Pattern
//!
//! Each layer follows the same pattern:
//! 1. **Forward** takes tensors by reference and returns the output together with
//!    a cache holding exactly what the backward pass needs.
//! 2. **Backward** takes the upstream gradient and consumes that cache, returning
//!    one gradient per forward input, each shaped like the input it belongs to.
//! 3. Nothing is written through a caller's buffer except the batch norm
//!    [`RunningStats`](crate::config::RunningStats) in training mode.
//!
//! ## Usage Guidelines
//!
//! - Operations **panic** on shape mismatches; ensure consistent tensor dimensions.
//! - Hand every cache to the backward call paired with the forward call that made it.
//! - Compose layers by calling forwards in architecture order and backwards in
//!   reverse order; see [`crate::sandwich`] for common combinations.

mod affine;
mod batchnorm;
mod conv;
mod dropout;
mod pool;
mod relu;
mod spatial_batchnorm;

pub use affine::{affine_backward, affine_forward, AffineCache};
pub use batchnorm::{batchnorm_backward, batchnorm_backward_alt, batchnorm_forward, BatchNormCache};
pub use conv::{conv_backward, conv_forward, ConvCache};
pub use dropout::{dropout_backward, dropout_forward, DropoutCache};
pub use pool::{max_pool_backward, max_pool_forward, PoolCache};
pub use relu::{relu_backward, relu_forward, ReluCache};
pub use spatial_batchnorm::{
    spatial_batchnorm_backward, spatial_batchnorm_forward, SpatialBatchNormCache,
};
