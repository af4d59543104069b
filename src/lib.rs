//! # `backprop_layers`
//!
//! Forward/backward layer primitives for training small convolutional
//! networks by manual backpropagation.
//!
//! Every layer is a pair of plain functions. The forward function returns its
//! output together with a cache; the backward function consumes that cache and
//! an upstream gradient and returns one gradient per forward input, shaped like
//! that input. A model is assembled by calling forwards in architecture order
//! and backwards in reverse.
//!
//! ## Features
//!
//! - **Layers**: affine, ReLU, batch normalization (vanilla and spatial),
//!   inverted dropout, 2D convolution, 2D max pooling
//! - **Losses**: multiclass SVM and numerically stable softmax cross-entropy
//! - **Backends**: loop-based reference kernels and a batched matrix-product
//!   form for convolution, switchable at runtime via [`backend`]
//! - **Tooling**: central-difference gradient checks in [`gradcheck`]
//! - **Consumers**: layer sandwiches and a three-layer convnet in
//!   [`sandwich`] and [`classifiers`]
//!
//! ## Modules
//!
//! - [`tensors`]: the `Tensor<T>` container and the `tensor!` macro
//! - [`config`]: typed per-layer settings and batch norm running statistics
//! - [`error`]: [`LayerError`](error::LayerError)
//! - [`ops`]: numeric kernels and backend dispatch
//! - [`layers`]: the forward/backward pairs
//! - [`loss`]: terminal losses
//!
//! Training loops, optimizers, data loading and parameter persistence are left
//! to the caller.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (backend choice, running statistic
//! updates, dropout masks, network losses) and installs no subscriber.
//!
//! ## Example
//!
//! ```rust
//! use backprop_layers::layers::{affine_backward, affine_forward, relu_backward, relu_forward};
//! use backprop_layers::loss::softmax_loss;
//! use backprop_layers::tensors::Ten64;
//!
//! let x = Ten64::from_fn(vec![4, 3], |i| i as f64 * 0.1);
//! let w = Ten64::from_fn(vec![3, 2], |i| 0.05 * i as f64);
//! let b = Ten64::zeros(vec![2]);
//!
//! let (a, affine_cache) = affine_forward(&x, &w, &b);
//! let (scores, relu_cache) = relu_forward(&a);
//! let (loss, dscores) = softmax_loss(&scores, &[0, 1, 1, 0])?;
//! let da = relu_backward(&dscores, relu_cache);
//! let (dx, dw, db) = affine_backward(&da, affine_cache);
//!
//! assert!(loss > 0.0);
//! assert_eq!((dx.shape, dw.shape, db.shape), (x.shape, w.shape, b.shape));
//! # Ok::<(), backprop_layers::error::LayerError>(())
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::many_single_char_names,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::type_complexity,
    clippy::missing_panics_doc
)]
#![deny(unsafe_code)]
#![forbid(unused_must_use)]

pub mod backend;
pub mod classifiers;
pub mod config;
pub mod error;
pub mod gradcheck;
pub mod layers;
pub mod loss;
pub mod ops;
pub mod sandwich;
pub mod tensors;
