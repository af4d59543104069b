//! Operation Dispatch Layer
//!
//! This module selects the convolution and pooling implementation at runtime,
//! based on the global [`Backend`].
//!
//! # Design Highlights
//! - **Pluggable**: both implementations share one signature per operation
//! - **Minimal overhead**: one atomic load per call
//! - **Observable**: the chosen backend is recorded as a `tracing` trace event

use tracing::trace;

use super::{batched, reference};
use crate::backend::{get_backend, Backend};
use crate::config::{ConvParam, PoolParam};
use crate::tensors::Ten64;

/// Dispatches the convolution forward pass.
pub fn conv_forward(x: &Ten64, w: &Ten64, b: &Ten64, param: &ConvParam) -> Ten64 {
    let backend = get_backend();
    trace!(?backend, x = ?x.shape, w = ?w.shape, "conv forward");
    match backend {
        Backend::Batched => batched::conv_forward(x, w, b, param),
        Backend::Reference => reference::conv_forward(x, w, b, param),
    }
}

/// Dispatches the convolution backward pass.
///
/// # Returns
/// `(dx, dw, db)` shaped like `x`, `w` and `b`.
pub fn conv_backward(
    dout: &Ten64,
    x: &Ten64,
    w: &Ten64,
    b: &Ten64,
    param: &ConvParam,
) -> (Ten64, Ten64, Ten64) {
    let backend = get_backend();
    trace!(?backend, dout = ?dout.shape, "conv backward");
    match backend {
        Backend::Batched => batched::conv_backward(dout, x, w, b, param),
        Backend::Reference => reference::conv_backward(dout, x, w, b, param),
    }
}

/// Dispatches the max-pool forward pass.
pub fn max_pool_forward(x: &Ten64, param: &PoolParam) -> Ten64 {
    let backend = get_backend();
    trace!(?backend, x = ?x.shape, "max pool forward");
    match backend {
        Backend::Batched => batched::max_pool_forward(x, param),
        Backend::Reference => reference::max_pool_forward(x, param),
    }
}

/// Dispatches the max-pool backward pass.
pub fn max_pool_backward(dout: &Ten64, x: &Ten64, param: &PoolParam) -> Ten64 {
    let backend = get_backend();
    trace!(?backend, dout = ?dout.shape, "max pool backward");
    match backend {
        Backend::Batched => batched::max_pool_backward(dout, x, param),
        Backend::Reference => reference::max_pool_backward(dout, x, param),
    }
}
