//! # Operation Dispatch Layer
//!
//! This module holds the numeric kernels behind the layer functions and
//! dispatches the spatial ones across the two implementations.
//!
//! ## Submodules
//!
//! - [`cpu`]: Row-parallel dense matrix products shared by every layer
//! - [`reference`]: Loop-based convolution and max pooling
//! - [`batched`]: Matrix-product convolution and plane-parallel max pooling
//! - [`dispatch`]: Runtime backend switching for the spatial kernels
//!
//! ## Backend Selection
//!
//! Callers normally go through [`crate::layers`]; the functions there use
//! [`dispatch`], which consults [`crate::backend::get_backend`]. The backend
//! modules stay public so tests can compare them directly.
//!
//! ## Extending the Backend
//!
//! To add a new spatial operation:
//!
//! 1. Implement it in both backends (e.g. `reference::my_op`, `batched::my_op`)
//! 2. Add it to the `dispatch` module for unified access
//! 3. Keep shape checks in the backend-agnostic helpers below

use crate::tensors::Ten64;

pub mod batched;
pub mod cpu;
pub mod dispatch;
pub mod reference;

/// Flat index (within one `h × w` plane) and value of the largest element of
/// the `ph × pw` window whose top-left corner is `(top, left)`.
///
/// Ties resolve to the first maximum in row-major scan order, so both
/// backends route max-pool gradients to the same element.
#[inline]
pub(crate) fn window_argmax(
    plane: &[f64],
    width: usize,
    top: usize,
    left: usize,
    ph: usize,
    pw: usize,
) -> (usize, f64) {
    let mut best = (top * width + left, plane[top * width + left]);
    for r in top..top + ph {
        for c in left..left + pw {
            let v = plane[r * width + c];
            if v > best.1 {
                best = (r * width + c, v);
            }
        }
    }
    best
}

/// Checks the filter bank and bias against the input and returns
/// `(N, C, H, W, F, HH, WW)`.
///
/// # Panics
/// Panics if channel counts or the bias length disagree.
pub(crate) fn conv_dims(
    x: &Ten64,
    w: &Ten64,
    b: &Ten64,
) -> (usize, usize, usize, usize, usize, usize, usize) {
    let (n, c, h, wd) = x.dims4();
    let (f, wc, hh, ww) = w.dims4();
    assert_eq!(c, wc, "input has {c} channels but filters expect {wc}");
    assert_eq!(b.len(), f, "bias has {} entries for {f} filters", b.len());
    (n, c, h, wd, f, hh, ww)
}
