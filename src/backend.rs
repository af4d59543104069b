//! Backend selection module.
//!
//! This module defines the available implementations of the spatial layers
//! (convolution and max pooling) and provides functions to set and get the
//! current one.
//!
//! # Supported Backends
//!
//! - `Batched`: Per-output-position matrix products and plane-parallel pooling (default).
//! - `Reference`: Straightforward nested loops over every output element.
//!
//! Both produce the same values up to floating-point summation order; the
//! reference backend exists to cross-check the batched one.
//!
//! The backend is stored globally using an `AtomicU8`, enabling fast
//! switching at runtime. It is a performance setting only and carries no
//! model state.

use core::convert::TryFrom;
use core::sync::atomic::{AtomicU8, Ordering};

/// Enumeration of spatial layer implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Matrix-product formulation, parallelized with `rayon`.
    #[default]
    Batched = 0,
    /// Loop-based formulation used for correctness checks.
    Reference,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Batched),
            1 => Ok(Self::Reference),
            _ => Err(()),
        }
    }
}

/// Internal global state for the active backend.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Batched as u8);

/// Sets the backend used by the dispatching spatial layer functions.
///
/// # Example
///
/// ```
/// use backprop_layers::backend::{get_backend, set_backend, Backend};
/// set_backend(Backend::Reference);
/// assert_eq!(get_backend(), Backend::Reference);
/// set_backend(Backend::Batched);
/// ```
pub fn set_backend(b: Backend) {
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the currently active backend.
///
/// If the stored value is invalid, defaults to [`Backend::Batched`].
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}
