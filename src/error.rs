//! Error type shared by every layer.
//!
//! Only conditions that a caller can reasonably recover from are reported
//! through [`LayerError`]. Incompatible tensor shapes are programming errors and
//! panic at the arithmetic that detects them, the same way an out-of-bounds
//! slice index does.

/// Errors raised by layer configuration and loss evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    /// A mode string other than `"train"` or `"test"`.
    #[error("invalid layer mode \"{0}\" (expected \"train\" or \"test\")")]
    InvalidMode(String),

    /// A configuration record violates one of its documented bounds.
    #[error("invalid {layer} configuration: {reason}")]
    InvalidConfig {
        layer: &'static str,
        reason: &'static str,
    },

    /// A class label that does not index a column of the score matrix.
    #[error("label {label} at sample {index} is out of range for {classes} classes")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        classes: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, LayerError>;
