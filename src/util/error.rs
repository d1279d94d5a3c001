//! Error types for detout.

use thiserror::Error;

/// Result alias for detout operations.
pub type DetOutResult<T> = std::result::Result<T, DetOutError>;

/// Errors raised by the detection output pipeline.
///
/// Every variant is fatal for the forward call that produced it; the
/// pipeline never recovers from one internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetOutError {
    /// A required configuration field is missing or out of range.
    #[error("invalid configuration for `{field}`: {reason}")]
    Configuration {
        field: &'static str,
        reason: &'static str,
    },
    /// A tensor or buffer does not have the size implied by the configuration.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    /// A label present on one side of the pipeline is missing on the other.
    #[error("could not find {context} for label {label}")]
    InconsistentLabel { label: i32, context: &'static str },
    /// A size derived from shapes or configured widths does not fit in `usize`.
    #[error("size overflow computing {context}")]
    SizeOverflow { context: &'static str },
    /// An index is outside the valid range.
    #[error("index out of bounds for {context}: index {index}, len {len}")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
}
