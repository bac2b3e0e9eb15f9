//! Error types for tsformer_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by shape and configuration checks.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid tensor or array shape.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// Shape mismatch between two tensors.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A configuration value is outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
