//! Error types for tsformer_analysis.

use thiserror::Error;

/// Result type alias using [`AnalysisError`].
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while computing metrics or writing artifacts.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Inputs that must be aligned have different lengths.
    #[error("Length mismatch: {0}")]
    LengthMismatch(String),

    /// No samples to evaluate.
    #[error("No samples to evaluate")]
    Empty,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
