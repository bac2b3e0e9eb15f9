//! Error types for tsformer_data.

use thiserror::Error;

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur in data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Invalid data shape.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Empty dataset.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Index out of bounds.
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the collection.
        length: usize,
    },

    /// Batch size error.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// Split error.
    #[error("Split error: {0}")]
    SplitError(String),

    /// A label value was not seen when the encoder was fit.
    #[error("Unknown label {0}: not seen when the encoder was fit")]
    UnknownLabel(i64),

    /// An encoded class index has no label.
    #[error("Class index {index} out of range for {n_classes} classes")]
    UnknownClass {
        /// The requested index.
        index: usize,
        /// Number of fitted classes.
        n_classes: usize,
    },

    /// Label encoder used before `fit`.
    #[error("Label encoder has not been fit")]
    NotFitted,

    /// File format error.
    #[error("File format error: {0}")]
    FormatError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] tsformer_core::CoreError),
}
