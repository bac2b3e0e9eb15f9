//! Error types for training.

use thiserror::Error;

use crate::mode::{ModelStage, TrainingMode};

/// Result type alias for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Errors that can occur during training and evaluation.
#[derive(Error, Debug)]
pub enum TrainError {
    /// The requested training mode is not allowed from the current stage.
    #[error("Cannot run {mode} training from stage {from}")]
    InvalidStage {
        /// Current stage.
        from: ModelStage,
        /// Requested mode.
        mode: TrainingMode,
    },

    /// Labels were needed but not given.
    #[error("Labels required: {0}")]
    MissingTargets(String),

    /// Evaluation or prediction before any classifier was trained or loaded.
    #[error("No trained classifier; train or load a checkpoint first")]
    NotTrained,

    /// Input does not match the configured shape or label count.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Checkpoint metadata describes another architecture.
    #[error("Checkpoint is for architecture '{got}', expected '{expected}'")]
    ArchMismatch {
        /// Expected architecture.
        expected: String,
        /// Architecture in the metadata.
        got: String,
    },

    /// Checkpoint error.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] tsformer_models::CheckpointError),

    /// Data error.
    #[error("Data error: {0}")]
    Data(#[from] tsformer_data::DataError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] tsformer_core::CoreError),

    /// Metrics or artifact error.
    #[error("Analysis error: {0}")]
    Analysis(#[from] tsformer_analysis::AnalysisError),
}
