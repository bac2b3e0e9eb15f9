//! # tsformer_train
//!
//! Training and evaluation drivers for tsformer.
//!
//! - [`MaePipeline`]: masked-autoencoder lifecycle (pretrain, then linear head or fine-tune)
//! - [`ViTPipeline`]: direct supervised training of a [`ViTClassifier`](tsformer_models::ViTClassifier)
//! - [`ClassificationTrainer`] / [`PretrainTrainer`]: synchronous training loops
//! - [`TrainingMode`] / [`ModelStage`]: training modes and the stage machine
//! - Learning-rate schedules and losses
//!
//! ## Example
//!
//! ```rust,ignore
//! use tsformer_train::{MaePipeline, MaePipelineConfig, TrainingMode};
//!
//! let config = MaePipelineConfig::new(SeriesShape::new(4, 23), 3, "checkpoints");
//! let mut pipeline = MaePipeline::<Autodiff<NdArray>>::new(config, device)?;
//! pipeline.pretrain(&x_train, 20, 32)?;
//! pipeline.train(TrainingMode::FineTune, &x_train, Some(&y_train), 20, 32, None)?;
//! let report = pipeline.evaluate(&x_test, &y_test, "mae")?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
pub mod evaluation;
pub mod losses;
mod mode;
pub mod pipeline;
pub mod scheduler;
pub mod training;

pub use config::TrainerConfig;
pub use error::{Result, TrainError};
pub use evaluation::{evaluate_classifier, predict, EvaluationReport, Predictions};
pub use losses::{CrossEntropyLoss, ZeroMaskedMseLoss};
pub use mode::{ModelStage, TrainingMode};
pub use pipeline::{MaePipeline, MaePipelineConfig, StageOutput, ViTPipeline, ViTPipelineConfig};
pub use scheduler::{ConstantLR, LrSchedule, OneCycleLR, OneCycleLRConfig, Scheduler};
pub use training::{ClassificationTrainer, PretrainTrainer, TrainingHistory, TrainingOutput};
