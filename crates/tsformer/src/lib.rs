//! # tsformer
//!
//! Transformer classifiers for fixed-length multivariate time series, with
//! masked-autoencoder pretraining.
//!
//! - **Data**: datasets, seeded loaders, splits, label encoding, `.npy` I/O
//! - **Models**: ViT classifier, masked autoencoder, MAE classifier
//! - **Training**: staged pretrain / linear / fine-tune pipelines
//! - **Analysis**: metrics, confusion matrix, evaluation artifacts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tsformer::prelude::*;
//!
//! let x = read_npy("data/x_train.npy")?;
//! let y = read_labels_npy("data/y_train.npy")?;
//!
//! let config = MaePipelineConfig::new(SeriesShape::new(4, 23), 3, "checkpoints")
//!     .with_mask_ratio(0.75);
//! let mut pipeline = MaePipeline::<Autodiff<NdArray>>::new(config, Default::default())?;
//!
//! pipeline.pretrain(&x, 50, 32)?;
//! pipeline.train(TrainingMode::Linear, &x, Some(&y), 20, 32, None)?;
//! let report = pipeline.evaluate(&x_test, &y_test, "mae_linear")?;
//! println!("accuracy: {:.3}", report.accuracy);
//! ```
//!
//! ## Feature Flags
//!
//! - `backend-ndarray` (default): CPU backend using ndarray
//! - `backend-wgpu`: GPU backend using WGPU

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use tsformer_analysis as analysis;
pub use tsformer_core as core;
pub use tsformer_data as data;
pub use tsformer_models as models;
pub use tsformer_train as train;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tsformer::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tsformer_core::{Seed, SeriesBatch, SeriesClassifier, SeriesShape};

    // Data
    pub use tsformer_data::{
        read_labels_npy, read_npy, train_valid_split, write_npy, LabelEncoder, SeriesDataLoader,
        SeriesDataLoaders, SeriesDataset,
    };

    // Models
    pub use tsformer_models::{
        random_masking, MaeClassifier, MaeConfig, MaskedAutoencoder, ViTClassifier, ViTConfig,
    };

    // Training
    pub use tsformer_train::{
        EvaluationReport, LrSchedule, MaePipeline, MaePipelineConfig, ModelStage, TrainerConfig,
        TrainingHistory, TrainingMode, ViTPipeline, ViTPipelineConfig,
    };

    // Analysis
    pub use tsformer_analysis::{calculate_metrics, print_metrics_summary, ConfusionMatrix};

    #[cfg(feature = "backend-ndarray")]
    pub use tsformer_core::backend::NdArray;
}
