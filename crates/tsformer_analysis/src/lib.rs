//! # tsformer_analysis
//!
//! Evaluation collaborators for tsformer:
//! - [`ConfusionMatrix`] and [`ClassificationReport`] (per-class precision, recall, F1)
//! - [`calculate_metrics`] / [`print_metrics_summary`]: flat metric maps for reports
//! - [`save_visualizations`]: prediction and profile artifacts written to disk

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod confusion;
mod error;
mod metrics;
mod report;
mod visualize;

pub use confusion::ConfusionMatrix;
pub use error::{AnalysisError, Result};
pub use metrics::{calculate_metrics, format_metrics_summary, print_metrics_summary};
pub use report::{classification_report, ClassMetrics, ClassificationReport};
pub use visualize::{save_visualizations, VisualizationArtifacts};
