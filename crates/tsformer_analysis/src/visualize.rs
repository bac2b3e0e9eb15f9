//! Evaluation artifacts written to disk.
//!
//! For a model name `m` the following files are produced under the output directory:
//! - `m_predictions.csv`: index, true label, predicted label, class probabilities
//! - `m_confusion.json`: confusion matrix with counts and row-normalized rates
//! - `m_report.txt`: classification report, weakest class and confusion table
//! - `m_class_profiles.csv`: per-class mean series, one row per (class, variable)

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, Axis};
use serde::Serialize;

use crate::confusion::ConfusionMatrix;
use crate::error::{AnalysisError, Result};
use crate::report::ClassificationReport;

/// Paths of the files written by [`save_visualizations`].
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationArtifacts {
    /// Prediction table.
    pub predictions: PathBuf,
    /// Confusion matrix JSON.
    pub confusion: PathBuf,
    /// Text report.
    pub report: PathBuf,
    /// Mean-profile table.
    pub class_profiles: PathBuf,
}

#[derive(Serialize)]
struct ConfusionArtifact<'a> {
    #[serde(flatten)]
    counts: &'a ConfusionMatrix,
    normalized: Vec<Vec<f32>>,
}

/// Write evaluation artifacts for `model_name` under `out_dir`.
///
/// `x` is `(N, V, L)`, `probabilities` is `(N, n_classes)` with columns in
/// class-index order.
///
/// # Errors
///
/// Returns an error if the inputs are not aligned or a file cannot be written.
pub fn save_visualizations(
    out_dir: impl AsRef<Path>,
    model_name: &str,
    x: &Array3<f32>,
    y_true: &[i64],
    y_pred: &[i64],
    probabilities: &Array2<f32>,
) -> Result<VisualizationArtifacts> {
    let n = y_true.len();
    if x.shape()[0] != n || probabilities.nrows() != n {
        return Err(AnalysisError::LengthMismatch(format!(
            "x has {} samples, probabilities {}, labels {}",
            x.shape()[0],
            probabilities.nrows(),
            n
        )));
    }

    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let cm = ConfusionMatrix::from_predictions(y_true, y_pred)?;
    let report = ClassificationReport::from_confusion(&cm);

    let artifacts = VisualizationArtifacts {
        predictions: out_dir.join(format!("{}_predictions.csv", model_name)),
        confusion: out_dir.join(format!("{}_confusion.json", model_name)),
        report: out_dir.join(format!("{}_report.txt", model_name)),
        class_profiles: out_dir.join(format!("{}_class_profiles.csv", model_name)),
    };

    std::fs::write(&artifacts.predictions, predictions_csv(y_true, y_pred, probabilities))?;
    let confusion = ConfusionArtifact {
        counts: &cm,
        normalized: cm.normalize(),
    };
    std::fs::write(&artifacts.confusion, serde_json::to_string_pretty(&confusion)?)?;

    let mut text = format!("{}\n\n{}\n", model_name, report.to_string_table());
    if let Some(worst) = report.worst_class() {
        let _ = writeln!(
            text,
            "Worst class: {} (f1 {:.4}, support {})\n",
            worst.class, worst.f1_score, worst.support
        );
    }
    text.push_str(&cm.to_string_table());
    std::fs::write(&artifacts.report, text)?;
    std::fs::write(&artifacts.class_profiles, class_profiles_csv(x, y_true))?;

    tracing::info!("Saved evaluation artifacts for {} to {}", model_name, out_dir.display());
    Ok(artifacts)
}

fn predictions_csv(y_true: &[i64], y_pred: &[i64], probabilities: &Array2<f32>) -> String {
    let mut csv = String::from("index,true,pred");
    for c in 0..probabilities.ncols() {
        let _ = write!(csv, ",prob_{}", c);
    }
    csv.push('\n');

    for (i, row) in probabilities.outer_iter().enumerate() {
        let _ = write!(csv, "{},{},{}", i, y_true[i], y_pred[i]);
        for p in row {
            let _ = write!(csv, ",{:.6}", p);
        }
        csv.push('\n');
    }
    csv
}

fn class_profiles_csv(x: &Array3<f32>, y_true: &[i64]) -> String {
    let seq_len = x.shape()[2];
    let mut csv = String::from("class,variable");
    for t in 0..seq_len {
        let _ = write!(csv, ",t{}", t);
    }
    csv.push('\n');

    let mut classes = y_true.to_vec();
    classes.sort_unstable();
    classes.dedup();

    for class in classes {
        let members: Vec<usize> = y_true
            .iter()
            .enumerate()
            .filter(|(_, y)| **y == class)
            .map(|(i, _)| i)
            .collect();
        let Some(mean) = x.select(Axis(0), &members).mean_axis(Axis(0)) else {
            continue;
        };
        for (v, series) in mean.outer_iter().enumerate() {
            let _ = write!(csv, "{},{}", class, v);
            for value in series {
                let _ = write!(csv, ",{:.6}", value);
            }
            csv.push('\n');
        }
    }
    csv
}
