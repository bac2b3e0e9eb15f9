//! Classification report with per-class metrics.
//!
//! Per-class precision, recall and F1 with macro (unweighted) and weighted
//! (by support) averages.

use serde::{Deserialize, Serialize};

use crate::confusion::ConfusionMatrix;
use crate::error::Result;

/// Metrics for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class label.
    pub class: i64,
    /// TP / (TP + FP)
    pub precision: f32,
    /// TP / (TP + FN)
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1_score: f32,
    /// True samples of this class.
    pub support: usize,
}

/// Per-class and aggregate classification metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Per-class metrics in label order.
    pub classes: Vec<ClassMetrics>,
    /// Overall accuracy.
    pub accuracy: f32,
    /// Unweighted mean of per-class precision.
    pub macro_precision: f32,
    /// Unweighted mean of per-class recall.
    pub macro_recall: f32,
    /// Unweighted mean of per-class F1.
    pub macro_f1: f32,
    /// Support-weighted precision.
    pub weighted_precision: f32,
    /// Support-weighted recall.
    pub weighted_recall: f32,
    /// Support-weighted F1.
    pub weighted_f1: f32,
    /// Number of samples.
    pub total_samples: usize,
}

impl ClassificationReport {
    /// Build a report from a confusion matrix.
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = cm
            .classes
            .iter()
            .enumerate()
            .map(|(i, &class)| ClassMetrics {
                class,
                precision: cm.precision(i),
                recall: cm.recall(i),
                f1_score: cm.f1(i),
                support: cm.support(i),
            })
            .collect();

        let n = classes.len().max(1) as f32;
        let total = cm.total();
        let weight = |c: &ClassMetrics| {
            if total == 0 {
                0.0
            } else {
                c.support as f32 / total as f32
            }
        };

        Self {
            accuracy: cm.accuracy(),
            macro_precision: classes.iter().map(|c| c.precision).sum::<f32>() / n,
            macro_recall: classes.iter().map(|c| c.recall).sum::<f32>() / n,
            macro_f1: classes.iter().map(|c| c.f1_score).sum::<f32>() / n,
            weighted_precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            weighted_recall: classes.iter().map(|c| c.recall * weight(c)).sum(),
            weighted_f1: classes.iter().map(|c| c.f1_score * weight(c)).sum(),
            total_samples: total,
            classes,
        }
    }

    /// Format the report as a table.
    pub fn to_string_table(&self) -> String {
        let mut output = String::new();
        output.push_str("              precision    recall  f1-score   support\n\n");

        for class in &self.classes {
            output.push_str(&format!(
                "{:>12}      {:.2}      {:.2}      {:.2}     {:5}\n",
                class.class, class.precision, class.recall, class.f1_score, class.support
            ));
        }

        output.push('\n');
        output.push_str(&format!(
            "{:>12}                          {:.2}     {:5}\n",
            "accuracy", self.accuracy, self.total_samples
        ));
        output.push_str(&format!(
            "{:>12}      {:.2}      {:.2}      {:.2}     {:5}\n",
            "macro avg", self.macro_precision, self.macro_recall, self.macro_f1, self.total_samples
        ));
        output.push_str(&format!(
            "{:>12}      {:.2}      {:.2}      {:.2}     {:5}\n",
            "weighted avg",
            self.weighted_precision,
            self.weighted_recall,
            self.weighted_f1,
            self.total_samples
        ));
        output
    }

    /// The class with the lowest F1 among classes with samples.
    pub fn worst_class(&self) -> Option<&ClassMetrics> {
        self.classes
            .iter()
            .filter(|c| c.support > 0)
            .min_by(|a, b| a.f1_score.total_cmp(&b.f1_score))
    }
}

/// Compute a classification report from true and predicted labels.
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
///
/// # Example
///
/// ```rust
/// use tsformer_analysis::classification_report;
///
/// let report = classification_report(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap();
/// assert_eq!(report.total_samples, 4);
/// println!("{}", report.to_string_table());
/// ```
pub fn classification_report(y_true: &[i64], y_pred: &[i64]) -> Result<ClassificationReport> {
    let cm = ConfusionMatrix::from_predictions(y_true, y_pred)?;
    Ok(ClassificationReport::from_confusion(&cm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let report = classification_report(&[0, 1, 2, 0, 1, 2], &[0, 1, 2, 0, 1, 2]).unwrap();
        assert!((report.accuracy - 1.0).abs() < 1e-6);
        assert!((report.macro_f1 - 1.0).abs() < 1e-6);
        assert!((report.weighted_f1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_average() {
        // class 0: 3 samples, all right; class 1: 1 sample, predicted 0
        let report = classification_report(&[0, 0, 0, 1], &[0, 0, 0, 0]).unwrap();
        let c0 = &report.classes[0];
        assert!((c0.precision - 0.75).abs() < 1e-6);
        assert!((c0.recall - 1.0).abs() < 1e-6);
        assert_eq!(report.classes[1].f1_score, 0.0);

        let expected_weighted = c0.f1_score * 0.75;
        assert!((report.weighted_f1 - expected_weighted).abs() < 1e-6);
        assert!((report.macro_f1 - c0.f1_score / 2.0).abs() < 1e-6);
        assert_eq!(report.worst_class().unwrap().class, 1);
    }

    #[test]
    fn test_table_lists_classes() {
        let report = classification_report(&[3, 7], &[3, 7]).unwrap();
        let table = report.to_string_table();
        assert!(table.contains("macro avg"));
        assert!(table.contains("weighted avg"));
        assert_eq!(table.lines().filter(|l| l.trim_start().starts_with('3')).count(), 1);
    }
}
