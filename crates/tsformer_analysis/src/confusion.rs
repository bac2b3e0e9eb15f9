//! Confusion matrix over integer class labels.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Confusion matrix, rows are true classes and columns predicted classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Class labels in row/column order.
    pub classes: Vec<i64>,
    /// Counts, `matrix[true][pred]`.
    pub matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from aligned true and predicted labels.
    ///
    /// The class set is the sorted union of both label slices.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices differ in length or are empty.
    pub fn from_predictions(y_true: &[i64], y_pred: &[i64]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(AnalysisError::LengthMismatch(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(AnalysisError::Empty);
        }

        let mut classes: Vec<i64> = y_true.iter().chain(y_pred).copied().collect();
        classes.sort_unstable();
        classes.dedup();

        let n = classes.len();
        let mut matrix = vec![vec![0; n]; n];
        for (t, p) in y_true.iter().zip(y_pred) {
            // Both labels are in `classes` by construction.
            if let (Ok(i), Ok(j)) = (classes.binary_search(t), classes.binary_search(p)) {
                matrix[i][j] += 1;
            }
        }

        Ok(Self { classes, matrix })
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Fraction of samples on the diagonal.
    pub fn accuracy(&self) -> f32 {
        let correct: usize = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        ratio(correct, self.total())
    }

    /// True samples of class index `i`.
    pub fn support(&self, i: usize) -> usize {
        self.matrix[i].iter().sum()
    }

    /// Precision of class index `i`; 0 when nothing was predicted as `i`.
    pub fn precision(&self, i: usize) -> f32 {
        let predicted: usize = self.matrix.iter().map(|row| row[i]).sum();
        ratio(self.matrix[i][i], predicted)
    }

    /// Recall of class index `i`; 0 when the class has no samples.
    pub fn recall(&self, i: usize) -> f32 {
        ratio(self.matrix[i][i], self.support(i))
    }

    /// F1 score of class index `i`.
    pub fn f1(&self, i: usize) -> f32 {
        let p = self.precision(i);
        let r = self.recall(i);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Row-normalized matrix; non-empty rows sum to 1.
    pub fn normalize(&self) -> Vec<Vec<f32>> {
        self.matrix
            .iter()
            .map(|row| {
                let sum: usize = row.iter().sum();
                row.iter().map(|&v| ratio(v, sum)).collect()
            })
            .collect()
    }

    /// Text table with labels on both axes.
    pub fn to_string_table(&self) -> String {
        let mut s = String::from("true\\pred");
        for class in &self.classes {
            s.push_str(&format!("{:>8}", class));
        }
        s.push('\n');
        for (class, row) in self.classes.iter().zip(&self.matrix) {
            s.push_str(&format!("{:>9}", class));
            for count in row {
                s.push_str(&format!("{:>8}", count));
            }
            s.push('\n');
        }
        s
    }
}

pub(crate) fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let y_true = [0, 1, 1, 1, 2, 0];
        let y_pred = [0, 0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();

        assert_eq!(cm.classes, vec![0, 1, 2]);
        assert_eq!(cm.matrix[0][0], 1);
        assert_eq!(cm.matrix[1][0], 1);
        assert_eq!(cm.matrix[1][1], 2);
        assert_eq!(cm.matrix[0][2], 1);
        assert_eq!(cm.total(), 6);
    }

    #[test]
    fn test_metrics() {
        let cm = ConfusionMatrix::from_predictions(&[0, 1, 0, 1], &[0, 0, 1, 1]).unwrap();
        assert!((cm.accuracy() - 0.5).abs() < 1e-6);
        assert!((cm.precision(0) - 0.5).abs() < 1e-6);
        assert!((cm.recall(0) - 0.5).abs() < 1e-6);
        assert!((cm.f1(1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sparse_labels() {
        let cm = ConfusionMatrix::from_predictions(&[10, 30], &[10, 20]).unwrap();
        assert_eq!(cm.classes, vec![10, 20, 30]);
        assert_eq!(cm.support(1), 0);
        assert_eq!(cm.recall(1), 0.0);
        assert_eq!(cm.precision(1), 0.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(ConfusionMatrix::from_predictions(&[0, 1], &[0]).is_err());
        assert!(matches!(
            ConfusionMatrix::from_predictions(&[], &[]),
            Err(AnalysisError::Empty)
        ));
    }
}
