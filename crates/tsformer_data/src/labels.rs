//! Label encoding.

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Maps integer class values to dense indices `0..n_classes`.
///
/// Fit once on the training labels and reuse for validation and test data.
/// The fitted classes are sorted, so index order matches label order.
///
/// # Example
///
/// ```rust
/// use tsformer_data::LabelEncoder;
///
/// let mut enc = LabelEncoder::new();
/// enc.fit(&[7, 3, 7, 5]);
/// assert_eq!(enc.classes(), &[3, 5, 7]);
/// assert_eq!(enc.transform(&[7, 3]).unwrap(), vec![2, 0]);
/// assert!(enc.transform(&[4]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<i64>,
}

impl LabelEncoder {
    /// An unfitted encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder with known classes, e.g. restored from checkpoint metadata.
    #[must_use]
    pub fn from_classes(mut classes: Vec<i64>) -> Self {
        classes.sort_unstable();
        classes.dedup();
        Self { classes }
    }

    /// Learn the sorted set of distinct labels.
    pub fn fit(&mut self, labels: &[i64]) -> &mut Self {
        self.classes = labels.to_vec();
        self.classes.sort_unstable();
        self.classes.dedup();
        self
    }

    /// Whether `fit` has been called with a non-empty label set.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    /// The fitted classes in index order.
    #[must_use]
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Number of fitted classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Encode label values into class indices.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownLabel`] for a value not seen during `fit`.
    pub fn transform(&self, labels: &[i64]) -> Result<Vec<usize>> {
        if !self.is_fitted() {
            return Err(DataError::NotFitted);
        }
        labels
            .iter()
            .map(|label| {
                self.classes
                    .binary_search(label)
                    .map_err(|_| DataError::UnknownLabel(*label))
            })
            .collect()
    }

    /// Fit then transform.
    ///
    /// # Errors
    ///
    /// Returns an error if `labels` is empty.
    pub fn fit_transform(&mut self, labels: &[i64]) -> Result<Vec<usize>> {
        self.fit(labels);
        self.transform(labels)
    }

    /// Decode class indices back into label values.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownClass`] for an index past the fitted classes.
    pub fn inverse_transform(&self, indices: &[usize]) -> Result<Vec<i64>> {
        indices
            .iter()
            .map(|&index| {
                self.classes
                    .get(index)
                    .copied()
                    .ok_or(DataError::UnknownClass {
                        index,
                        n_classes: self.classes.len(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_and_dedups() {
        let mut enc = LabelEncoder::new();
        enc.fit(&[2, -1, 2, 9, -1]);
        assert_eq!(enc.classes(), &[-1, 2, 9]);
        assert_eq!(enc.n_classes(), 3);
    }

    #[test]
    fn test_transform_unknown_label() {
        let mut enc = LabelEncoder::new();
        enc.fit(&[0, 1]);
        match enc.transform(&[0, 2]) {
            Err(DataError::UnknownLabel(2)) => {}
            other => panic!("expected UnknownLabel, got {:?}", other),
        }
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let enc = LabelEncoder::new();
        assert!(matches!(enc.transform(&[1]), Err(DataError::NotFitted)));
    }

    #[test]
    fn test_inverse_transform() {
        let mut enc = LabelEncoder::new();
        let encoded = enc.fit_transform(&[10, 20, 10, 30]).unwrap();
        assert_eq!(encoded, vec![0, 1, 0, 2]);
        assert_eq!(enc.inverse_transform(&encoded).unwrap(), vec![10, 20, 10, 30]);
        assert!(enc.inverse_transform(&[3]).is_err());
    }

    #[test]
    fn test_from_classes_matches_fit() {
        let mut fitted = LabelEncoder::new();
        fitted.fit(&[5, 1, 3]);
        assert_eq!(LabelEncoder::from_classes(vec![3, 5, 1]), fitted);
    }
}
