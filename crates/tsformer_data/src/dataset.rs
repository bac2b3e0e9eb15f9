//! In-memory series dataset.

use ndarray::{Array2, Array3, Axis};

use crate::error::{DataError, Result};

/// A dataset of fixed-length multivariate series.
///
/// Stores samples in the `(N, V, L)` layout with optional encoded class indices.
/// Raw label values go through a [`LabelEncoder`](crate::LabelEncoder) first.
///
/// # Example
///
/// ```rust
/// use ndarray::Array3;
/// use tsformer_data::SeriesDataset;
///
/// let x = Array3::<f32>::zeros((10, 4, 23));
/// let ds = SeriesDataset::from_arrays(x, Some(vec![0; 10])).unwrap();
/// assert_eq!(ds.shape(), (10, 4, 23));
/// ```
#[derive(Debug, Clone)]
pub struct SeriesDataset {
    x: Array3<f32>,
    y: Option<Vec<usize>>,
}

impl SeriesDataset {
    /// Create a dataset from a `(N, V, L)` array and optional class indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of labels differs from the number of samples.
    pub fn from_arrays(x: Array3<f32>, y: Option<Vec<usize>>) -> Result<Self> {
        let n_samples = x.shape()[0];
        if let Some(ref labels) = y {
            if labels.len() != n_samples {
                return Err(DataError::InvalidShape(format!(
                    "x has {} samples but y has {} labels",
                    n_samples,
                    labels.len()
                )));
            }
        }
        Ok(Self { x, y })
    }

    /// Create a dataset from a channels-last `(N, L, V)` array.
    ///
    /// The array is transposed to `(N, V, L)` and stored contiguously.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of labels differs from the number of samples.
    pub fn from_channels_last(x: Array3<f32>, y: Option<Vec<usize>>) -> Result<Self> {
        let x = x.permuted_axes([0, 2, 1]).as_standard_layout().to_owned();
        Self::from_arrays(x, y)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    /// Whether the dataset has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of variables.
    #[must_use]
    pub fn n_vars(&self) -> usize {
        self.x.shape()[1]
    }

    /// Sequence length.
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.x.shape()[2]
    }

    /// Shape as `(N, V, L)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        let s = self.x.shape();
        (s[0], s[1], s[2])
    }

    /// The input array.
    #[must_use]
    pub fn x(&self) -> &Array3<f32> {
        &self.x
    }

    /// Encoded class indices, if labeled.
    #[must_use]
    pub fn labels(&self) -> Option<&[usize]> {
        self.y.as_deref()
    }

    /// Whether the dataset carries labels.
    #[must_use]
    pub fn has_labels(&self) -> bool {
        self.y.is_some()
    }

    /// A single sample `(V, L)` and its class index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn get(&self, idx: usize) -> Result<(Array2<f32>, Option<usize>)> {
        if idx >= self.len() {
            return Err(DataError::IndexOutOfBounds {
                index: idx,
                length: self.len(),
            });
        }
        let x = self.x.index_axis(Axis(0), idx).to_owned();
        let y = self.y.as_ref().map(|labels| labels[idx]);
        Ok((x, y))
    }

    /// A new dataset holding the samples at `indices`, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if any index is out of bounds.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        let n = self.len();
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(DataError::IndexOutOfBounds {
                index: bad,
                length: n,
            });
        }
        let x = self.x.select(Axis(0), indices);
        let y = self
            .y
            .as_ref()
            .map(|labels| indices.iter().map(|&i| labels[i]).collect());
        Ok(Self { x, y })
    }
}
