//! Batch container passed from dataloaders to trainers.

use burn::prelude::*;

use crate::error::{CoreError, Result};

/// A batch of series with optional integer class targets.
///
/// `x` has shape `(B, V, L)`; `targets`, when present, has shape `(B,)` and holds
/// encoded class indices.
#[derive(Debug, Clone)]
pub struct SeriesBatch<B: Backend> {
    /// Input tensor of shape `(B, V, L)`.
    pub x: Tensor<B, 3>,
    /// Encoded class indices of shape `(B,)`.
    pub targets: Option<Tensor<B, 1, Int>>,
}

impl<B: Backend> SeriesBatch<B> {
    /// An unlabeled batch.
    #[must_use]
    pub fn new(x: Tensor<B, 3>) -> Self {
        Self { x, targets: None }
    }

    /// A labeled batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of targets differs from the batch size.
    pub fn with_targets(x: Tensor<B, 3>, targets: Tensor<B, 1, Int>) -> Result<Self> {
        let [batch, _, _] = x.dims();
        let [n] = targets.dims();
        if batch != n {
            return Err(CoreError::ShapeMismatch(format!(
                "batch has {} samples but {} targets",
                batch, n
            )));
        }
        Ok(Self {
            x,
            targets: Some(targets),
        })
    }

    /// Number of samples in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.dims()[0]
    }

    /// Whether the batch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Device the input tensor lives on.
    #[must_use]
    pub fn device(&self) -> B::Device {
        self.x.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_with_targets_checks_length() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::zeros([3, 2, 5], &device);
        let good = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(vec![0i64, 1, 0], [3]),
            &device,
        );
        let bad = Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![0i64, 1], [2]), &device);

        let batch = SeriesBatch::with_targets(x.clone(), good).unwrap();
        assert_eq!(batch.len(), 3);
        assert!(SeriesBatch::with_targets(x, bad).is_err());
    }
}
