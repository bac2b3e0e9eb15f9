//! Dataloaders producing Burn batches.

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::seq::SliceRandom;

use crate::dataset::SeriesDataset;
use crate::error::{DataError, Result};
use tsformer_core::{Seed, SeriesBatch};

/// Batched iteration over a [`SeriesDataset`].
///
/// # Example
///
/// ```rust,ignore
/// let loader = SeriesDataLoader::builder(dataset)
///     .batch_size(32)
///     .shuffle(true)
///     .seed(Seed::new(42))
///     .build()?;
///
/// for batch in loader.iter::<NdArray>(&device) {
///     let batch = batch?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SeriesDataLoader {
    dataset: SeriesDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Seed,
}

impl SeriesDataLoader {
    /// Start building a loader.
    #[must_use]
    pub fn builder(dataset: SeriesDataset) -> SeriesDataLoaderBuilder {
        SeriesDataLoaderBuilder::new(dataset)
    }

    /// The underlying dataset.
    #[must_use]
    pub fn dataset(&self) -> &SeriesDataset {
        &self.dataset
    }

    /// Samples per batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches one pass yields.
    #[must_use]
    pub fn n_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Total number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Whether the loader has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Iterate over batches for one pass.
    ///
    /// Shuffling uses the loader seed, so repeated calls give the same order.
    /// Use [`iter_epoch`](Self::iter_epoch) for a different order per epoch.
    #[must_use]
    pub fn iter<B: Backend>(&self, device: &B::Device) -> SeriesDataLoaderIter<'_, B> {
        SeriesDataLoaderIter::new(self, device.clone(), self.seed)
    }

    /// Iterate with a shuffle order derived from the loader seed and `epoch`.
    #[must_use]
    pub fn iter_epoch<B: Backend>(
        &self,
        device: &B::Device,
        epoch: usize,
    ) -> SeriesDataLoaderIter<'_, B> {
        let seed = self.seed.derive(&format!("epoch-{}", epoch));
        SeriesDataLoaderIter::new(self, device.clone(), seed)
    }
}

/// Builder for [`SeriesDataLoader`].
#[derive(Debug, Clone)]
pub struct SeriesDataLoaderBuilder {
    dataset: SeriesDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Seed,
}

impl SeriesDataLoaderBuilder {
    /// A builder with batch size 32, no shuffling.
    #[must_use]
    pub fn new(dataset: SeriesDataset) -> Self {
        Self {
            dataset,
            batch_size: 32,
            shuffle: false,
            drop_last: false,
            seed: Seed::default(),
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable dropping the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Build the loader.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero batch size or an empty dataset.
    pub fn build(self) -> Result<SeriesDataLoader> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.dataset.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        Ok(SeriesDataLoader {
            dataset: self.dataset,
            batch_size: self.batch_size,
            shuffle: self.shuffle,
            drop_last: self.drop_last,
            seed: self.seed,
        })
    }
}

/// Iterator over the batches of a [`SeriesDataLoader`].
pub struct SeriesDataLoaderIter<'a, B: Backend> {
    loader: &'a SeriesDataLoader,
    device: B::Device,
    indices: Vec<usize>,
    current_batch: usize,
    n_batches: usize,
}

impl<'a, B: Backend> SeriesDataLoaderIter<'a, B> {
    fn new(loader: &'a SeriesDataLoader, device: B::Device, seed: Seed) -> Self {
        let mut indices: Vec<usize> = (0..loader.dataset.len()).collect();
        if loader.shuffle {
            indices.shuffle(&mut seed.to_rng());
        }
        Self {
            loader,
            device,
            indices,
            current_batch: 0,
            n_batches: loader.n_batches(),
        }
    }

    fn create_batch(&self, indices: &[usize]) -> Result<SeriesBatch<B>> {
        let subset = self.loader.dataset.subset(indices)?;
        let (n, n_vars, seq_len) = subset.shape();

        let x_flat: Vec<f32> = subset.x().iter().copied().collect();
        let x = Tensor::<B, 3>::from_data(TensorData::new(x_flat, [n, n_vars, seq_len]), &self.device);

        match subset.labels() {
            Some(labels) => {
                let y: Vec<i64> = labels.iter().map(|&c| c as i64).collect();
                let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(y, [n]), &self.device);
                Ok(SeriesBatch::with_targets(x, targets)?)
            }
            None => Ok(SeriesBatch::new(x)),
        }
    }
}

impl<B: Backend> Iterator for SeriesDataLoaderIter<'_, B> {
    type Item = Result<SeriesBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_batch >= self.n_batches {
            return None;
        }
        let start = self.current_batch * self.loader.batch_size;
        let end = (start + self.loader.batch_size).min(self.indices.len());
        self.current_batch += 1;

        let batch_indices = self.indices[start..end].to_vec();
        Some(self.create_batch(&batch_indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_batches - self.current_batch;
        (remaining, Some(remaining))
    }
}

impl<B: Backend> ExactSizeIterator for SeriesDataLoaderIter<'_, B> {}

/// Paired training and validation loaders.
///
/// The training loader is shuffled with a seed derived from the master seed;
/// the validation loader keeps dataset order.
#[derive(Debug, Clone)]
pub struct SeriesDataLoaders {
    train: SeriesDataLoader,
    valid: SeriesDataLoader,
}

impl SeriesDataLoaders {
    /// Build both loaders with a shared batch size.
    ///
    /// # Errors
    ///
    /// Returns an error if either dataset is empty or `batch_size` is zero.
    pub fn new(
        train: SeriesDataset,
        valid: SeriesDataset,
        batch_size: usize,
        seed: Seed,
    ) -> Result<Self> {
        let train = SeriesDataLoader::builder(train)
            .batch_size(batch_size)
            .shuffle(true)
            .seed(seed.derive("train"))
            .build()?;
        let valid = SeriesDataLoader::builder(valid)
            .batch_size(batch_size)
            .shuffle(false)
            .build()?;
        Ok(Self { train, valid })
    }

    /// The training loader.
    #[must_use]
    pub fn train(&self) -> &SeriesDataLoader {
        &self.train
    }

    /// The validation loader.
    #[must_use]
    pub fn valid(&self) -> &SeriesDataLoader {
        &self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ndarray::Array3;

    type TestBackend = NdArray;

    fn dataset(n: usize) -> SeriesDataset {
        let x = Array3::from_shape_fn((n, 2, 3), |(i, _, _)| i as f32);
        let y = (0..n).map(|i| i % 2).collect();
        SeriesDataset::from_arrays(x, Some(y)).unwrap()
    }

    #[test]
    fn test_batch_count_and_shapes() {
        let loader = SeriesDataLoader::builder(dataset(10))
            .batch_size(4)
            .build()
            .unwrap();
        assert_eq!(loader.n_batches(), 3);

        let device = Default::default();
        let batches: Vec<_> = loader
            .iter::<TestBackend>(&device)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].x.dims(), [4, 2, 3]);
        assert_eq!(batches[2].len(), 2);
        assert!(batches[0].targets.is_some());
    }

    #[test]
    fn test_drop_last() {
        let loader = SeriesDataLoader::builder(dataset(10))
            .batch_size(4)
            .drop_last(true)
            .build()
            .unwrap();
        assert_eq!(loader.n_batches(), 2);
    }

    #[test]
    fn test_unshuffled_keeps_order() {
        let loader = SeriesDataLoader::builder(dataset(5))
            .batch_size(5)
            .build()
            .unwrap();
        let device = Default::default();
        let batch = loader.iter::<TestBackend>(&device).next().unwrap().unwrap();
        let firsts: Vec<f32> = batch
            .x
            .slice([0..5, 0..1, 0..1])
            .into_data()
            .iter::<f32>()
            .collect();
        assert_eq!(firsts, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let build = || {
            SeriesDataLoader::builder(dataset(16))
                .batch_size(16)
                .shuffle(true)
                .seed(Seed::new(1))
                .build()
                .unwrap()
        };
        let device = Default::default();
        let order = |loader: &SeriesDataLoader, epoch: usize| -> Vec<f32> {
            let batch = loader
                .iter_epoch::<TestBackend>(&device, epoch)
                .next()
                .unwrap()
                .unwrap();
            batch
                .x
                .slice([0..16, 0..1, 0..1])
                .into_data()
                .iter::<f32>()
                .collect()
        };

        let a = build();
        let b = build();
        assert_eq!(order(&a, 0), order(&b, 0));
        assert_ne!(order(&a, 0), order(&a, 1));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let empty = SeriesDataset::from_arrays(Array3::zeros((0, 2, 3)), None).unwrap();
        assert!(matches!(
            SeriesDataLoader::builder(empty).build(),
            Err(DataError::EmptyDataset)
        ));
        assert!(SeriesDataLoader::builder(dataset(3)).batch_size(0).build().is_err());
    }
}
