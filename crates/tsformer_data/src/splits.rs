//! Dataset splitting.

use rand::seq::SliceRandom;

use crate::dataset::SeriesDataset;
use crate::error::{DataError, Result};
use tsformer_core::Seed;

/// Split a dataset into training and validation parts at random.
///
/// `valid_ratio` of the samples (rounded, at least one, at most `n - 1`) go to
/// the validation set.
///
/// # Errors
///
/// Returns an error if `valid_ratio` is not strictly between 0 and 1 or the
/// dataset has fewer than two samples.
pub fn train_valid_split(
    dataset: &SeriesDataset,
    valid_ratio: f32,
    seed: Seed,
) -> Result<(SeriesDataset, SeriesDataset)> {
    if valid_ratio <= 0.0 || valid_ratio >= 1.0 {
        return Err(DataError::SplitError(format!(
            "valid_ratio must be between 0 and 1, got {}",
            valid_ratio
        )));
    }
    let n = dataset.len();
    if n < 2 {
        return Err(DataError::SplitError(format!(
            "need at least 2 samples to split, got {}",
            n
        )));
    }

    let n_valid = ((n as f32 * valid_ratio).round() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut seed.to_rng());

    let valid = dataset.subset(&indices[..n_valid])?;
    let train = dataset.subset(&indices[n_valid..])?;
    Ok((train, valid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn dataset(n: usize) -> SeriesDataset {
        let x = Array3::from_shape_fn((n, 1, 2), |(i, _, _)| i as f32);
        SeriesDataset::from_arrays(x, None).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let (train, valid) = train_valid_split(&dataset(100), 0.2, Seed::new(42)).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(valid.len(), 20);
    }

    #[test]
    fn test_split_is_partition() {
        let (train, valid) = train_valid_split(&dataset(10), 0.3, Seed::new(7)).unwrap();
        let mut all: Vec<f32> = train.x().iter().chain(valid.x().iter()).copied().collect();
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        all.dedup();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_split_small_and_invalid() {
        let (train, valid) = train_valid_split(&dataset(2), 0.01, Seed::new(0)).unwrap();
        assert_eq!((train.len(), valid.len()), (1, 1));
        assert!(train_valid_split(&dataset(1), 0.5, Seed::new(0)).is_err());
        assert!(train_valid_split(&dataset(10), 1.0, Seed::new(0)).is_err());
    }

    #[test]
    fn test_split_deterministic() {
        let a = train_valid_split(&dataset(20), 0.25, Seed::new(3)).unwrap();
        let b = train_valid_split(&dataset(20), 0.25, Seed::new(3)).unwrap();
        assert_eq!(a.1.x(), b.1.x());
    }
}
