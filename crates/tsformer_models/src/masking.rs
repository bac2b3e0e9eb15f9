//! Random patch masking for masked-autoencoder pretraining.
//!
//! Each call draws `L` uniform values per sample and argsorts them. The first
//! `keep_len` entries of that order are kept; a second argsort gives the inverse
//! permutation that puts a shuffled sequence back in its original order.
//!
//! The noise comes from the backend RNG. Seed it with
//! [`Seed::seed_backend`](tsformer_core::Seed::seed_backend) for repeatable masks.

use burn::prelude::*;
use burn::tensor::Distribution;

/// Number of patches kept out of `n_patches` at `mask_ratio`.
///
/// Computed as `floor(n_patches * (1 - mask_ratio))`.
#[must_use]
pub fn keep_len(n_patches: usize, mask_ratio: f64) -> usize {
    ((n_patches as f64) * (1.0 - mask_ratio)).floor().max(0.0) as usize
}

/// Per-sample shuffle, keep and restore indices from one masking draw.
#[derive(Debug, Clone)]
pub struct MaskIndices<B: Backend> {
    /// Random permutation of `0..L`, shape `(B, L)`.
    pub ids_shuffle: Tensor<B, 2, Int>,
    /// The first `keep_len` entries of `ids_shuffle`, shape `(B, keep_len)`.
    pub ids_keep: Tensor<B, 2, Int>,
    /// Inverse of `ids_shuffle`, shape `(B, L)`.
    pub ids_restore: Tensor<B, 2, Int>,
}

impl<B: Backend> MaskIndices<B> {
    /// Number of kept patches per sample.
    pub fn keep_len(&self) -> usize {
        self.ids_keep.dims()[1]
    }

    /// Number of patches per sample before masking.
    pub fn n_patches(&self) -> usize {
        self.ids_shuffle.dims()[1]
    }

    /// Mask in original patch order, shape `(B, L)`: 0 for kept, 1 for masked.
    pub fn binary_mask(&self) -> Tensor<B, 2> {
        // ids_restore[p] is the shuffled position of patch p; the first keep_len
        // shuffled positions are kept.
        self.ids_restore
            .clone()
            .greater_equal_elem(self.keep_len() as i64)
            .float()
    }
}

/// Select rows along the sequence dimension per sample.
///
/// `x` is `(B, L, D)` and `ids` is `(B, K)`; the result is `(B, K, D)` with
/// `out[b, k] = x[b, ids[b, k]]`.
pub fn gather_patches<B: Backend>(x: Tensor<B, 3>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let d = x.dims()[2];
    let index = ids.unsqueeze_dim::<3>(2).repeat_dim(2, d);
    x.gather(1, index)
}

/// Undo a shuffle: `restore_order(gather_patches(x, ids_shuffle), ids_restore) == x`.
pub fn restore_order<B: Backend>(
    x_shuffled: Tensor<B, 3>,
    ids_restore: Tensor<B, 2, Int>,
) -> Tensor<B, 3> {
    gather_patches(x_shuffled, ids_restore)
}

/// Keep a random `floor(L * (1 - mask_ratio))` patches of every sample.
///
/// `x` is `(B, L, D)`. Returns the kept patches `(B, keep_len, D)` in shuffled
/// order together with the indices of this draw.
pub fn random_masking<B: Backend>(x: Tensor<B, 3>, mask_ratio: f64) -> (Tensor<B, 3>, MaskIndices<B>) {
    let [batch, len, _] = x.dims();
    let device = x.device();
    let keep = keep_len(len, mask_ratio);

    let noise = Tensor::<B, 2>::random([batch, len], Distribution::Uniform(0.0, 1.0), &device);
    let ids_shuffle = noise.argsort(1);
    let ids_restore = ids_shuffle.clone().argsort(1);
    let ids_keep = ids_shuffle.clone().slice([0..batch, 0..keep]);

    let kept = gather_patches(x, ids_keep.clone());
    (
        kept,
        MaskIndices {
            ids_shuffle,
            ids_keep,
            ids_restore,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn rows(ids: Tensor<TestBackend, 2, Int>) -> Vec<Vec<i64>> {
        let [b, l] = ids.dims();
        let flat: Vec<i64> = ids.into_data().iter::<i64>().collect();
        (0..b).map(|i| flat[i * l..(i + 1) * l].to_vec()).collect()
    }

    fn sequence(batch: usize, len: usize, d: usize) -> Tensor<TestBackend, 3> {
        let values: Vec<f32> = (0..batch * len * d).map(|v| v as f32).collect();
        Tensor::from_data(TensorData::new(values, [batch, len, d]), &Default::default())
    }

    #[test]
    fn test_keep_len() {
        assert_eq!(keep_len(23, 0.75), 5);
        assert_eq!(keep_len(10, 0.0), 10);
        assert_eq!(keep_len(10, 0.5), 5);
        assert_eq!(keep_len(3, 0.9), 0);
    }

    #[test]
    fn test_masking_keeps_floor_count() {
        let (kept, ids) = random_masking(sequence(4, 23, 8), 0.75);
        assert_eq!(kept.dims(), [4, 5, 8]);
        assert_eq!(ids.keep_len(), 5);
        assert_eq!(ids.n_patches(), 23);
    }

    #[test]
    fn test_shuffle_is_permutation_and_restore_is_inverse() {
        let (_, ids) = random_masking(sequence(3, 16, 2), 0.5);
        let shuffles = rows(ids.ids_shuffle.clone());
        let restores = rows(ids.ids_restore.clone());

        for (shuffle, restore) in shuffles.iter().zip(&restores) {
            let mut sorted = shuffle.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..16).collect::<Vec<i64>>());

            for (pos, &patch) in shuffle.iter().enumerate() {
                assert_eq!(restore[patch as usize], pos as i64);
            }
        }
    }

    #[test]
    fn test_keep_is_prefix_of_shuffle() {
        let (_, ids) = random_masking(sequence(2, 12, 1), 0.75);
        let shuffles = rows(ids.ids_shuffle.clone());
        let keeps = rows(ids.ids_keep.clone());
        for (shuffle, keep) in shuffles.iter().zip(&keeps) {
            assert_eq!(&shuffle[..3], keep.as_slice());
        }
    }

    #[test]
    fn test_masking_draws_differ() {
        let x = sequence(1, 32, 4);
        let (_, a) = random_masking(x.clone(), 0.5);
        let (_, b) = random_masking(x, 0.5);
        assert_ne!(rows(a.ids_shuffle), rows(b.ids_shuffle));
    }

    #[test]
    fn test_restore_round_trip() {
        let x = sequence(3, 10, 4);
        let (_, ids) = random_masking(x.clone(), 0.3);

        let shuffled = gather_patches(x.clone(), ids.ids_shuffle.clone());
        let restored = restore_order(shuffled, ids.ids_restore);

        let original: Vec<f32> = x.into_data().iter::<f32>().collect();
        let restored: Vec<f32> = restored.into_data().iter::<f32>().collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_kept_rows_come_from_input() {
        let x = sequence(2, 6, 3);
        let (kept, ids) = random_masking(x, 0.5);
        let keeps = rows(ids.ids_keep);
        let kept: Vec<f32> = kept.into_data().iter::<f32>().collect();

        for (b, keep) in keeps.iter().enumerate() {
            for (k, &patch) in keep.iter().enumerate() {
                let first = kept[(b * 3 + k) * 3];
                let expected = ((b * 6 + patch as usize) * 3) as f32;
                assert_eq!(first, expected);
            }
        }
    }

    #[test]
    fn test_binary_mask_counts() {
        let (_, ids) = random_masking(sequence(4, 23, 1), 0.75);
        let mask = ids.binary_mask();
        assert_eq!(mask.dims(), [4, 23]);

        let per_sample: Vec<f32> = mask.sum_dim(1).into_data().iter::<f32>().collect();
        assert!(per_sample.iter().all(|&m| m == 18.0));
    }

    #[test]
    fn test_binary_mask_zero_at_kept_patches() {
        let (_, ids) = random_masking(sequence(1, 8, 1), 0.5);
        let keep = rows(ids.ids_keep.clone()).remove(0);
        let mask: Vec<f32> = ids.binary_mask().into_data().iter::<f32>().collect();
        for p in 0..8i64 {
            let expected = if keep.contains(&p) { 0.0 } else { 1.0 };
            assert_eq!(mask[p as usize], expected);
        }
    }
}
