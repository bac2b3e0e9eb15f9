//! Patch and position embeddings.

use burn::module::Param;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::Distribution;

/// Number of contiguous patches of `patch_len` timesteps in a sequence of `seq_len`.
///
/// Trailing timesteps that do not fill a patch are dropped. Returns 0 for a zero
/// `patch_len`.
#[must_use]
pub fn n_patches(seq_len: usize, patch_len: usize) -> usize {
    if patch_len == 0 {
        0
    } else {
        seq_len / patch_len
    }
}

/// Per-timestep linear projection from `n_vars` to `d_model`.
///
/// Every timestep is its own patch.
#[derive(Module, Debug)]
pub struct TimestepEmbedding<B: Backend> {
    projection: Linear<B>,
}

impl<B: Backend> TimestepEmbedding<B> {
    /// Create the embedding.
    pub fn new(n_vars: usize, d_model: usize, device: &B::Device) -> Self {
        Self {
            projection: LinearConfig::new(n_vars, d_model).init(device),
        }
    }

    /// Embed `(B, V, L)` input into `(B, L, d_model)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.projection.forward(x.swap_dims(1, 2))
    }
}

/// Contiguous patches of `patch_len` timesteps projected to `d_model`.
///
/// Each patch is flattened timestep-major into `patch_len * n_vars` values.
#[derive(Module, Debug)]
pub struct PatchEmbedding<B: Backend> {
    projection: Linear<B>,
    patch_len: usize,
    n_patches: usize,
}

impl<B: Backend> PatchEmbedding<B> {
    /// Create the embedding for series of `seq_len` timesteps.
    pub fn new(
        n_vars: usize,
        seq_len: usize,
        patch_len: usize,
        d_model: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            projection: LinearConfig::new(patch_len * n_vars, d_model).init(device),
            patch_len,
            n_patches: n_patches(seq_len, patch_len),
        }
    }

    /// Number of patches produced per sample.
    pub fn n_patches(&self) -> usize {
        self.n_patches
    }

    /// Embed `(B, V, L)` input into `(B, n_patches, d_model)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, n_vars, _] = x.dims();
        let used = self.n_patches * self.patch_len;

        let patches = x
            .slice([0..batch, 0..n_vars, 0..used])
            .swap_dims(1, 2)
            .reshape([batch, self.n_patches, self.patch_len * n_vars]);

        self.projection.forward(patches)
    }
}

/// Trainable position table added to a sequence of embeddings.
#[derive(Module, Debug)]
pub struct PositionEmbedding<B: Backend> {
    table: Param<Tensor<B, 2>>,
}

impl<B: Backend> PositionEmbedding<B> {
    /// Create a `(n_positions, d_model)` table drawn from N(0, 0.02).
    pub fn new(n_positions: usize, d_model: usize, device: &B::Device) -> Self {
        let table = Tensor::random(
            [n_positions, d_model],
            Distribution::Normal(0.0, 0.02),
            device,
        );
        Self {
            table: Param::from_tensor(table),
        }
    }

    /// Number of rows in the table.
    pub fn n_positions(&self) -> usize {
        self.table.val().dims()[0]
    }

    /// Add rows `0..len` to a `(B, len, d_model)` sequence.
    ///
    /// `len` may be shorter than the table.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, len, d_model] = x.dims();
        let rows = self.table.val().slice([0..len, 0..d_model]);
        x + rows.unsqueeze::<3>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_n_patches() {
        assert_eq!(n_patches(23, 1), 23);
        assert_eq!(n_patches(23, 4), 5);
        assert_eq!(n_patches(23, 0), 0);
    }

    #[test]
    fn test_timestep_embedding_shape() {
        let device = Default::default();
        let embed = TimestepEmbedding::<TestBackend>::new(4, 16, &device);
        let x = Tensor::<TestBackend, 3>::random([2, 4, 23], Distribution::Default, &device);
        assert_eq!(embed.forward(x).dims(), [2, 23, 16]);
    }

    #[test]
    fn test_patch_embedding_truncates() {
        let device = Default::default();
        let embed = PatchEmbedding::<TestBackend>::new(4, 23, 4, 16, &device);
        assert_eq!(embed.n_patches(), 5);

        let x = Tensor::<TestBackend, 3>::random([3, 4, 23], Distribution::Default, &device);
        assert_eq!(embed.forward(x).dims(), [3, 5, 16]);
    }

    #[test]
    fn test_patch_embedding_ignores_trailing_steps() {
        let device = Default::default();
        let embed = PatchEmbedding::<TestBackend>::new(1, 5, 2, 3, &device);

        let a = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![1.0f32, 2.0, 3.0, 4.0, 5.0], [1, 1, 5]),
            &device,
        );
        let b = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![1.0f32, 2.0, 3.0, 4.0, -9.0], [1, 1, 5]),
            &device,
        );

        let out_a: Vec<f32> = embed.forward(a).into_data().iter::<f32>().collect();
        let out_b: Vec<f32> = embed.forward(b).into_data().iter::<f32>().collect();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_position_embedding_prefix() {
        let device = Default::default();
        let pos = PositionEmbedding::<TestBackend>::new(10, 8, &device);
        assert_eq!(pos.n_positions(), 10);

        let zeros = Tensor::<TestBackend, 3>::zeros([2, 4, 8], &device);
        let out = pos.forward(zeros);
        assert_eq!(out.dims(), [2, 4, 8]);

        let expected: Vec<f32> = pos
            .table
            .val()
            .slice([0..4, 0..8])
            .into_data()
            .iter::<f32>()
            .collect();
        let first: Vec<f32> = out
            .slice([0..1, 0..4, 0..8])
            .into_data()
            .iter::<f32>()
            .collect();
        assert_eq!(first, expected);
    }
}
