use burn::nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::prelude::*;

use crate::block::{TransformerBlock, TransformerBlockConfig};
use crate::embedding::PositionEmbedding;

/// Reconstruction head over the encoded kept patches.
///
/// Adds its own position table (first `len` rows for a sequence of `len`), runs a
/// small transformer stack and projects each patch back to `n_vars` values.
/// Masked patches are never part of its input.
#[derive(Module, Debug)]
pub struct MaeDecoder<B: Backend> {
    position: PositionEmbedding<B>,
    blocks: Vec<TransformerBlock<B>>,
    norm: LayerNorm<B>,
    projection: Linear<B>,
}

impl<B: Backend> MaeDecoder<B> {
    /// Create a decoder reconstructing `n_vars` values per patch.
    pub fn new(
        n_vars: usize,
        seq_len: usize,
        d_model: usize,
        block: &TransformerBlockConfig,
        depth: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            position: PositionEmbedding::new(seq_len, d_model, device),
            blocks: (0..depth).map(|_| block.init(device)).collect(),
            norm: LayerNormConfig::new(d_model).init(device),
            projection: LinearConfig::new(d_model, n_vars).init(device),
        }
    }

    /// `(B, len, d_model)` -> `(B, len, n_vars)`.
    pub fn forward(&self, latent: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = self.position.forward(latent);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.projection.forward(self.norm.forward(x))
    }
}
