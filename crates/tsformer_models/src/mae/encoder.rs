use burn::nn::{LayerNorm, LayerNormConfig};
use burn::prelude::*;

use crate::block::{TransformerBlock, TransformerBlockConfig};
use crate::embedding::{PositionEmbedding, TimestepEmbedding};
use crate::masking::{random_masking, MaskIndices};

/// Timestep embedding, learned positions and a transformer stack.
#[derive(Module, Debug)]
pub struct MaeEncoder<B: Backend> {
    embedding: TimestepEmbedding<B>,
    position: PositionEmbedding<B>,
    blocks: Vec<TransformerBlock<B>>,
    norm: LayerNorm<B>,
}

impl<B: Backend> MaeEncoder<B> {
    /// Create an encoder for `(n_vars, seq_len)` input.
    pub fn new(
        n_vars: usize,
        seq_len: usize,
        d_model: usize,
        block: &TransformerBlockConfig,
        depth: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            embedding: TimestepEmbedding::new(n_vars, d_model, device),
            position: PositionEmbedding::new(seq_len, d_model, device),
            blocks: (0..depth).map(|_| block.init(device)).collect(),
            norm: LayerNormConfig::new(d_model).init(device),
        }
    }

    /// Number of patches (timesteps) the position table covers.
    pub fn n_patches(&self) -> usize {
        self.position.n_positions()
    }

    fn embed(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.position.forward(self.embedding.forward(x))
    }

    fn encode(&self, mut x: Tensor<B, 3>) -> Tensor<B, 3> {
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.norm.forward(x)
    }

    /// Encode every timestep: `(B, V, L)` -> `(B, L, d_model)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.encode(self.embed(x))
    }

    /// Encode a random subset of timesteps: `(B, V, L)` -> `(B, keep_len, d_model)`.
    ///
    /// Positions are added before masking, so each kept patch carries its original index.
    pub fn forward_masked(&self, x: Tensor<B, 3>, mask_ratio: f64) -> (Tensor<B, 3>, MaskIndices<B>) {
        let (kept, indices) = random_masking(self.embed(x), mask_ratio);
        (self.encode(kept), indices)
    }
}
