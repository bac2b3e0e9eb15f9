//! Pre-norm transformer block.

use burn::nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::gelu;
use serde::{Deserialize, Serialize};

use crate::attention::MultiHeadSelfAttention;

/// Configuration for a [`TransformerBlock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerBlockConfig {
    /// Embedding width.
    pub d_model: usize,
    /// Number of attention heads.
    pub n_heads: usize,
    /// Width of each head's queries and keys.
    pub key_dim: usize,
    /// Feed-forward expansion factor.
    pub mlp_ratio: usize,
    /// Dropout rate for attention, feed-forward and residual branches.
    pub dropout: f64,
}

impl TransformerBlockConfig {
    /// Create a config with `mlp_ratio` 4 and dropout 0.1.
    pub fn new(d_model: usize, n_heads: usize, key_dim: usize) -> Self {
        Self {
            d_model,
            n_heads,
            key_dim,
            mlp_ratio: 4,
            dropout: 0.1,
        }
    }

    /// Set the feed-forward expansion factor.
    #[must_use]
    pub fn with_mlp_ratio(mut self, mlp_ratio: usize) -> Self {
        self.mlp_ratio = mlp_ratio;
        self
    }

    /// Set the dropout rate.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Initialize the block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerBlock<B> {
        let hidden = self.mlp_ratio * self.d_model;
        TransformerBlock {
            norm_attn: LayerNormConfig::new(self.d_model).init(device),
            attention: MultiHeadSelfAttention::new(
                self.d_model,
                self.n_heads,
                self.key_dim,
                self.dropout,
                device,
            ),
            norm_ff: LayerNormConfig::new(self.d_model).init(device),
            ff_linear1: LinearConfig::new(self.d_model, hidden).init(device),
            ff_linear2: LinearConfig::new(hidden, self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// `x + Dropout(Attn(LN(x)))` followed by `x + FF(LN(x))`.
///
/// The feed-forward branch is `Linear -> GELU -> Dropout -> Linear -> Dropout`.
/// Dropout only acts on autodiff backends.
#[derive(Module, Debug)]
pub struct TransformerBlock<B: Backend> {
    norm_attn: LayerNorm<B>,
    attention: MultiHeadSelfAttention<B>,
    norm_ff: LayerNorm<B>,
    ff_linear1: Linear<B>,
    ff_linear2: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> TransformerBlock<B> {
    /// `(B, L, d_model)` -> `(B, L, d_model)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn = self.attention.forward(self.norm_attn.forward(x.clone()));
        let x = x + self.dropout.forward(attn);

        let ff = self.ff_linear1.forward(self.norm_ff.forward(x.clone()));
        let ff = self.dropout.forward(gelu(ff));
        let ff = self.dropout.forward(self.ff_linear2.forward(ff));
        x + ff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_block_preserves_shape() {
        let device = Default::default();
        let block = TransformerBlockConfig::new(32, 4, 8)
            .with_mlp_ratio(2)
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([3, 7, 32], Distribution::Default, &device);
        assert_eq!(block.forward(x).dims(), [3, 7, 32]);
    }

    #[test]
    fn test_block_deterministic_without_autodiff() {
        let device = Default::default();
        let block = TransformerBlockConfig::new(16, 2, 8)
            .with_dropout(0.5)
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([2, 5, 16], Distribution::Default, &device);

        let a: Vec<f32> = block.forward(x.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = block.forward(x).into_data().iter::<f32>().collect();
        assert_eq!(a, b);
    }
}
