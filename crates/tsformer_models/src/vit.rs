//! Vision-Transformer-style classifier for time series.
//!
//! The series is cut into contiguous patches of `patch_len` timesteps, each patch
//! is projected to `d_model` and given a learned position, and a stack of pre-norm
//! transformer blocks mixes them. The normalized sequence is mean-pooled and sent
//! through a linear head, optionally preceded by one hidden GELU layer.

use burn::nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{gelu, softmax};
use serde::{Deserialize, Serialize};
use tsformer_core::{CoreError, SeriesShape};

use crate::block::{TransformerBlock, TransformerBlockConfig};
use crate::embedding::{PatchEmbedding, PositionEmbedding};

/// Configuration for [`ViTClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViTConfig {
    /// Number of input variables.
    pub n_vars: usize,
    /// Sequence length.
    pub seq_len: usize,
    /// Number of classes.
    pub n_classes: usize,
    /// Timesteps per patch.
    pub patch_len: usize,
    /// Embedding width.
    pub d_model: usize,
    /// Attention heads per block.
    pub n_heads: usize,
    /// Query/key width per head.
    pub key_dim: usize,
    /// Number of transformer blocks.
    pub depth: usize,
    /// Feed-forward expansion factor.
    pub mlp_ratio: usize,
    /// Hidden width of an optional MLP head; 0 (default) for a single linear layer.
    pub head_hidden: usize,
    /// Dropout rate.
    pub dropout: f64,
}

impl Default for ViTConfig {
    fn default() -> Self {
        Self {
            n_vars: 4,
            seq_len: 23,
            n_classes: 2,
            patch_len: 1,
            d_model: 64,
            n_heads: 4,
            key_dim: 16,
            depth: 4,
            mlp_ratio: 4,
            head_hidden: 0,
            dropout: 0.1,
        }
    }
}

impl ViTConfig {
    /// Create a config for `(n_vars, seq_len)` input and `n_classes` outputs.
    pub fn new(n_vars: usize, seq_len: usize, n_classes: usize) -> Self {
        Self {
            n_vars,
            seq_len,
            n_classes,
            ..Default::default()
        }
    }

    /// Set the patch length.
    #[must_use]
    pub fn with_patch_len(mut self, patch_len: usize) -> Self {
        self.patch_len = patch_len;
        self
    }

    /// Set the embedding width.
    #[must_use]
    pub fn with_d_model(mut self, d_model: usize) -> Self {
        self.d_model = d_model;
        self
    }

    /// Set the number of heads.
    #[must_use]
    pub fn with_n_heads(mut self, n_heads: usize) -> Self {
        self.n_heads = n_heads;
        self
    }

    /// Set the per-head key width.
    #[must_use]
    pub fn with_key_dim(mut self, key_dim: usize) -> Self {
        self.key_dim = key_dim;
        self
    }

    /// Set the number of blocks.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the feed-forward expansion factor.
    #[must_use]
    pub fn with_mlp_ratio(mut self, mlp_ratio: usize) -> Self {
        self.mlp_ratio = mlp_ratio;
        self
    }

    /// Set the head hidden width.
    #[must_use]
    pub fn with_head_hidden(mut self, head_hidden: usize) -> Self {
        self.head_hidden = head_hidden;
        self
    }

    /// Set the dropout rate.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Input shape.
    pub fn shape(&self) -> SeriesShape {
        SeriesShape::new(self.n_vars, self.seq_len)
    }

    /// Number of patches per sample.
    pub fn n_patches(&self) -> usize {
        crate::embedding::n_patches(self.seq_len, self.patch_len)
    }

    /// Check the configuration before building a model.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty input shape, a patch longer than the series,
    /// zero heads, zero key width or zero classes, or a dropout outside `[0, 1)`.
    pub fn validate(&self) -> tsformer_core::Result<()> {
        self.shape().validate()?;
        self.shape().n_patches(self.patch_len)?;
        if self.n_heads == 0 || self.key_dim == 0 || self.d_model == 0 {
            return Err(CoreError::InvalidConfig(
                "d_model, n_heads and key_dim must be greater than zero".to_string(),
            ));
        }
        if self.n_classes == 0 {
            return Err(CoreError::InvalidConfig(
                "n_classes must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(CoreError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    /// Initialize the model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ViTClassifier<B> {
        ViTClassifier::new(self.clone(), device)
    }
}

/// Patch-based transformer classifier.
#[derive(Module, Debug)]
pub struct ViTClassifier<B: Backend> {
    patch_embed: PatchEmbedding<B>,
    position: PositionEmbedding<B>,
    blocks: Vec<TransformerBlock<B>>,
    norm: LayerNorm<B>,
    dropout: Dropout,
    head_hidden: Option<Linear<B>>,
    head: Linear<B>,
    n_classes: usize,
}

impl<B: Backend> ViTClassifier<B> {
    /// Create a new model.
    pub fn new(config: ViTConfig, device: &B::Device) -> Self {
        let patch_embed = PatchEmbedding::new(
            config.n_vars,
            config.seq_len,
            config.patch_len,
            config.d_model,
            device,
        );
        let position = PositionEmbedding::new(patch_embed.n_patches(), config.d_model, device);

        let block_config = TransformerBlockConfig::new(config.d_model, config.n_heads, config.key_dim)
            .with_mlp_ratio(config.mlp_ratio)
            .with_dropout(config.dropout);
        let blocks = (0..config.depth).map(|_| block_config.init(device)).collect();

        let (head_hidden, head_in) = if config.head_hidden > 0 {
            (
                Some(LinearConfig::new(config.d_model, config.head_hidden).init(device)),
                config.head_hidden,
            )
        } else {
            (None, config.d_model)
        };

        Self {
            patch_embed,
            position,
            blocks,
            norm: LayerNormConfig::new(config.d_model).init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            head_hidden,
            head: LinearConfig::new(head_in, config.n_classes).init(device),
            n_classes: config.n_classes,
        }
    }

    /// Encoded patch sequence `(B, n_patches, d_model)` after the final norm.
    pub fn encode(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = self.position.forward(self.patch_embed.forward(x));
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.norm.forward(x)
    }

    /// Mean-pooled representation `(B, d_model)`.
    pub fn features(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let encoded = self.encode(x);
        let [batch, _, d_model] = encoded.dims();
        encoded.mean_dim(1).reshape([batch, d_model])
    }

    /// Forward pass returning logits `(B, n_classes)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let mut x = self.dropout.forward(self.features(x));
        if let Some(hidden) = &self.head_hidden {
            x = self.dropout.forward(gelu(hidden.forward(x)));
        }
        self.head.forward(x)
    }

    /// Forward pass returning class probabilities.
    pub fn forward_probs(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        softmax(self.forward(x), 1)
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of patches per sample.
    pub fn n_patches(&self) -> usize {
        self.patch_embed.n_patches()
    }
}
