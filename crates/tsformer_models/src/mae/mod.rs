//! Masked autoencoder for time series.
//!
//! Every timestep is a patch. During pretraining a random subset of patches is
//! kept, encoded and decoded back to the raw values at those positions. The
//! encoder is then reused under a linear classification head, either frozen
//! (linear evaluation) or trained jointly (fine-tune).

mod autoencoder;
mod classifier;
mod decoder;
mod encoder;

pub use autoencoder::{MaskedAutoencoder, Reconstruction};
pub use classifier::MaeClassifier;
pub use decoder::MaeDecoder;
pub use encoder::MaeEncoder;

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tsformer_core::{CoreError, SeriesShape};

use crate::block::TransformerBlockConfig;
use crate::masking::keep_len;

/// Configuration shared by the encoder, decoder and classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaeConfig {
    /// Number of input variables.
    pub n_vars: usize,
    /// Sequence length; also the number of patches.
    pub seq_len: usize,
    /// Number of classes for the classification stage.
    pub n_classes: usize,
    /// Embedding width shared by encoder and decoder.
    pub d_model: usize,
    /// Query/key width per head.
    pub key_dim: usize,
    /// Encoder blocks.
    pub encoder_depth: usize,
    /// Encoder attention heads.
    pub encoder_heads: usize,
    /// Decoder blocks.
    pub decoder_depth: usize,
    /// Decoder attention heads.
    pub decoder_heads: usize,
    /// Feed-forward expansion factor.
    pub mlp_ratio: usize,
    /// Fraction of patches discarded during pretraining.
    pub mask_ratio: f64,
    /// Dropout rate.
    pub dropout: f64,
}

impl Default for MaeConfig {
    fn default() -> Self {
        Self {
            n_vars: 4,
            seq_len: 23,
            n_classes: 2,
            d_model: 64,
            key_dim: 16,
            encoder_depth: 4,
            encoder_heads: 4,
            decoder_depth: 2,
            decoder_heads: 2,
            mlp_ratio: 4,
            mask_ratio: 0.75,
            dropout: 0.1,
        }
    }
}

impl MaeConfig {
    /// Create a config for `(n_vars, seq_len)` input and `n_classes` outputs.
    pub fn new(n_vars: usize, seq_len: usize, n_classes: usize) -> Self {
        Self {
            n_vars,
            seq_len,
            n_classes,
            ..Default::default()
        }
    }

    /// Set the mask ratio.
    #[must_use]
    pub fn with_mask_ratio(mut self, mask_ratio: f64) -> Self {
        self.mask_ratio = mask_ratio;
        self
    }

    /// Set the embedding width.
    #[must_use]
    pub fn with_d_model(mut self, d_model: usize) -> Self {
        self.d_model = d_model;
        self
    }

    /// Set the per-head key width.
    #[must_use]
    pub fn with_key_dim(mut self, key_dim: usize) -> Self {
        self.key_dim = key_dim;
        self
    }

    /// Set encoder depth and heads.
    #[must_use]
    pub fn with_encoder(mut self, depth: usize, heads: usize) -> Self {
        self.encoder_depth = depth;
        self.encoder_heads = heads;
        self
    }

    /// Set decoder depth and heads.
    #[must_use]
    pub fn with_decoder(mut self, depth: usize, heads: usize) -> Self {
        self.decoder_depth = depth;
        self.decoder_heads = heads;
        self
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

    /// Set the number of classes.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Input shape.
    pub fn shape(&self) -> SeriesShape {
        SeriesShape::new(self.n_vars, self.seq_len)
    }

    /// Patches kept per sample during pretraining.
    pub fn keep_len(&self) -> usize {
        keep_len(self.seq_len, self.mask_ratio)
    }

    /// Check the configuration before building models.
    ///
    /// # Errors
    ///
    /// Returns an error for a mask ratio outside `[0, 1)`, a ratio that keeps no
    /// patch, zero heads or widths, or a dropout outside `[0, 1)`.
    pub fn validate(&self) -> tsformer_core::Result<()> {
        self.shape().validate()?;
        if !(0.0..1.0).contains(&self.mask_ratio) {
            return Err(CoreError::InvalidConfig(format!(
                "mask_ratio must be in [0, 1), got {}",
                self.mask_ratio
            )));
        }
        if self.keep_len() == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "mask_ratio {} keeps no patch of {}",
                self.mask_ratio, self.seq_len
            )));
        }
        if self.encoder_heads == 0 || self.decoder_heads == 0 {
            return Err(CoreError::InvalidConfig(
                "encoder_heads and decoder_heads must be greater than zero".to_string(),
            ));
        }
        if self.d_model == 0 || self.key_dim == 0 {
            return Err(CoreError::InvalidConfig(
                "d_model and key_dim must be greater than zero".to_string(),
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

    fn block(&self, heads: usize) -> TransformerBlockConfig {
        TransformerBlockConfig::new(self.d_model, heads, self.key_dim)
            .with_mlp_ratio(self.mlp_ratio)
            .with_dropout(self.dropout)
    }

    /// Initialize an encoder.
    pub fn init_encoder<B: Backend>(&self, device: &B::Device) -> MaeEncoder<B> {
        MaeEncoder::new(
            self.n_vars,
            self.seq_len,
            self.d_model,
            &self.block(self.encoder_heads),
            self.encoder_depth,
            device,
        )
    }

    /// Initialize a decoder.
    pub fn init_decoder<B: Backend>(&self, device: &B::Device) -> MaeDecoder<B> {
        MaeDecoder::new(
            self.n_vars,
            self.seq_len,
            self.d_model,
            &self.block(self.decoder_heads),
            self.decoder_depth,
            device,
        )
    }

    /// Initialize an encoder/decoder pair for pretraining.
    pub fn init_autoencoder<B: Backend>(&self, device: &B::Device) -> MaskedAutoencoder<B> {
        MaskedAutoencoder::new(self.init_encoder(device), self.init_decoder(device))
    }

    /// Attach a fresh classification head to `encoder`.
    pub fn init_classifier<B: Backend>(
        &self,
        encoder: MaeEncoder<B>,
        freeze_encoder: bool,
        device: &B::Device,
    ) -> MaeClassifier<B> {
        MaeClassifier::new(encoder, self.d_model, self.n_classes, freeze_encoder, device)
    }
}
