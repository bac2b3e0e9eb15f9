use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::softmax;

use super::MaeEncoder;

/// Pretrained encoder with a linear classification head.
///
/// With `freeze_encoder` set the pooled features are detached, so no gradient
/// reaches the encoder and only the head learns (linear evaluation).
#[derive(Module, Debug)]
pub struct MaeClassifier<B: Backend> {
    encoder: MaeEncoder<B>,
    head: Linear<B>,
    n_classes: usize,
    freeze_encoder: bool,
}

impl<B: Backend> MaeClassifier<B> {
    /// Attach a fresh head of `n_classes` outputs to `encoder`.
    pub fn new(
        encoder: MaeEncoder<B>,
        d_model: usize,
        n_classes: usize,
        freeze_encoder: bool,
        device: &B::Device,
    ) -> Self {
        Self {
            encoder,
            head: LinearConfig::new(d_model, n_classes).init(device),
            n_classes,
            freeze_encoder,
        }
    }

    /// Mean-pooled encoder features `(B, d_model)`, detached when frozen.
    pub fn features(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let latent = self.encoder.forward(x);
        let [batch, _, d_model] = latent.dims();
        let pooled = latent.mean_dim(1).reshape([batch, d_model]);
        if self.freeze_encoder {
            pooled.detach()
        } else {
            pooled
        }
    }

    /// Forward pass returning logits `(B, n_classes)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.head.forward(self.features(x))
    }

    /// Forward pass returning class probabilities.
    pub fn forward_probs(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        softmax(self.forward(x), 1)
    }

    /// Whether the encoder is frozen.
    pub fn is_frozen(&self) -> bool {
        self.freeze_encoder
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// The encoder.
    pub fn encoder(&self) -> &MaeEncoder<B> {
        &self.encoder
    }
}
