//! Loss functions.

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;

/// Categorical cross-entropy on logits and class indices.
#[derive(Debug, Clone, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Create a new cross-entropy loss.
    pub fn new() -> Self {
        Self
    }

    /// Mean loss over the batch, shape `[1]`.
    pub fn forward<B: Backend>(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets)
    }
}

/// Mean squared error that skips target values equal to exactly zero.
///
/// The mask is taken from the target values, not from which patches were
/// masked: every target entry that is `0.0` is left out of both the sum and the
/// count. Returns 0 when every target is zero.
#[derive(Debug, Clone, Default)]
pub struct ZeroMaskedMseLoss;

impl ZeroMaskedMseLoss {
    /// Create a new loss.
    pub fn new() -> Self {
        Self
    }

    /// Loss between `pred` and `target` of the same shape, shape `[1]`.
    pub fn forward<B: Backend, const D: usize>(&self, pred: Tensor<B, D>, target: Tensor<B, D>) -> Tensor<B, 1> {
        let mask = target.clone().equal_elem(0.0).bool_not().float();
        let squared = (pred - target).powf_scalar(2.0) * mask.clone();
        squared.sum() / mask.sum().clamp_min(1.0)
    }
}
