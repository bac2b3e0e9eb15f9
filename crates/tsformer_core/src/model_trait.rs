//! Model traits shared by training and evaluation.

use burn::prelude::*;

/// A classifier over `(B, V, L)` series.
///
/// Implemented for every backend so that training can run on an autodiff backend
/// and evaluation on its inner backend with dropout disabled.
pub trait SeriesClassifier<B: Backend> {
    /// Forward pass returning logits.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape (batch, vars, seq_len)
    ///
    /// # Returns
    ///
    /// Logits tensor of shape (batch, n_classes)
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2>;

    /// Forward pass returning class probabilities.
    fn forward_probs(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    /// Number of output classes.
    fn n_classes(&self) -> usize;
}
