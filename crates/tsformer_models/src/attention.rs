//! Multi-head self-attention with an independent per-head key width.
//!
//! When `n_heads * key_dim == d_model` the layer is Burn's
//! [`MultiHeadAttention`]; otherwise queries, keys and values get their own
//! `d_model -> n_heads * key_dim` projections.

use burn::nn::attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::softmax;

/// Q/K/V/output projections for a head width that differs from `d_model / n_heads`.
#[derive(Module, Debug)]
struct SplitProjections<B: Backend> {
    query: Linear<B>,
    key: Linear<B>,
    value: Linear<B>,
    output: Linear<B>,
}

/// Scaled dot-product self-attention over all positions (no causal mask).
#[derive(Module, Debug)]
pub struct MultiHeadSelfAttention<B: Backend> {
    fused: Option<MultiHeadAttention<B>>,
    split: Option<SplitProjections<B>>,
    dropout: Dropout,
    n_heads: usize,
    key_dim: usize,
}

impl<B: Backend> MultiHeadSelfAttention<B> {
    /// Create the attention layer.
    pub fn new(
        d_model: usize,
        n_heads: usize,
        key_dim: usize,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let inner = n_heads * key_dim;
        let (fused, split) = if inner == d_model {
            let mha = MultiHeadAttentionConfig::new(d_model, n_heads)
                .with_dropout(dropout)
                .init(device);
            (Some(mha), None)
        } else {
            let split = SplitProjections {
                query: LinearConfig::new(d_model, inner).init(device),
                key: LinearConfig::new(d_model, inner).init(device),
                value: LinearConfig::new(d_model, inner).init(device),
                output: LinearConfig::new(inner, d_model).init(device),
            };
            (None, Some(split))
        };
        Self {
            fused,
            split,
            dropout: DropoutConfig::new(dropout).init(),
            n_heads,
            key_dim,
        }
    }

    /// Whether the layer runs on Burn's fused attention.
    pub fn is_fused(&self) -> bool {
        self.fused.is_some()
    }

    /// Attention probabilities, shape `(B, n_heads, L, L)`.
    pub fn weights(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        self.attend(x).1
    }

    /// `(B, L, d_model)` -> `(B, L, d_model)`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.attend(x).0
    }

    // (context, weights)
    fn attend(&self, x: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 4>) {
        if let Some(mha) = &self.fused {
            let out = mha.forward(MhaInput::self_attn(x));
            return (out.context, out.weights);
        }
        let Some(split) = &self.split else {
            unreachable!("attention has neither fused nor split projections");
        };
        let [batch, len, _] = x.dims();

        let q = self.split_heads(split.query.forward(x.clone()));
        let k = self.split_heads(split.key.forward(x.clone()));
        let v = self.split_heads(split.value.forward(x));

        let scale = 1.0 / (self.key_dim as f64).sqrt();
        let weights = softmax(q.matmul(k.swap_dims(2, 3)).mul_scalar(scale), 3);
        let context = self
            .dropout
            .forward(weights.clone())
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, len, self.n_heads * self.key_dim]);

        (split.output.forward(context), weights)
    }

    // [b, l, h * dk] -> [b, h, l, dk]
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, len, _] = x.dims();
        x.reshape([batch, len, self.n_heads, self.key_dim])
            .swap_dims(1, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_output_shape_with_narrow_keys() {
        let device = Default::default();
        let attn = MultiHeadSelfAttention::<TestBackend>::new(64, 4, 8, 0.0, &device);
        let x = Tensor::<TestBackend, 3>::random([2, 11, 64], Distribution::Default, &device);
        assert_eq!(attn.forward(x).dims(), [2, 11, 64]);
    }

    #[test]
    fn test_weights_are_distributions() {
        let device = Default::default();
        let attn = MultiHeadSelfAttention::<TestBackend>::new(16, 2, 4, 0.0, &device);
        let x = Tensor::<TestBackend, 3>::random([1, 5, 16], Distribution::Default, &device);

        let weights = attn.weights(x);
        assert_eq!(weights.dims(), [1, 2, 5, 5]);
        let sums: Vec<f32> = weights.sum_dim(3).into_data().iter::<f32>().collect();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_matching_width_uses_burn_attention() {
        let device = Default::default();
        let fused = MultiHeadSelfAttention::<TestBackend>::new(64, 4, 16, 0.0, &device);
        let split = MultiHeadSelfAttention::<TestBackend>::new(64, 4, 8, 0.0, &device);
        assert!(fused.is_fused());
        assert!(!split.is_fused());

        let x = Tensor::<TestBackend, 3>::random([2, 6, 64], Distribution::Default, &device);
        assert_eq!(fused.forward(x.clone()).dims(), [2, 6, 64]);

        let weights = fused.weights(x);
        assert_eq!(weights.dims(), [2, 4, 6, 6]);
        let sums: Vec<f32> = weights.sum_dim(3).into_data().iter::<f32>().collect();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_first_position_sees_last() {
        let device = Default::default();
        let attn = MultiHeadSelfAttention::<TestBackend>::new(8, 2, 4, 0.0, &device);
        let x = Tensor::<TestBackend, 3>::random([1, 4, 8], Distribution::Default, &device);
        let changed = x.clone().slice_assign(
            [0..1, 3..4, 0..8],
            Tensor::random([1, 1, 8], Distribution::Default, &device),
        );

        let a: Vec<f32> = attn
            .forward(x)
            .slice([0..1, 0..1, 0..8])
            .into_data()
            .iter::<f32>()
            .collect();
        let b: Vec<f32> = attn
            .forward(changed)
            .slice([0..1, 0..1, 0..8])
            .into_data()
            .iter::<f32>()
            .collect();
        assert_ne!(a, b);
    }
}
