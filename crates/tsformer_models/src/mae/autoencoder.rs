use burn::prelude::*;

use super::{MaeDecoder, MaeEncoder};
use crate::masking::{gather_patches, MaskIndices};

/// Output of one masked reconstruction pass.
#[derive(Debug, Clone)]
pub struct Reconstruction<B: Backend> {
    /// Decoder output at the kept patches, `(B, keep_len, V)`.
    pub pred: Tensor<B, 3>,
    /// Original input values at the kept patches, `(B, keep_len, V)`.
    pub target: Tensor<B, 3>,
    /// Indices of the masking draw.
    pub indices: MaskIndices<B>,
}

/// Encoder/decoder pair trained on masked reconstruction.
#[derive(Module, Debug)]
pub struct MaskedAutoencoder<B: Backend> {
    encoder: MaeEncoder<B>,
    decoder: MaeDecoder<B>,
}

impl<B: Backend> MaskedAutoencoder<B> {
    /// Pair an encoder with a decoder.
    pub fn new(encoder: MaeEncoder<B>, decoder: MaeDecoder<B>) -> Self {
        Self { encoder, decoder }
    }

    /// Mask, encode and decode a `(B, V, L)` batch.
    ///
    /// Both prediction and target cover only the kept patches, in shuffled order.
    pub fn forward(&self, x: Tensor<B, 3>, mask_ratio: f64) -> Reconstruction<B> {
        let (latent, indices) = self.encoder.forward_masked(x.clone(), mask_ratio);
        let pred = self.decoder.forward(latent);
        let target = gather_patches(x.swap_dims(1, 2), indices.ids_keep.clone());
        Reconstruction {
            pred,
            target,
            indices,
        }
    }

    /// Reconstruct every timestep without masking: `(B, V, L)` -> `(B, L, V)`.
    pub fn reconstruct(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.decoder.forward(self.encoder.forward(x))
    }

    /// The encoder.
    pub fn encoder(&self) -> &MaeEncoder<B> {
        &self.encoder
    }

    /// Consume the pair and keep the encoder.
    pub fn into_encoder(self) -> MaeEncoder<B> {
        self.encoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mae::MaeConfig;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn config() -> MaeConfig {
        MaeConfig::new(4, 23, 2)
            .with_d_model(16)
            .with_key_dim(4)
            .with_encoder(2, 4)
            .with_decoder(1, 2)
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model = config().init_autoencoder::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([3, 4, 23], Distribution::Normal(0.0, 1.0), &device);

        let out = model.forward(x, 0.75);
        assert_eq!(out.pred.dims(), [3, 5, 4]);
        assert_eq!(out.target.dims(), [3, 5, 4]);
        assert_eq!(out.indices.ids_restore.dims(), [3, 23]);
    }

    #[test]
    fn test_target_holds_kept_timesteps() {
        let device = Default::default();
        let model = config().init_autoencoder::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([1, 4, 23], Distribution::Normal(0.0, 1.0), &device);

        let out = model.forward(x.clone(), 0.5);
        let first_kept = out
            .indices
            .ids_keep
            .clone()
            .slice([0..1, 0..1])
            .into_scalar()
            .elem::<i64>() as usize;

        let expected: Vec<f32> = x
            .slice([0..1, 0..4, first_kept..first_kept + 1])
            .into_data()
            .iter::<f32>()
            .collect();
        let got: Vec<f32> = out
            .target
            .slice([0..1, 0..1, 0..4])
            .into_data()
            .iter::<f32>()
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_reconstruct_full_sequence() {
        let device = Default::default();
        let model = config().init_autoencoder::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([2, 4, 23], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(model.reconstruct(x).dims(), [2, 23, 4]);
    }
}
