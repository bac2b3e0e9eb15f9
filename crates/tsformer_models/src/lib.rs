//! # tsformer_models
//!
//! Transformer architectures for fixed-length multivariate time-series classification.
//!
//! ## Building blocks
//! - [`embedding`]: per-timestep and patch embeddings, learned position tables
//! - [`masking`]: random patch masking with shuffle/restore indices
//! - [`attention`] and [`block`]: pre-norm transformer blocks
//!
//! ## Models
//! - [`ViTClassifier`]: patch embedding, transformer encoder, pooled MLP head
//! - [`MaskedAutoencoder`]: [`MaeEncoder`] + [`MaeDecoder`] trained on masked reconstruction
//! - [`MaeClassifier`]: pretrained [`MaeEncoder`] with a linear head, frozen or fine-tuned
//!
//! All models take `(B, V, L)` input.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attention;
pub mod block;
pub mod checkpoint;
pub mod embedding;
pub mod mae;
pub mod masking;
mod traits;
pub mod vit;

pub use attention::MultiHeadSelfAttention;
pub use block::{TransformerBlock, TransformerBlockConfig};
pub use checkpoint::{
    checkpoint_exists, load_module, metadata_path, save_module, weights_path, CheckpointError,
    CheckpointMetadata,
};
pub use embedding::{n_patches, PatchEmbedding, PositionEmbedding, TimestepEmbedding};
pub use mae::{
    MaeClassifier, MaeConfig, MaeDecoder, MaeEncoder, MaskedAutoencoder, Reconstruction,
};
pub use masking::{gather_patches, keep_len, random_masking, restore_order, MaskIndices};
pub use vit::{ViTClassifier, ViTConfig};
