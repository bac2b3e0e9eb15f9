//! # tsformer_core
//!
//! Core types shared by the tsformer crates.
//!
//! This crate provides:
//! - [`Seed`] for reproducible randomness (host RNGs and Burn backends)
//! - [`SeriesShape`] for the fixed per-sample input shape and patch arithmetic
//! - [`SeriesBatch`] for a batch of inputs with optional class targets
//! - [`SeriesClassifier`] implemented by every classification model
//! - Error types
//!
//! ## Shape Convention
//!
//! Batches follow `(B, V, L)`:
//! - `B`: batch size
//! - `V`: variables/features per timestep
//! - `L`: sequence length (timesteps)
//!
//! A `(23, 4)` series (23 timesteps of 4 features) is therefore `SeriesShape::new(4, 23)`.
//!
//! ## Example
//!
//! ```rust
//! use tsformer_core::{Seed, SeriesShape};
//!
//! let seed = Seed::new(42);
//! let shape = SeriesShape::new(4, 23);
//! assert_eq!(shape.n_patches(1).unwrap(), 23);
//! # let _ = seed;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod batch;
mod error;
mod model_trait;
mod seed;
mod shape;

pub use batch::SeriesBatch;
pub use error::{CoreError, Result};
pub use model_trait::SeriesClassifier;
pub use seed::Seed;
pub use shape::SeriesShape;

/// Backend type aliases for convenience
pub mod backend {
    #[cfg(feature = "backend-ndarray")]
    pub use burn_ndarray::NdArray;

    #[cfg(feature = "backend-wgpu")]
    pub use burn_wgpu::Wgpu;
}
