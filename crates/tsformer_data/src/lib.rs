//! # tsformer_data
//!
//! Data handling for tsformer.
//!
//! - [`SeriesDataset`]: in-memory `(N, V, L)` series with optional encoded labels
//! - [`LabelEncoder`]: integer class values to dense indices and back
//! - [`SeriesDataLoader`] / [`SeriesDataLoaders`]: batched iteration producing Burn tensors
//! - [`train_valid_split`]: seeded random split
//! - [`read_npy`] / [`read_labels_npy`]: NumPy file input

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dataset;
mod error;
mod io;
mod labels;
mod loader;
mod splits;

pub use dataset::SeriesDataset;
pub use error::{DataError, Result};
pub use io::{read_labels_npy, read_npy, write_npy};
pub use labels::LabelEncoder;
pub use loader::{
    SeriesDataLoader, SeriesDataLoaderBuilder, SeriesDataLoaderIter, SeriesDataLoaders,
};
pub use splits::train_valid_split;
