//! Model checkpointing.
//!
//! Weights are written with Burn's named MessagePack recorder at full precision
//! to `<dir>/<name>.mpk`. A JSON sidecar `<dir>/<name>.json` records what is
//! needed to rebuild the model in another process.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{Deserialize, Serialize};

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Checkpoint-related errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Error saving a checkpoint.
    #[error("Failed to save checkpoint: {0}")]
    Save(String),

    /// Error loading a checkpoint.
    #[error("Failed to load checkpoint: {0}")]
    Load(String),

    /// No checkpoint under the expected path.
    #[error("Checkpoint not found: {}", .0.display())]
    NotFound(PathBuf),
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Path of the weights file for `name` under `dir`.
pub fn weights_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{}.mpk", name))
}

/// Path of the metadata file for `name` under `dir`.
pub fn metadata_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{}.json", name))
}

/// Whether weights for `name` exist under `dir`.
pub fn checkpoint_exists(dir: impl AsRef<Path>, name: &str) -> bool {
    weights_path(dir, name).is_file()
}

/// Save a module's weights as `<dir>/<name>.mpk`, creating `dir` if needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_module<B, M>(module: &M, dir: impl AsRef<Path>, name: &str) -> Result<PathBuf>
where
    B: Backend,
    M: Module<B>,
{
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| CheckpointError::Save(e.to_string()))?;

    // The recorder appends the extension itself.
    module
        .clone()
        .save_file(dir.join(name), &recorder())
        .map_err(|e| CheckpointError::Save(e.to_string()))?;

    let path = weights_path(dir, name);
    tracing::info!("Saved checkpoint to {}", path.display());
    Ok(path)
}

/// Load weights for `name` under `dir` into `module`.
///
/// `module` must have the same architecture as the saved one.
///
/// # Errors
///
/// Returns [`CheckpointError::NotFound`] if no weights exist, or
/// [`CheckpointError::Load`] if they cannot be read into `module`.
pub fn load_module<B, M>(module: M, dir: impl AsRef<Path>, name: &str, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let dir = dir.as_ref();
    let path = weights_path(dir, name);
    if !path.is_file() {
        return Err(CheckpointError::NotFound(path));
    }
    let module = module
        .load_file(dir.join(name), &recorder(), device)
        .map_err(|e| CheckpointError::Load(e.to_string()))?;
    tracing::debug!("Loaded checkpoint from {}", path.display());
    Ok(module)
}

/// Sidecar metadata describing a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Architecture name, e.g. `"mae"` or `"vit"`.
    pub arch: String,
    /// Model configuration as JSON.
    pub config_json: String,
    /// Training stage the weights belong to.
    pub stage: String,
    /// Epoch the weights were taken from.
    pub epoch: Option<usize>,
    /// Validation loss at that epoch.
    pub val_loss: Option<f32>,
    /// Validation accuracy at that epoch.
    pub val_acc: Option<f32>,
    /// Label values in class-index order.
    pub classes: Option<Vec<i64>>,
}

impl CheckpointMetadata {
    /// Metadata for an architecture and stage.
    pub fn new(arch: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            config_json: String::new(),
            stage: stage.into(),
            epoch: None,
            val_loss: None,
            val_acc: None,
            classes: None,
        }
    }

    /// Store the model configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn with_config<C: Serialize>(mut self, config: &C) -> Result<Self> {
        self.config_json =
            serde_json::to_string(config).map_err(|e| CheckpointError::Save(e.to_string()))?;
        Ok(self)
    }

    /// Parse the stored configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match `C`.
    pub fn config<C: serde::de::DeserializeOwned>(&self) -> Result<C> {
        serde_json::from_str(&self.config_json).map_err(|e| CheckpointError::Load(e.to_string()))
    }

    /// Set the epoch.
    #[must_use]
    pub fn with_epoch(mut self, epoch: usize) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Set the validation loss.
    #[must_use]
    pub fn with_val_loss(mut self, loss: f32) -> Self {
        self.val_loss = Some(loss);
        self
    }

    /// Set the validation accuracy.
    #[must_use]
    pub fn with_val_acc(mut self, acc: f32) -> Self {
        self.val_acc = Some(acc);
        self
    }

    /// Set the label classes.
    #[must_use]
    pub fn with_classes(mut self, classes: Vec<i64>) -> Self {
        self.classes = Some(classes);
        self
    }

    /// Write the metadata as `<dir>/<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| CheckpointError::Save(e.to_string()))?;
        let path = metadata_path(dir, name);
        let json =
            serde_json::to_string_pretty(self).map_err(|e| CheckpointError::Save(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| CheckpointError::Save(e.to_string()))?;
        Ok(path)
    }

    /// Read `<dir>/<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::NotFound`] if the file is missing.
    pub fn load(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let path = metadata_path(dir, name);
        if !path.is_file() {
            return Err(CheckpointError::NotFound(path));
        }
        let json =
            std::fs::read_to_string(&path).map_err(|e| CheckpointError::Load(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::Load(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vit::ViTConfig;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_save_and_load_weights() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = ViTConfig::new(2, 8, 2).with_d_model(8).with_key_dim(4).with_depth(1);

        let model = config.init::<TestBackend>(&device);
        let path = save_module(&model, dir.path(), "vit_model").unwrap();
        assert!(path.is_file());
        assert!(checkpoint_exists(dir.path(), "vit_model"));

        let fresh = config.init::<TestBackend>(&device);
        let loaded = load_module(fresh, dir.path(), "vit_model", &device).unwrap();

        let x = Tensor::<TestBackend, 3>::random([3, 2, 8], Distribution::Normal(0.0, 1.0), &device);
        let a: Vec<f32> = model.forward(x.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = loaded.forward(x).into_data().iter::<f32>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model = ViTConfig::new(2, 8, 2).with_depth(1).init::<TestBackend>(&device);
        assert!(matches!(
            load_module(model, dir.path(), "nope", &device),
            Err(CheckpointError::NotFound(_))
        ));
    }

    #[test]
    fn test_metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = ViTConfig::new(4, 23, 3);
        let meta = CheckpointMetadata::new("vit", "fine_tuned")
            .with_config(&config)
            .unwrap()
            .with_epoch(7)
            .with_val_acc(0.9)
            .with_classes(vec![1, 2, 5]);

        meta.save(dir.path(), "vit_model").unwrap();
        let loaded = CheckpointMetadata::load(dir.path(), "vit_model").unwrap();
        assert_eq!(loaded, meta);
        assert_eq!(loaded.config::<ViTConfig>().unwrap(), config);
    }
}
