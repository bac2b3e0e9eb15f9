//! End-to-end training drivers.
//!
//! [`MaePipeline`] owns a masked autoencoder through its lifecycle: pretraining,
//! then either a linear head on the frozen encoder or full fine-tuning.
//! [`ViTPipeline`] trains a [`ViTClassifier`] directly on labels. Both checkpoint
//! the best weights with a JSON sidecar and can be restored with
//! `from_checkpoint`.

use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TrainerConfig;
use crate::error::{Result, TrainError};
use crate::evaluation::{evaluate_classifier, predict, EvaluationReport};
use crate::mode::{ModelStage, TrainingMode};
use crate::training::{ClassificationTrainer, PretrainTrainer, TrainingHistory};
use tsformer_analysis::{print_metrics_summary, save_visualizations};
use tsformer_core::SeriesShape;
use tsformer_data::{
    train_valid_split, LabelEncoder, SeriesDataLoader, SeriesDataLoaders, SeriesDataset,
};
use tsformer_models::{
    load_module, save_module, CheckpointMetadata, MaeClassifier, MaeConfig, MaskedAutoencoder,
    ViTClassifier, ViTConfig,
};

const EVAL_BATCH_SIZE: usize = 64;
const MAE_ARCH: &str = "mae";
const VIT_ARCH: &str = "vit";

/// History returned by [`MaePipeline::train`].
#[derive(Debug, Clone)]
pub enum StageOutput {
    /// Self-supervised pretraining.
    Pretrained(TrainingHistory),
    /// Linear head or fine-tuning.
    Classifier(TrainingHistory),
}

impl StageOutput {
    /// The underlying history.
    pub fn history(&self) -> &TrainingHistory {
        match self {
            Self::Pretrained(h) | Self::Classifier(h) => h,
        }
    }
}

fn check_inputs(shape: SeriesShape, x: &Array3<f32>, y: Option<&[i64]>) -> Result<()> {
    shape.check_batch_dims(x.shape())?;
    if let Some(y) = y {
        let n = x.len_of(Axis(0));
        if y.len() != n {
            return Err(TrainError::ShapeMismatch(format!(
                "{} labels for {} samples",
                y.len(),
                n
            )));
        }
    }
    Ok(())
}

// Fits the label encoder on first use and builds seeded train/valid loaders.
fn supervised_loaders(
    x: &Array3<f32>,
    y: &[i64],
    labels: &mut Option<LabelEncoder>,
    n_classes: usize,
    trainer: &TrainerConfig,
    batch_size: usize,
) -> Result<SeriesDataLoaders> {
    let fitted = match labels.as_ref() {
        Some(encoder) => encoder.clone(),
        None => {
            let mut encoder = LabelEncoder::new();
            encoder.fit(y);
            encoder
        }
    };
    if fitted.n_classes() != n_classes {
        return Err(TrainError::ShapeMismatch(format!(
            "labels have {} classes but the model has {} outputs",
            fitted.n_classes(),
            n_classes
        )));
    }
    let encoder = labels.get_or_insert(fitted);

    let encoded = encoder.transform(y)?;
    let dataset = SeriesDataset::from_arrays(x.clone(), Some(encoded))?;
    let (train, valid) =
        train_valid_split(&dataset, trainer.valid_ratio, trainer.seed.derive("split"))?;
    info!("Split {} samples into {} train / {} valid", dataset.len(), train.len(), valid.len());
    Ok(SeriesDataLoaders::new(train, valid, batch_size, trainer.seed.derive("loader"))?)
}

fn classifier_metadata<C: Serialize>(
    arch: &str,
    stage: ModelStage,
    config: &C,
    history: &TrainingHistory,
    labels: Option<&LabelEncoder>,
) -> Result<CheckpointMetadata> {
    let mut meta = CheckpointMetadata::new(arch, stage.to_string())
        .with_config(config)?
        .with_epoch(history.best_epoch);
    if let Some(loss) = history.best_valid_loss {
        meta = meta.with_val_loss(loss);
    }
    if let Some(acc) = history.best_valid_acc {
        meta = meta.with_val_acc(acc);
    }
    if let Some(labels) = labels {
        meta = meta.with_classes(labels.classes().to_vec());
    }
    Ok(meta)
}

fn load_metadata(dir: &Path, name: &str, arch: &str) -> Result<(CheckpointMetadata, ModelStage)> {
    let meta = CheckpointMetadata::load(dir, name)?;
    if meta.arch != arch {
        return Err(TrainError::ArchMismatch {
            expected: arch.to_string(),
            got: meta.arch,
        });
    }
    let stage = meta
        .stage
        .parse::<ModelStage>()
        .map_err(|e| TrainError::Checkpoint(tsformer_models::CheckpointError::Load(e)))?;
    Ok((meta, stage))
}

fn report_and_save(
    report: &EvaluationReport,
    out_dir: &Path,
    model_name: &str,
    x: &Array3<f32>,
) -> Result<()> {
    print_metrics_summary(&report.to_map());
    let artifacts = save_visualizations(
        out_dir,
        model_name,
        x,
        &report.y_true,
        &report.predictions,
        &report.probabilities,
    )?;
    info!(
        "{}: loss={:.4} accuracy={:.2}%, artifacts in {}",
        model_name,
        report.loss,
        report.accuracy * 100.0,
        artifacts
            .report
            .parent()
            .map_or_else(|| out_dir.display().to_string(), |p| p.display().to_string())
    );
    Ok(())
}

/// Settings for [`MaePipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaePipelineConfig {
    /// Model architecture.
    pub model: MaeConfig,
    /// Optimizer, schedule, split and early-stopping settings.
    pub trainer: TrainerConfig,
    /// Where checkpoints are written.
    pub checkpoint_dir: PathBuf,
    /// Where evaluation artifacts are written; `<checkpoint_dir>/evaluation` if unset.
    pub artifacts_dir: Option<PathBuf>,
}

impl MaePipelineConfig {
    /// Config for `shape` inputs, `n_classes` classes and checkpoints under `checkpoint_dir`.
    pub fn new(shape: SeriesShape, n_classes: usize, checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: MaeConfig::new(shape.n_vars(), shape.seq_len(), n_classes),
            trainer: TrainerConfig::default(),
            checkpoint_dir: checkpoint_dir.into(),
            artifacts_dir: None,
        }
    }

    /// Set the pretraining mask ratio.
    #[must_use]
    pub fn with_mask_ratio(mut self, mask_ratio: f64) -> Self {
        self.model.mask_ratio = mask_ratio;
        self
    }

    /// Replace the model configuration.
    #[must_use]
    pub fn with_model(mut self, model: MaeConfig) -> Self {
        self.model = model;
        self
    }

    /// Replace the trainer configuration.
    #[must_use]
    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    /// Set the artifacts directory.
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    /// Directory for evaluation artifacts.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir
            .clone()
            .unwrap_or_else(|| self.checkpoint_dir.join("evaluation"))
    }
}

/// Masked-autoencoder lifecycle driver.
pub struct MaePipeline<B: AutodiffBackend> {
    config: MaePipelineConfig,
    device: B::Device,
    stage: ModelStage,
    autoencoder: MaskedAutoencoder<B>,
    classifier: Option<MaeClassifier<B>>,
    labels: Option<LabelEncoder>,
}

impl<B: AutodiffBackend> MaePipeline<B> {
    /// Build a fresh, untrained pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the model or trainer configuration is invalid.
    pub fn new(config: MaePipelineConfig, device: B::Device) -> Result<Self> {
        config.model.validate()?;
        config.trainer.validate()?;
        config.trainer.seed.seed_backend::<B>();

        let autoencoder = config.model.init_autoencoder::<B>(&device);
        info!(
            "MAE pipeline: {} vars x {} steps, {} classes, keeping {} of {} patches",
            config.model.n_vars,
            config.model.seq_len,
            config.model.n_classes,
            config.model.keep_len(),
            config.model.seq_len
        );
        Ok(Self {
            config,
            device,
            stage: ModelStage::Untrained,
            autoencoder,
            classifier: None,
            labels: None,
        })
    }

    /// Restore a pipeline from `<dir>/<name>` written by this type.
    ///
    /// A `pretrained` checkpoint restores the encoder; `linear` and `fine_tuned`
    /// checkpoints restore the classifier and its label classes.
    ///
    /// # Errors
    ///
    /// Returns an error if the files are missing or belong to another architecture.
    pub fn from_checkpoint(dir: impl AsRef<Path>, name: &str, device: B::Device) -> Result<Self> {
        let dir = dir.as_ref();
        let (meta, stage) = load_metadata(dir, name, MAE_ARCH)?;
        let model: MaeConfig = meta.config()?;
        let shape = model.shape();
        let config = MaePipelineConfig::new(shape, model.n_classes, dir).with_model(model);
        let mut pipeline = Self::new(config, device)?;

        if stage.has_classifier() {
            let model = &pipeline.config.model;
            let encoder = model.init_encoder::<B>(&pipeline.device);
            let classifier =
                model.init_classifier(encoder, stage == ModelStage::Linear, &pipeline.device);
            pipeline.classifier =
                Some(load_module::<B, _>(classifier, dir, name, &pipeline.device)?);
        } else {
            let encoder = load_module::<B, _>(
                pipeline.config.model.init_encoder::<B>(&pipeline.device),
                dir,
                name,
                &pipeline.device,
            )?;
            let decoder = pipeline.config.model.init_decoder::<B>(&pipeline.device);
            pipeline.autoencoder = MaskedAutoencoder::new(encoder, decoder);
        }

        pipeline.labels = meta.classes.map(LabelEncoder::from_classes);
        pipeline.stage = stage;
        info!("Restored MAE pipeline at stage {} from {}", stage, dir.display());
        Ok(pipeline)
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> ModelStage {
        self.stage
    }

    /// Pipeline settings.
    pub fn config(&self) -> &MaePipelineConfig {
        &self.config
    }

    /// Redirect evaluation artifacts.
    pub fn set_artifacts_dir(&mut self, dir: impl Into<PathBuf>) {
        self.config.artifacts_dir = Some(dir.into());
    }

    /// The autoencoder, whose encoder is the pretrained one after [`Self::pretrain`].
    pub fn autoencoder(&self) -> &MaskedAutoencoder<B> {
        &self.autoencoder
    }

    /// The classifier, once trained or loaded.
    pub fn classifier(&self) -> Option<&MaeClassifier<B>> {
        self.classifier.as_ref()
    }

    /// Label classes in class-index order, once fitted.
    pub fn labels(&self) -> Option<&LabelEncoder> {
        self.labels.as_ref()
    }

    /// Pretrain the encoder on masked reconstruction of `x_train` `(N, V, L)`.
    ///
    /// The best weights are saved as `pretrained_encoder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage forbids pretraining, `x_train` has the
    /// wrong shape, or the checkpoint cannot be written.
    pub fn pretrain(
        &mut self,
        x_train: &Array3<f32>,
        epochs: usize,
        batch_size: usize,
    ) -> Result<TrainingHistory> {
        let next = self.stage.transition(TrainingMode::Pretrain)?;
        check_inputs(self.config.model.shape(), x_train, None)?;

        let trainer_config = &self.config.trainer;
        let dataset = SeriesDataset::from_arrays(x_train.clone(), None)?;
        let (train, valid) = if dataset.len() >= 2 {
            let (train, valid) = train_valid_split(
                &dataset,
                trainer_config.valid_ratio,
                trainer_config.seed.derive("split"),
            )?;
            (train, Some(valid))
        } else {
            (dataset, None)
        };
        let train = SeriesDataLoader::builder(train)
            .batch_size(batch_size)
            .shuffle(true)
            .seed(trainer_config.seed.derive("pretrain"))
            .build()?;
        let valid = valid
            .map(|v| SeriesDataLoader::builder(v).batch_size(batch_size).build())
            .transpose()?;

        info!(
            "Pretraining for {} epochs, mask_ratio={}",
            epochs, self.config.model.mask_ratio
        );
        let trainer = PretrainTrainer::<B>::new(trainer_config.clone(), self.device.clone());
        let output = trainer.fit(
            self.autoencoder.clone(),
            &train,
            valid.as_ref(),
            epochs,
            self.config.model.mask_ratio,
        )?;
        self.autoencoder = output.model;

        let name = TrainingMode::Pretrain.checkpoint_name();
        save_module::<B, _>(self.autoencoder.encoder(), &self.config.checkpoint_dir, name)?;
        classifier_metadata(MAE_ARCH, next, &self.config.model, &output.history, None)?
            .save(&self.config.checkpoint_dir, name)?;

        info!("Stage {} -> {}", self.stage, next);
        self.stage = next;
        Ok(output.history)
    }

    /// Run one training stage.
    ///
    /// `Pretrain` ignores `y_train`. `Linear` trains a head on the frozen
    /// encoder and `FineTune` trains both; they need labels. From `Untrained`,
    /// an existing `pretrained_encoder` checkpoint is loaded first. The best
    /// classifier is saved as `save_name` or the mode's default name.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::InvalidStage`] for a transition the stage machine
    /// forbids, [`TrainError::MissingTargets`] without labels,
    /// [`TrainError::ShapeMismatch`] when the label count differs from the
    /// model's outputs, and data or checkpoint errors otherwise.
    pub fn train(
        &mut self,
        mode: TrainingMode,
        x_train: &Array3<f32>,
        y_train: Option<&[i64]>,
        epochs: usize,
        batch_size: usize,
        save_name: Option<&str>,
    ) -> Result<StageOutput> {
        let y = match mode {
            TrainingMode::Pretrain => {
                return self
                    .pretrain(x_train, epochs, batch_size)
                    .map(StageOutput::Pretrained)
            }
            TrainingMode::Linear | TrainingMode::FineTune => y_train
                .ok_or_else(|| TrainError::MissingTargets(format!("{} training", mode)))?,
        };

        self.load_pretrained_if_available()?;
        let next = self.stage.transition(mode)?;
        check_inputs(self.config.model.shape(), x_train, Some(y))?;

        let dls = supervised_loaders(
            x_train,
            y,
            &mut self.labels,
            self.config.model.n_classes,
            &self.config.trainer,
            batch_size,
        )?;

        let classifier = self.config.model.init_classifier(
            self.autoencoder.encoder().clone(),
            mode.freezes_encoder(),
            &self.device,
        );
        info!(
            "{} training for {} epochs (encoder {})",
            mode,
            epochs,
            if mode.freezes_encoder() { "frozen" } else { "trainable" }
        );
        let trainer = ClassificationTrainer::<B>::new(self.config.trainer.clone(), self.device.clone());
        let output = trainer.fit(classifier, &dls, epochs)?;

        let name = save_name.unwrap_or(mode.checkpoint_name());
        save_module::<B, _>(&output.model, &self.config.checkpoint_dir, name)?;
        classifier_metadata(
            MAE_ARCH,
            next,
            &self.config.model,
            &output.history,
            self.labels.as_ref(),
        )?
        .save(&self.config.checkpoint_dir, name)?;

        self.classifier = Some(output.model);
        info!("Stage {} -> {}", self.stage, next);
        self.stage = next;
        Ok(StageOutput::Classifier(output.history))
    }

    fn load_pretrained_if_available(&mut self) -> Result<()> {
        let dir = &self.config.checkpoint_dir;
        let name = TrainingMode::Pretrain.checkpoint_name();
        if self.stage != ModelStage::Untrained || !tsformer_models::checkpoint_exists(dir, name) {
            return Ok(());
        }
        let encoder = load_module::<B, _>(self.autoencoder.encoder().clone(), dir, name, &self.device)?;
        let decoder = self.config.model.init_decoder::<B>(&self.device);
        self.autoencoder = MaskedAutoencoder::new(encoder, decoder);
        self.stage = ModelStage::Pretrained;
        info!("Loaded pretrained encoder from {}", dir.display());
        Ok(())
    }

    /// Predicted labels for `x`, in their original values.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NotTrained`] before a classifier exists.
    pub fn predict(&self, x: &Array3<f32>) -> Result<Vec<i64>> {
        let (classifier, labels) = self.trained()?;
        check_inputs(self.config.model.shape(), x, None)?;
        let loader = SeriesDataLoader::builder(SeriesDataset::from_arrays(x.clone(), None)?)
            .batch_size(EVAL_BATCH_SIZE)
            .build()?;
        let device = self.device.clone().into();
        let preds = predict::<B::InnerBackend, _>(&classifier.valid(), &loader, &device)?;
        Ok(labels.inverse_transform(&preds.classes)?)
    }

    /// Evaluate the classifier on `(x, y)` in inference mode.
    ///
    /// Prints the metric summary and writes artifacts named after `model_name`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NotTrained`] before a classifier exists, and data or
    /// I/O errors otherwise.
    pub fn evaluate(&self, x: &Array3<f32>, y: &[i64], model_name: &str) -> Result<EvaluationReport> {
        let (classifier, labels) = self.trained()?;
        check_inputs(self.config.model.shape(), x, Some(y))?;

        let device = self.device.clone().into();
        let report = evaluate_classifier::<B::InnerBackend, _>(
            &classifier.valid(),
            x,
            y,
            labels,
            EVAL_BATCH_SIZE,
            &device,
            model_name,
        )?;
        report_and_save(&report, &self.config.artifacts_dir(), model_name, x)?;
        Ok(report)
    }

    fn trained(&self) -> Result<(&MaeClassifier<B>, &LabelEncoder)> {
        match (&self.classifier, &self.labels) {
            (Some(classifier), Some(labels)) => Ok((classifier, labels)),
            _ => Err(TrainError::NotTrained),
        }
    }
}

/// Settings for [`ViTPipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViTPipelineConfig {
    /// Model architecture.
    pub model: ViTConfig,
    /// Optimizer, schedule, split and early-stopping settings.
    pub trainer: TrainerConfig,
    /// Where checkpoints are written.
    pub checkpoint_dir: PathBuf,
    /// Where evaluation artifacts are written; `<checkpoint_dir>/evaluation` if unset.
    pub artifacts_dir: Option<PathBuf>,
}

impl ViTPipelineConfig {
    /// Config for `shape` inputs, `n_classes` classes and checkpoints under `checkpoint_dir`.
    pub fn new(shape: SeriesShape, n_classes: usize, checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: ViTConfig::new(shape.n_vars(), shape.seq_len(), n_classes),
            trainer: TrainerConfig::default(),
            checkpoint_dir: checkpoint_dir.into(),
            artifacts_dir: None,
        }
    }

    /// Set the patch length.
    #[must_use]
    pub fn with_patch_len(mut self, patch_len: usize) -> Self {
        self.model.patch_len = patch_len;
        self
    }

    /// Replace the model configuration.
    #[must_use]
    pub fn with_model(mut self, model: ViTConfig) -> Self {
        self.model = model;
        self
    }

    /// Replace the trainer configuration.
    #[must_use]
    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    /// Set the artifacts directory.
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    /// Directory for evaluation artifacts.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir
            .clone()
            .unwrap_or_else(|| self.checkpoint_dir.join("evaluation"))
    }
}

/// Supervised ViT driver.
pub struct ViTPipeline<B: AutodiffBackend> {
    config: ViTPipelineConfig,
    device: B::Device,
    stage: ModelStage,
    model: ViTClassifier<B>,
    labels: Option<LabelEncoder>,
}

impl<B: AutodiffBackend> ViTPipeline<B> {
    /// Default checkpoint name.
    pub const CHECKPOINT_NAME: &'static str = "vit_model";

    /// Build a fresh, untrained pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the model or trainer configuration is invalid.
    pub fn new(config: ViTPipelineConfig, device: B::Device) -> Result<Self> {
        config.model.validate()?;
        config.trainer.validate()?;
        config.trainer.seed.seed_backend::<B>();

        let shape = config.model.shape();
        let dropped = shape.truncated_steps(config.model.patch_len);
        if dropped > 0 {
            warn!(
                "patch_len {} does not divide seq_len {}; the last {} timesteps are ignored",
                config.model.patch_len,
                shape.seq_len(),
                dropped
            );
        }

        let model = config.model.init::<B>(&device);
        info!(
            "ViT pipeline: {} vars x {} steps, {} patches, {} classes",
            shape.n_vars(),
            shape.seq_len(),
            model.n_patches(),
            config.model.n_classes
        );
        Ok(Self {
            config,
            device,
            stage: ModelStage::Untrained,
            model,
            labels: None,
        })
    }

    /// Restore a trained pipeline from `<dir>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the files are missing or belong to another architecture.
    pub fn from_checkpoint(dir: impl AsRef<Path>, name: &str, device: B::Device) -> Result<Self> {
        let dir = dir.as_ref();
        let (meta, stage) = load_metadata(dir, name, VIT_ARCH)?;
        let model: ViTConfig = meta.config()?;
        let config = ViTPipelineConfig::new(model.shape(), model.n_classes, dir).with_model(model);
        let mut pipeline = Self::new(config, device)?;

        pipeline.model = load_module::<B, _>(pipeline.model.clone(), dir, name, &pipeline.device)?;
        pipeline.labels = meta.classes.map(LabelEncoder::from_classes);
        pipeline.stage = stage;
        info!("Restored ViT pipeline from {}", dir.display());
        Ok(pipeline)
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> ModelStage {
        self.stage
    }

    /// Pipeline settings.
    pub fn config(&self) -> &ViTPipelineConfig {
        &self.config
    }

    /// Redirect evaluation artifacts.
    pub fn set_artifacts_dir(&mut self, dir: impl Into<PathBuf>) {
        self.config.artifacts_dir = Some(dir.into());
    }

    /// The model.
    pub fn model(&self) -> &ViTClassifier<B> {
        &self.model
    }

    /// Label classes in class-index order, once fitted.
    pub fn labels(&self) -> Option<&LabelEncoder> {
        self.labels.as_ref()
    }

    /// Train on `(x_train, y_train)` and save the best weights as `save_name`
    /// or `vit_model`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::InvalidStage`] if the model was already trained,
    /// and data or checkpoint errors otherwise.
    pub fn train(
        &mut self,
        x_train: &Array3<f32>,
        y_train: &[i64],
        epochs: usize,
        batch_size: usize,
        save_name: Option<&str>,
    ) -> Result<TrainingHistory> {
        let next = self.stage.transition(TrainingMode::FineTune)?;
        check_inputs(self.config.model.shape(), x_train, Some(y_train))?;

        let dls = supervised_loaders(
            x_train,
            y_train,
            &mut self.labels,
            self.config.model.n_classes,
            &self.config.trainer,
            batch_size,
        )?;

        info!("ViT training for {} epochs", epochs);
        let trainer = ClassificationTrainer::<B>::new(self.config.trainer.clone(), self.device.clone());
        let output = trainer.fit(self.model.clone(), &dls, epochs)?;

        let name = save_name.unwrap_or(Self::CHECKPOINT_NAME);
        save_module::<B, _>(&output.model, &self.config.checkpoint_dir, name)?;
        classifier_metadata(
            VIT_ARCH,
            next,
            &self.config.model,
            &output.history,
            self.labels.as_ref(),
        )?
        .save(&self.config.checkpoint_dir, name)?;

        self.model = output.model;
        info!("Stage {} -> {}", self.stage, next);
        self.stage = next;
        Ok(output.history)
    }

    /// Predicted labels for `x`, in their original values.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NotTrained`] before training or loading.
    pub fn predict(&self, x: &Array3<f32>) -> Result<Vec<i64>> {
        let labels = self.labels.as_ref().ok_or(TrainError::NotTrained)?;
        check_inputs(self.config.model.shape(), x, None)?;
        let loader = SeriesDataLoader::builder(SeriesDataset::from_arrays(x.clone(), None)?)
            .batch_size(EVAL_BATCH_SIZE)
            .build()?;
        let device = self.device.clone().into();
        let preds = predict::<B::InnerBackend, _>(&self.model.valid(), &loader, &device)?;
        Ok(labels.inverse_transform(&preds.classes)?)
    }

    /// Evaluate on `(x, y)` in inference mode.
    ///
    /// Prints the metric summary and writes artifacts named after `model_name`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NotTrained`] before training or loading, and data
    /// or I/O errors otherwise.
    pub fn evaluate(&self, x: &Array3<f32>, y: &[i64], model_name: &str) -> Result<EvaluationReport> {
        let labels = self.labels.as_ref().ok_or(TrainError::NotTrained)?;
        check_inputs(self.config.model.shape(), x, Some(y))?;

        let device = self.device.clone().into();
        let report = evaluate_classifier::<B::InnerBackend, _>(
            &self.model.valid(),
            x,
            y,
            labels,
            EVAL_BATCH_SIZE,
            &device,
            model_name,
        )?;
        report_and_save(&report, &self.config.artifacts_dir(), model_name, x)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn small_mae(dir: &Path) -> MaePipelineConfig {
        let model = MaeConfig::new(2, 8, 2)
            .with_d_model(8)
            .with_key_dim(4)
            .with_encoder(1, 2)
            .with_decoder(1, 1)
            .with_mask_ratio(0.5);
        MaePipelineConfig::new(SeriesShape::new(2, 8), 2, dir)
            .with_model(model)
            .with_trainer(TrainerConfig::new().with_verbose(false))
    }

    fn data(n: usize) -> (Array3<f32>, Vec<i64>) {
        let y: Vec<i64> = (0..n).map(|i| (i % 2) as i64 * 5).collect();
        let x = Array3::from_shape_fn((n, 2, 8), |(i, v, t)| {
            let sign = if y[i] == 0 { -1.0 } else { 1.0 };
            sign * (1.0 + v as f32) + t as f32 * 0.01
        });
        (x, y)
    }

    #[test]
    fn test_linear_requires_pretraining() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = MaePipeline::<TestBackend>::new(small_mae(dir.path()), Default::default()).unwrap();
        let (x, y) = data(8);

        let err = pipeline.train(TrainingMode::Linear, &x, Some(&y), 1, 4, None);
        assert!(matches!(err, Err(TrainError::InvalidStage { .. })));
        assert_eq!(pipeline.stage(), ModelStage::Untrained);
    }

    #[test]
    fn test_supervised_mode_requires_labels() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = MaePipeline::<TestBackend>::new(small_mae(dir.path()), Default::default()).unwrap();
        let (x, _) = data(8);

        let err = pipeline.train(TrainingMode::FineTune, &x, None, 1, 4, None);
        assert!(matches!(err, Err(TrainError::MissingTargets(_))));
    }

    #[test]
    fn test_rejects_fewer_label_classes_than_outputs() {
        let dir = TempDir::new().unwrap();
        let mut config = small_mae(dir.path());
        config.model.n_classes = 4;
        let mut pipeline = MaePipeline::<TestBackend>::new(config, Default::default()).unwrap();
        let (x, y) = data(8);

        let err = pipeline.train(TrainingMode::FineTune, &x, Some(&y), 1, 4, None);
        assert!(matches!(err, Err(TrainError::ShapeMismatch(_))));
        assert_eq!(pipeline.stage(), ModelStage::Untrained);
        assert!(pipeline.labels().is_none());
        assert!(!dir.path().join("finetune_model.mpk").exists());
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = MaePipeline::<TestBackend>::new(small_mae(dir.path()), Default::default()).unwrap();
        let x = Array3::zeros((4, 3, 8));

        assert!(pipeline.pretrain(&x, 1, 2).is_err());
        assert_eq!(pipeline.stage(), ModelStage::Untrained);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = small_mae(dir.path()).with_mask_ratio(1.0);
        assert!(MaePipeline::<TestBackend>::new(config, Default::default()).is_err());
    }

    #[test]
    fn test_evaluate_before_training() {
        let dir = TempDir::new().unwrap();
        let pipeline = MaePipeline::<TestBackend>::new(small_mae(dir.path()), Default::default()).unwrap();
        let (x, y) = data(4);
        assert!(matches!(pipeline.evaluate(&x, &y, "m"), Err(TrainError::NotTrained)));
    }

    #[test]
    fn test_pretrain_then_finetune_saves_checkpoints() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = MaePipeline::<TestBackend>::new(small_mae(dir.path()), Default::default()).unwrap();
        let (x, y) = data(10);

        let history = pipeline.pretrain(&x, 2, 4).unwrap();
        assert_eq!(history.epochs_run(), 2);
        assert_eq!(pipeline.stage(), ModelStage::Pretrained);
        assert!(dir.path().join("pretrained_encoder.mpk").is_file());
        assert!(dir.path().join("pretrained_encoder.json").is_file());

        let out = pipeline
            .train(TrainingMode::FineTune, &x, Some(&y), 2, 4, Some("custom"))
            .unwrap();
        assert!(matches!(out, StageOutput::Classifier(_)));
        assert_eq!(pipeline.stage(), ModelStage::FineTuned);
        assert!(dir.path().join("custom.mpk").is_file());
        assert_eq!(pipeline.labels().unwrap().classes(), &[0, 5]);

        let again = pipeline.train(TrainingMode::Linear, &x, Some(&y), 1, 4, None);
        assert!(matches!(again, Err(TrainError::InvalidStage { .. })));
    }

    #[test]
    fn test_vit_train_and_restore() {
        let dir = TempDir::new().unwrap();
        let model = ViTConfig::new(2, 8, 2)
            .with_patch_len(2)
            .with_d_model(8)
            .with_n_heads(2)
            .with_key_dim(4)
            .with_depth(1);
        let config = ViTPipelineConfig::new(SeriesShape::new(2, 8), 2, dir.path())
            .with_model(model)
            .with_trainer(TrainerConfig::new().with_verbose(false));
        let mut pipeline = ViTPipeline::<TestBackend>::new(config, Default::default()).unwrap();
        let (x, y) = data(10);

        pipeline.train(&x, &y, 2, 4, None).unwrap();
        assert!(dir.path().join("vit_model.mpk").is_file());
        let before = pipeline.predict(&x).unwrap();

        let restored =
            ViTPipeline::<TestBackend>::from_checkpoint(dir.path(), "vit_model", Default::default()).unwrap();
        assert_eq!(restored.stage(), ModelStage::FineTuned);
        assert_eq!(restored.predict(&x).unwrap(), before);

        let wrong = MaePipeline::<TestBackend>::from_checkpoint(dir.path(), "vit_model", Default::default());
        assert!(matches!(wrong, Err(TrainError::ArchMismatch { .. })));
    }
}
