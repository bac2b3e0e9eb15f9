//! Training loops.
//!
//! Both trainers run an ordinary synchronous loop: forward, backward, Adam step
//! with a scheduled learning rate. After every epoch the model is validated on
//! the inner (non-autodiff) backend, so dropout is off, and the best weights
//! seen so far are kept.

use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use tracing::{debug, info};

use crate::config::TrainerConfig;
use crate::error::{Result, TrainError};
use crate::losses::{CrossEntropyLoss, ZeroMaskedMseLoss};
use crate::scheduler::Scheduler;
use tsformer_core::SeriesClassifier;
use tsformer_data::{SeriesDataLoader, SeriesDataLoaders};
use tsformer_models::MaskedAutoencoder;

/// Per-epoch history of one training call.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingHistory {
    /// Mean training loss per epoch.
    pub train_losses: Vec<f32>,
    /// Mean validation loss per epoch (empty without validation data).
    pub valid_losses: Vec<f32>,
    /// Validation accuracy per epoch (empty for pretraining).
    pub valid_accs: Vec<f32>,
    /// Zero-based epoch the kept weights come from.
    pub best_epoch: usize,
    /// Validation loss at the best epoch.
    pub best_valid_loss: Option<f32>,
    /// Validation accuracy at the best epoch.
    pub best_valid_acc: Option<f32>,
    /// Whether early stopping ended the run.
    pub stopped_early: bool,
    /// Wall-clock training time.
    pub training_time_secs: f64,
}

impl TrainingHistory {
    /// Number of epochs that ran.
    pub fn epochs_run(&self) -> usize {
        self.train_losses.len()
    }
}

/// Best weights and the history that produced them.
#[derive(Debug)]
pub struct TrainingOutput<M> {
    /// Weights from the best epoch.
    pub model: M,
    /// Training history.
    pub history: TrainingHistory,
}

// Tracks the best score and the early-stopping counter.
struct Monitor {
    best: Option<f32>,
    higher_is_better: bool,
    min_delta: f32,
    patience: usize,
    stale: usize,
}

impl Monitor {
    fn new(config: &TrainerConfig, higher_is_better: bool) -> Self {
        Self {
            best: None,
            higher_is_better,
            min_delta: config.early_stopping_min_delta,
            patience: config.early_stopping_patience,
            stale: 0,
        }
    }

    fn update(&mut self, score: f32) -> bool {
        let improved = match self.best {
            None => true,
            Some(best) if self.higher_is_better => score > best + self.min_delta,
            Some(best) => score < best - self.min_delta,
        };
        if improved {
            self.best = Some(score);
            self.stale = 0;
        } else {
            self.stale += 1;
        }
        improved
    }

    fn should_stop(&self) -> bool {
        self.patience > 0 && self.stale >= self.patience
    }
}

fn log_epoch(verbose: bool, message: String) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

/// Supervised trainer for any [`SeriesClassifier`].
///
/// The best epoch is the one with the highest validation accuracy.
pub struct ClassificationTrainer<B: AutodiffBackend> {
    config: TrainerConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> ClassificationTrainer<B> {
    /// Create a trainer.
    pub fn new(config: TrainerConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Train `model` for up to `epochs` epochs.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch cannot be built or lacks labels.
    pub fn fit<M>(&self, model: M, dls: &SeriesDataLoaders, epochs: usize) -> Result<TrainingOutput<M>>
    where
        M: AutodiffModule<B> + SeriesClassifier<B>,
        M::InnerModule: SeriesClassifier<B::InnerBackend>,
    {
        let start = Instant::now();

        let mut optim = AdamConfig::new()
            .with_weight_decay(Some(WeightDecayConfig::new(self.config.weight_decay)))
            .init::<B, M>();
        let scheduler = self
            .config
            .schedule
            .build(self.config.lr, epochs * dls.train().n_batches());

        let mut history = TrainingHistory::default();
        let mut monitor = Monitor::new(&self.config, true);
        let mut best_model = model.clone();
        let mut model = model;
        let mut step = 0;

        for epoch in 0..epochs {
            let lr = scheduler.get_lr(step);
            let train_loss = self.train_epoch(&mut model, &mut optim, dls.train(), scheduler.as_ref(), &mut step, epoch)?;
            let (valid_loss, valid_acc) = self.valid_epoch(&model, dls.valid())?;

            history.train_losses.push(train_loss);
            history.valid_losses.push(valid_loss);
            history.valid_accs.push(valid_acc);

            let improved = monitor.update(valid_acc);
            if improved {
                best_model = model.clone();
                history.best_epoch = epoch;
                history.best_valid_acc = Some(valid_acc);
                history.best_valid_loss = Some(valid_loss);
            }

            log_epoch(
                self.config.verbose,
                format!(
                    "Epoch {:3}/{}: lr={:.2e} train_loss={:.4} valid_loss={:.4} valid_acc={:.2}%{}",
                    epoch + 1,
                    epochs,
                    lr,
                    train_loss,
                    valid_loss,
                    valid_acc * 100.0,
                    if improved { " *" } else { "" }
                ),
            );

            if monitor.should_stop() {
                info!(
                    "Early stopping after {} epochs without improvement",
                    self.config.early_stopping_patience
                );
                history.stopped_early = true;
                break;
            }
        }

        history.training_time_secs = start.elapsed().as_secs_f64();
        if let Some(acc) = history.best_valid_acc {
            info!(
                "Training complete in {:.1}s, best valid_acc={:.2}% at epoch {}",
                history.training_time_secs,
                acc * 100.0,
                history.best_epoch + 1
            );
        }

        Ok(TrainingOutput {
            model: best_model,
            history,
        })
    }

    fn train_epoch<M, O>(
        &self,
        model: &mut M,
        optim: &mut O,
        loader: &SeriesDataLoader,
        scheduler: &dyn Scheduler,
        step: &mut usize,
        epoch: usize,
    ) -> Result<f32>
    where
        M: AutodiffModule<B> + SeriesClassifier<B>,
        O: Optimizer<M, B>,
    {
        let loss_fn = CrossEntropyLoss::new();
        let mut total_loss = 0.0f32;
        let mut n_batches = 0usize;

        for batch in loader.iter_epoch::<B>(&self.device, epoch) {
            let batch = batch?;
            let targets = batch
                .targets
                .ok_or_else(|| TrainError::MissingTargets("classification batch".to_string()))?;

            let loss = loss_fn.forward(model.forward(batch.x), targets);
            let loss_value = loss.clone().into_scalar().elem::<f32>();
            debug!("step {}: loss={:.4}", step, loss_value);

            let grads = GradientsParams::from_grads(loss.backward(), &*model);
            *model = optim.step(scheduler.get_lr(*step), model.clone(), grads);

            total_loss += loss_value;
            n_batches += 1;
            *step += 1;
        }

        Ok(total_loss / n_batches.max(1) as f32)
    }

    fn valid_epoch<M>(&self, model: &M, loader: &SeriesDataLoader) -> Result<(f32, f32)>
    where
        M: AutodiffModule<B>,
        M::InnerModule: SeriesClassifier<B::InnerBackend>,
    {
        let inner = model.valid();
        let device: <B::InnerBackend as Backend>::Device = self.device.clone().into();
        let loss_fn = CrossEntropyLoss::new();

        let mut weighted_loss = 0.0f32;
        let mut correct = 0usize;
        let mut total = 0usize;

        for batch in loader.iter::<B::InnerBackend>(&device) {
            let batch = batch?;
            let n = batch.len();
            let targets = batch
                .targets
                .ok_or_else(|| TrainError::MissingTargets("validation batch".to_string()))?;

            let logits = inner.forward(batch.x);
            let loss = loss_fn.forward(logits.clone(), targets.clone());
            weighted_loss += loss.into_scalar().elem::<f32>() * n as f32;

            let preds: Tensor<B::InnerBackend, 1, Int> = logits.argmax(1).squeeze(1);
            let hits = preds.equal(targets).int().sum().into_scalar().elem::<i64>();
            correct += hits as usize;
            total += n;
        }

        if total == 0 {
            return Ok((0.0, 0.0));
        }
        Ok((weighted_loss / total as f32, correct as f32 / total as f32))
    }
}

/// Self-supervised trainer for a [`MaskedAutoencoder`].
///
/// The loss is [`ZeroMaskedMseLoss`] between the decoder output and the raw
/// values at the kept timesteps. With validation data the best epoch has the
/// lowest validation loss, otherwise the lowest training loss.
pub struct PretrainTrainer<B: AutodiffBackend> {
    config: TrainerConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> PretrainTrainer<B> {
    /// Create a trainer.
    pub fn new(config: TrainerConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Pretrain for up to `epochs` epochs masking `mask_ratio` of each sample.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch cannot be built.
    pub fn fit(
        &self,
        model: MaskedAutoencoder<B>,
        train: &SeriesDataLoader,
        valid: Option<&SeriesDataLoader>,
        epochs: usize,
        mask_ratio: f64,
    ) -> Result<TrainingOutput<MaskedAutoencoder<B>>> {
        let start = Instant::now();

        let mut optim = AdamConfig::new()
            .with_weight_decay(Some(WeightDecayConfig::new(self.config.weight_decay)))
            .init::<B, MaskedAutoencoder<B>>();
        let scheduler = self.config.schedule.build(self.config.lr, epochs * train.n_batches());
        let loss_fn = ZeroMaskedMseLoss::new();

        let mut history = TrainingHistory::default();
        let mut monitor = Monitor::new(&self.config, false);
        let mut best_model = model.clone();
        let mut model = model;
        let mut step = 0usize;

        for epoch in 0..epochs {
            let mut total_loss = 0.0f32;
            let mut n_batches = 0usize;

            for batch in train.iter_epoch::<B>(&self.device, epoch) {
                let batch = batch?;
                let out = model.forward(batch.x, mask_ratio);
                let loss = loss_fn.forward(out.pred, out.target);
                let loss_value = loss.clone().into_scalar().elem::<f32>();
                debug!("step {}: reconstruction_loss={:.6}", step, loss_value);

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(scheduler.get_lr(step), model, grads);

                total_loss += loss_value;
                n_batches += 1;
                step += 1;
            }
            let train_loss = total_loss / n_batches.max(1) as f32;
            history.train_losses.push(train_loss);

            let valid_loss = match valid {
                Some(loader) => {
                    let loss = self.valid_epoch(&model, loader, mask_ratio)?;
                    history.valid_losses.push(loss);
                    Some(loss)
                }
                None => None,
            };

            let score = valid_loss.unwrap_or(train_loss);
            let improved = monitor.update(score);
            if improved {
                best_model = model.clone();
                history.best_epoch = epoch;
                history.best_valid_loss = valid_loss;
            }

            log_epoch(
                self.config.verbose,
                format!(
                    "Pretrain epoch {:3}/{}: train_loss={:.6} valid_loss={}{}",
                    epoch + 1,
                    epochs,
                    train_loss,
                    valid_loss.map_or_else(|| "-".to_string(), |l| format!("{:.6}", l)),
                    if improved { " *" } else { "" }
                ),
            );

            if monitor.should_stop() {
                info!(
                    "Early stopping after {} epochs without improvement",
                    self.config.early_stopping_patience
                );
                history.stopped_early = true;
                break;
            }
        }

        history.training_time_secs = start.elapsed().as_secs_f64();
        info!(
            "Pretraining complete in {:.1}s, best epoch {}",
            history.training_time_secs,
            history.best_epoch + 1
        );

        Ok(TrainingOutput {
            model: best_model,
            history,
        })
    }

    fn valid_epoch(
        &self,
        model: &MaskedAutoencoder<B>,
        loader: &SeriesDataLoader,
        mask_ratio: f64,
    ) -> Result<f32> {
        let inner = model.valid();
        let device: <B::InnerBackend as Backend>::Device = self.device.clone().into();
        let loss_fn = ZeroMaskedMseLoss::new();

        let mut weighted_loss = 0.0f32;
        let mut total = 0usize;
        for batch in loader.iter::<B::InnerBackend>(&device) {
            let batch = batch?;
            let n = batch.len();
            let out = inner.forward(batch.x, mask_ratio);
            weighted_loss += loss_fn.forward(out.pred, out.target).into_scalar().elem::<f32>() * n as f32;
            total += n;
        }
        Ok(weighted_loss / total.max(1) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;
    use ndarray::Array3;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use tsformer_core::Seed;
    use tsformer_data::SeriesDataset;
    use tsformer_models::{MaeConfig, ViTConfig};

    type TestBackend = Autodiff<NdArray>;

    fn dataset(n: usize, labeled: bool) -> SeriesDataset {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let y: Vec<usize> = (0..n).map(|i| i % 2).collect();
        let x = Array3::from_shape_fn((n, 2, 8), |(i, v, _)| {
            let sign = if y[i] == 0 { -1.0 } else { 1.0 };
            let base = if v == 0 { sign } else { 0.5 };
            base + rng.gen_range(-0.1..0.1)
        });
        SeriesDataset::from_arrays(x, labeled.then_some(y)).unwrap()
    }

    #[test]
    fn test_monitor() {
        let config = TrainerConfig::new().with_early_stopping(2, 0.0);
        let mut m = Monitor::new(&config, true);
        assert!(m.update(0.5));
        assert!(!m.update(0.5));
        assert!(!m.should_stop());
        assert!(!m.update(0.4));
        assert!(m.should_stop());

        let mut low = Monitor::new(&config, false);
        assert!(low.update(1.0));
        assert!(low.update(0.5));
    }

    #[test]
    fn test_classification_fit_records_history() {
        let device = Default::default();
        let ds = dataset(16, true);
        let dls = SeriesDataLoaders::new(ds.clone(), ds, 8, Seed::new(1)).unwrap();

        let model = ViTConfig::new(2, 8, 2)
            .with_d_model(8)
            .with_n_heads(2)
            .with_key_dim(4)
            .with_depth(1)
            .with_head_hidden(0)
            .init::<TestBackend>(&device);
        let trainer = ClassificationTrainer::<TestBackend>::new(TrainerConfig::new().with_verbose(false), device);
        let out = trainer.fit(model, &dls, 3).unwrap();

        assert_eq!(out.history.epochs_run(), 3);
        assert_eq!(out.history.valid_accs.len(), 3);
        assert!(out.history.best_valid_acc.is_some());
        assert!(out.history.train_losses.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_classification_requires_labels() {
        let device = Default::default();
        let ds = dataset(8, false);
        let dls = SeriesDataLoaders::new(ds.clone(), ds, 4, Seed::new(1)).unwrap();
        let model = ViTConfig::new(2, 8, 2)
            .with_d_model(8)
            .with_depth(1)
            .init::<TestBackend>(&device);
        let trainer = ClassificationTrainer::<TestBackend>::new(TrainerConfig::new(), device);
        assert!(matches!(trainer.fit(model, &dls, 1), Err(TrainError::MissingTargets(_))));
    }

    #[test]
    fn test_pretrain_reduces_loss() {
        let device = Default::default();
        let loader = SeriesDataLoader::builder(dataset(32, false))
            .batch_size(8)
            .shuffle(true)
            .build()
            .unwrap();
        let model = MaeConfig::new(2, 8, 2)
            .with_d_model(16)
            .with_key_dim(8)
            .with_encoder(1, 2)
            .with_decoder(1, 1)
            .with_dropout(0.0)
            .init_autoencoder::<TestBackend>(&device);

        let trainer = PretrainTrainer::<TestBackend>::new(
            TrainerConfig::new().with_lr(1e-2).with_verbose(false),
            device,
        );
        let out = trainer.fit(model, &loader, None, 15, 0.5).unwrap();

        let losses = &out.history.train_losses;
        assert_eq!(losses.len(), 15);
        assert!(losses.last().unwrap() < losses.first().unwrap());
        assert!(out.history.valid_losses.is_empty());
    }
}
