//! Trainer configuration.

use serde::{Deserialize, Serialize};
use tsformer_core::{CoreError, Seed};

use crate::scheduler::LrSchedule;

/// Optimizer, schedule, validation and early-stopping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Base (or peak, for one-cycle) learning rate.
    pub lr: f64,
    /// Adam weight decay.
    pub weight_decay: f32,
    /// Learning-rate schedule.
    pub schedule: LrSchedule,
    /// Fraction of training samples held out for validation.
    pub valid_ratio: f32,
    /// Seed for splits, shuffling and the backend RNG.
    pub seed: Seed,
    /// Epochs without improvement before stopping (0 disables).
    pub early_stopping_patience: usize,
    /// Minimum improvement that resets the patience counter.
    pub early_stopping_min_delta: f32,
    /// Log every epoch at info level (debug otherwise).
    pub verbose: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            weight_decay: 1e-4,
            schedule: LrSchedule::OneCycle,
            valid_ratio: 0.2,
            seed: Seed::default(),
            early_stopping_patience: 0,
            early_stopping_min_delta: 1e-3,
            verbose: true,
        }
    }
}

impl TrainerConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    /// Set the weight decay.
    #[must_use]
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Set the schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: LrSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the validation fraction.
    #[must_use]
    pub fn with_valid_ratio(mut self, valid_ratio: f32) -> Self {
        self.valid_ratio = valid_ratio;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<Seed>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Enable early stopping.
    #[must_use]
    pub fn with_early_stopping(mut self, patience: usize, min_delta: f32) -> Self {
        self.early_stopping_patience = patience;
        self.early_stopping_min_delta = min_delta;
        self
    }

    /// Set verbosity.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive learning rate or a validation ratio
    /// outside `(0, 1)`.
    pub fn validate(&self) -> tsformer_core::Result<()> {
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            return Err(CoreError::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.lr
            )));
        }
        if !(self.valid_ratio > 0.0 && self.valid_ratio < 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "valid_ratio must be in (0, 1), got {}",
                self.valid_ratio
            )));
        }
        Ok(())
    }
}
