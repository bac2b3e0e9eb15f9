//! Learning rate schedulers.

use serde::{Deserialize, Serialize};

/// Learning rate as a function of the global optimizer step.
pub trait Scheduler: Send + Sync {
    /// Learning rate for `step`.
    fn get_lr(&self, step: usize) -> f64;

    /// Scheduler name.
    fn name(&self) -> &str;
}

/// Which schedule a trainer uses.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrSchedule {
    /// The base learning rate throughout.
    Constant,
    /// Warm up to the base rate, then cosine-anneal.
    #[default]
    OneCycle,
}

impl LrSchedule {
    /// Build the scheduler for `lr` over `total_steps` optimizer steps.
    pub fn build(&self, lr: f64, total_steps: usize) -> Box<dyn Scheduler> {
        match self {
            Self::Constant => Box::new(ConstantLR::new(lr)),
            Self::OneCycle => Box::new(OneCycleLR::simple(lr, total_steps)),
        }
    }
}

/// Configuration for [`OneCycleLR`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneCycleLRConfig {
    /// Peak learning rate.
    pub max_lr: f64,
    /// Total number of steps.
    pub total_steps: usize,
    /// Fraction of steps spent warming up.
    pub pct_start: f64,
    /// `max_lr / div_factor` is the starting rate.
    pub div_factor: f64,
    /// `max_lr / final_div_factor` is the final rate.
    pub final_div_factor: f64,
}

impl Default for OneCycleLRConfig {
    fn default() -> Self {
        Self {
            max_lr: 1e-3,
            total_steps: 1000,
            pct_start: 0.3,
            div_factor: 25.0,
            final_div_factor: 10000.0,
        }
    }
}

/// One-cycle policy: linear warmup to `max_lr`, cosine decay afterwards.
#[derive(Debug, Clone)]
pub struct OneCycleLR {
    config: OneCycleLRConfig,
    initial_lr: f64,
    final_lr: f64,
    warmup_steps: usize,
}

impl OneCycleLR {
    /// Create from a full configuration.
    pub fn new(config: OneCycleLRConfig) -> Self {
        let initial_lr = config.max_lr / config.div_factor;
        let final_lr = config.max_lr / config.final_div_factor;
        let warmup_steps = (config.total_steps as f64 * config.pct_start) as usize;
        Self {
            config,
            initial_lr,
            final_lr,
            warmup_steps,
        }
    }

    /// Create with default shape parameters.
    pub fn simple(max_lr: f64, total_steps: usize) -> Self {
        Self::new(OneCycleLRConfig {
            max_lr,
            total_steps,
            ..Default::default()
        })
    }
}

impl Scheduler for OneCycleLR {
    fn get_lr(&self, step: usize) -> f64 {
        let step = step.min(self.config.total_steps.saturating_sub(1));
        if step < self.warmup_steps {
            let progress = step as f64 / self.warmup_steps as f64;
            self.initial_lr + (self.config.max_lr - self.initial_lr) * progress
        } else {
            let annealing_steps = (self.config.total_steps - self.warmup_steps).max(1);
            let progress = (step - self.warmup_steps) as f64 / annealing_steps as f64;
            let cosine = (1.0 + (std::f64::consts::PI * progress).cos()) / 2.0;
            self.final_lr + (self.config.max_lr - self.final_lr) * cosine
        }
    }

    fn name(&self) -> &str {
        "OneCycleLR"
    }
}

/// Constant learning rate.
#[derive(Debug, Clone)]
pub struct ConstantLR {
    lr: f64,
}

impl ConstantLR {
    /// Create a constant schedule.
    pub fn new(lr: f64) -> Self {
        Self { lr }
    }
}

impl Scheduler for ConstantLR {
    fn get_lr(&self, _step: usize) -> f64 {
        self.lr
    }

    fn name(&self) -> &str {
        "ConstantLR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_cycle_shape() {
        let sched = OneCycleLR::simple(1e-2, 100);
        let start = sched.get_lr(0);
        let peak = sched.get_lr(30);
        let end = sched.get_lr(99);

        assert!((start - 1e-2 / 25.0).abs() < 1e-12);
        assert!((peak - 1e-2).abs() < 1e-12);
        assert!(end < start);
        assert!(sched.get_lr(15) > start && sched.get_lr(15) < peak);
    }

    #[test]
    fn test_one_cycle_single_step() {
        let sched = OneCycleLR::simple(1e-3, 1);
        assert!(sched.get_lr(0).is_finite());
        assert!(sched.get_lr(5).is_finite());
    }

    #[test]
    fn test_schedule_build() {
        let constant = LrSchedule::Constant.build(0.1, 10);
        assert_eq!(constant.name(), "ConstantLR");
        assert_eq!(constant.get_lr(7), 0.1);
        assert_eq!(LrSchedule::default().build(0.1, 10).name(), "OneCycleLR");
    }
}
