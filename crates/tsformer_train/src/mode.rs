//! Training modes and the model stage machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};

/// How a training call uses the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// Self-supervised masked reconstruction with encoder and decoder.
    Pretrain,
    /// Frozen encoder, only the classification head learns.
    Linear,
    /// Encoder and head learn jointly.
    FineTune,
}

impl TrainingMode {
    /// Checkpoint name used when no explicit name is given.
    pub fn checkpoint_name(&self) -> &'static str {
        match self {
            Self::Pretrain => "pretrained_encoder",
            Self::Linear => "linear_model",
            Self::FineTune => "finetune_model",
        }
    }

    /// Whether the encoder is frozen in this mode.
    pub fn freezes_encoder(&self) -> bool {
        matches!(self, Self::Linear)
    }

    /// Whether this mode needs labels.
    pub fn is_supervised(&self) -> bool {
        !matches!(self, Self::Pretrain)
    }
}

impl fmt::Display for TrainingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pretrain => "pretrain",
            Self::Linear => "linear",
            Self::FineTune => "finetune",
        };
        f.write_str(name)
    }
}

impl FromStr for TrainingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretrain" => Ok(Self::Pretrain),
            "linear" => Ok(Self::Linear),
            "finetune" | "fine-tune" | "fine_tune" => Ok(Self::FineTune),
            other => Err(format!("unknown training mode '{}'", other)),
        }
    }
}

/// Where a model is in its lifecycle.
///
/// ```text
/// Untrained --pretrain--> Pretrained --linear--> Linear
///     |                       |
///     |                       +--finetune--> FineTuned
///     +--finetune------------------------> FineTuned
/// ```
///
/// `Linear` and `FineTuned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStage {
    /// Fresh weights.
    #[default]
    Untrained,
    /// Encoder pretrained on masked reconstruction.
    Pretrained,
    /// Linear head trained on a frozen encoder.
    Linear,
    /// Encoder and head trained on labels.
    FineTuned,
}

impl ModelStage {
    /// The stage reached by running `mode` from this stage.
    ///
    /// Pretraining may be repeated while the model is still `Pretrained`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::InvalidStage`] for `Linear` without a pretrained
    /// encoder and for any call from a terminal stage.
    pub fn transition(self, mode: TrainingMode) -> Result<Self> {
        use ModelStage::*;
        match (self, mode) {
            (Untrained | Pretrained, TrainingMode::Pretrain) => Ok(Pretrained),
            (Pretrained, TrainingMode::Linear) => Ok(Linear),
            (Untrained | Pretrained, TrainingMode::FineTune) => Ok(FineTuned),
            (from, mode) => Err(TrainError::InvalidStage { from, mode }),
        }
    }

    /// Whether no further training is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Linear | Self::FineTuned)
    }

    /// Whether a classifier exists at this stage.
    pub fn has_classifier(&self) -> bool {
        self.is_terminal()
    }
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Untrained => "untrained",
            Self::Pretrained => "pretrained",
            Self::Linear => "linear",
            Self::FineTuned => "fine_tuned",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "untrained" => Ok(Self::Untrained),
            "pretrained" => Ok(Self::Pretrained),
            "linear" => Ok(Self::Linear),
            "fine_tuned" => Ok(Self::FineTuned),
            other => Err(format!("unknown model stage '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use ModelStage::*;
        assert_eq!(Untrained.transition(TrainingMode::Pretrain).unwrap(), Pretrained);
        assert_eq!(Pretrained.transition(TrainingMode::Pretrain).unwrap(), Pretrained);
        assert_eq!(Pretrained.transition(TrainingMode::Linear).unwrap(), Linear);
        assert_eq!(Pretrained.transition(TrainingMode::FineTune).unwrap(), FineTuned);
        assert_eq!(Untrained.transition(TrainingMode::FineTune).unwrap(), FineTuned);
    }

    #[test]
    fn test_linear_requires_pretrained() {
        assert!(matches!(
            ModelStage::Untrained.transition(TrainingMode::Linear),
            Err(TrainError::InvalidStage { .. })
        ));
    }

    #[test]
    fn test_terminal_stages_reject_everything() {
        for stage in [ModelStage::Linear, ModelStage::FineTuned] {
            assert!(stage.is_terminal());
            for mode in [TrainingMode::Pretrain, TrainingMode::Linear, TrainingMode::FineTune] {
                assert!(stage.transition(mode).is_err());
            }
        }
    }

    #[test]
    fn test_checkpoint_names() {
        assert_eq!(TrainingMode::Pretrain.checkpoint_name(), "pretrained_encoder");
        assert_eq!(TrainingMode::Linear.checkpoint_name(), "linear_model");
        assert_eq!(TrainingMode::FineTune.checkpoint_name(), "finetune_model");
        assert!(TrainingMode::Linear.freezes_encoder());
        assert!(!TrainingMode::FineTune.freezes_encoder());
    }

    #[test]
    fn test_parse_round_trip() {
        for stage in [
            ModelStage::Untrained,
            ModelStage::Pretrained,
            ModelStage::Linear,
            ModelStage::FineTuned,
        ] {
            assert_eq!(stage.to_string().parse::<ModelStage>().unwrap(), stage);
        }
        assert_eq!("fine-tune".parse::<TrainingMode>().unwrap(), TrainingMode::FineTune);
        assert!("frozen".parse::<TrainingMode>().is_err());
    }
}
