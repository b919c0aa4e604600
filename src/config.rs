/// Run and model configuration
///
/// A `RunConfig` is built once from the command line and passed by value to
/// every component; there is no ambient global state.
use std::path::PathBuf;

use crate::training::checkpoint::DEFAULT_CHECKPOINT_PATH;

/// Configuration for a single fine-tuning run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    /// GPU ids to use; the first listed id hosts the step when CUDA is available
    pub gpu_ids: Vec<usize>,

    /// Batch size for the three training folds
    pub train_batch_size: usize,

    /// Batch size for the evaluation fold
    pub eval_batch_size: usize,

    /// Attention dropout probability
    pub a_dropout_prob: f32,

    /// Hidden-layer dropout probability
    pub h_dropout_prob: f32,

    /// Summary (pooled representation) dropout probability
    pub s_dropout_prob: f32,

    /// Fraction of total steps spent in linear LR warmup
    pub warmup_prop: f64,

    /// Peak learning rate
    pub learning_rate: f64,

    /// Number of training epochs
    pub num_train_epochs: usize,

    /// Random seed for device RNG
    pub seed: u64,

    /// Directory holding the four fold .npy files
    pub data_dir: PathBuf,

    /// Optional pretrained safetensors weights to fine-tune from
    pub pretrained: Option<PathBuf>,

    /// Destination of the best-model checkpoint
    pub checkpoint_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gpu_ids: vec![0],
            train_batch_size: 64,
            eval_batch_size: 64,
            a_dropout_prob: 0.1,
            h_dropout_prob: 0.1,
            s_dropout_prob: 0.1,
            warmup_prop: 0.1,
            learning_rate: 2e-5,
            num_train_epochs: 8,
            seed: 42,
            data_dir: PathBuf::from("data"),
            pretrained: None,
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_PATH),
        }
    }
}

impl RunConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.train_batch_size == 0 || self.eval_batch_size == 0 {
            return Err(crate::QuadTuneError::Config(
                "batch sizes must be > 0".to_string(),
            ));
        }

        for (name, p) in [
            ("a_dropout_prob", self.a_dropout_prob),
            ("h_dropout_prob", self.h_dropout_prob),
            ("s_dropout_prob", self.s_dropout_prob),
        ] {
            if !(0.0..1.0).contains(&p) {
                return Err(crate::QuadTuneError::Config(format!(
                    "{} must be in [0, 1), got {}",
                    name, p
                )));
            }
        }

        if !(0.0..1.0).contains(&self.warmup_prop) {
            return Err(crate::QuadTuneError::Config(format!(
                "warmup_prop must be in [0, 1), got {}",
                self.warmup_prop
            )));
        }

        if self.learning_rate <= 0.0 {
            return Err(crate::QuadTuneError::Config(
                "learning_rate must be > 0".to_string(),
            ));
        }

        if self.num_train_epochs == 0 {
            return Err(crate::QuadTuneError::Config(
                "num_train_epochs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for the built-in pooled classifier
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassifierConfig {
    /// Vocabulary size (for token embeddings)
    pub vocab_size: usize,

    /// Embedding/hidden dimension
    pub hidden_size: usize,

    /// Number of attention heads
    pub num_heads: usize,

    /// Number of output classes
    pub num_classes: usize,

    /// Maximum supported sequence length (learned positions)
    pub max_position_embeddings: usize,

    /// Attention dropout probability
    pub a_dropout_prob: f32,

    /// Hidden-layer dropout probability
    pub h_dropout_prob: f32,

    /// Summary dropout probability, applied to the pooled representation
    pub s_dropout_prob: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            vocab_size: 21128, // bert-base-chinese vocabulary as default
            hidden_size: 256,
            num_heads: 8,
            num_classes: 2,
            max_position_embeddings: 512,
            a_dropout_prob: 0.1,
            h_dropout_prob: 0.1,
            s_dropout_prob: 0.1,
        }
    }
}

impl ClassifierConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.vocab_size == 0 {
            return Err(crate::QuadTuneError::Config(
                "vocab_size must be > 0".to_string(),
            ));
        }

        if self.hidden_size == 0 {
            return Err(crate::QuadTuneError::Config(
                "hidden_size must be > 0".to_string(),
            ));
        }

        if self.num_heads == 0 || self.hidden_size % self.num_heads != 0 {
            return Err(crate::QuadTuneError::Config(
                "hidden_size must be divisible by num_heads".to_string(),
            ));
        }

        if self.num_classes < 2 {
            return Err(crate::QuadTuneError::Config(
                "num_classes must be >= 2".to_string(),
            ));
        }

        if self.max_position_embeddings == 0 {
            return Err(crate::QuadTuneError::Config(
                "max_position_embeddings must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get head dimension
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_heads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.train_batch_size, 64);
        assert_eq!(config.num_train_epochs, 8);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_run_config_rejects_zero_batch() {
        let config = RunConfig {
            train_batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_config_rejects_bad_dropout() {
        let config = RunConfig {
            h_dropout_prob: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_config_rejects_bad_warmup() {
        let config = RunConfig {
            warmup_prop: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_classifier_config_head_divisibility() {
        let config = ClassifierConfig {
            hidden_size: 250,
            num_heads: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClassifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.head_dim(), 32);
    }
}
