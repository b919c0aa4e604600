//! quadtune - fold-scheduled fine-tuning for sequence classification
//!
//! Fine-tunes a sequence classifier on a labeled text dataset split into
//! four quadrant folds: folds 0..=2 train in sequence, fold 3 is held out
//! for evaluation. After every epoch the evaluation fold is scored and the
//! best-performing parameter state is checkpointed to a single fixed path.
//!
//! # Example
//!
//! ```ignore
//! use quadtune::data::{load_quadrants, FoldScheduler};
//! use quadtune::training::Trainer;
//!
//! let (datasets, metadata) = load_quadrants("data")?;
//! let folds = FoldScheduler::build_folds(&datasets, 64, 64, &Device::Cpu)?;
//! let results = trainer.run(&folds)?;
//! ```

pub mod config;
pub mod data;
pub mod models;
pub mod training;
pub mod utils;

// Re-export commonly used items
pub use config::{ClassifierConfig, RunConfig};
pub use models::{ClassifierOutput, SequenceClassifier};
pub use training::Trainer;

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum QuadTuneError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QuadTuneError>;
