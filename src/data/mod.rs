/// Data loading and fold scheduling
pub mod fold;
pub mod npy;

pub use fold::{Batch, Fold, FoldScheduler, EVAL_FOLD, NUM_FOLDS};
pub use npy::{load_quadrants, ClassificationDataset, DatasetMetadata};
