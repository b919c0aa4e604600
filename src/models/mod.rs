/// Model boundary for sequence classification
///
/// The training core only sees the `SequenceClassifier` trait; the concrete
/// architecture behind it is a collaborator. `PooledClassifier` is the
/// built-in default.
use candle_core::Tensor;

pub mod classifier;
pub mod loader;

pub use classifier::PooledClassifier;

/// Output of a classifier forward pass
pub struct ClassifierOutput {
    /// Class scores [B, C]
    pub logits: Tensor,
    /// Present only when labels were supplied. Rank-0 scalar on a single
    /// device, rank-1 per-replica vector under a replicated backend.
    pub loss: Option<Tensor>,
}

/// A classifier over fixed-length token sequences
pub trait SequenceClassifier {
    /// Forward pass
    ///
    /// # Arguments
    /// * `input_ids` - Token ids [B, T]
    /// * `attention_mask` - 1 for real tokens, 0 for padding [B, T]
    /// * `labels` - Optional class labels [B]; when given, the output
    ///   carries a loss
    /// * `train` - Whether dropout is active
    fn forward(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        labels: Option<&Tensor>,
        train: bool,
    ) -> crate::Result<ClassifierOutput>;
}
