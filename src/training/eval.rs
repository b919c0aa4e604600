/// Evaluation pass over the held-out fold
///
/// Runs strictly in inference mode: dropout off, no backward pass, logits
/// and loss detached from the graph. Metric accumulators are divided by the
/// number of batches, a per-batch macro-average, not by the number of
/// examples.
use candle_core::Device;
use serde::Serialize;

use crate::data::Fold;
use crate::models::SequenceClassifier;
use super::metrics;

/// Aggregated evaluation metrics over one fold
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EvalMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Runs the model over an evaluation fold
pub struct EvaluationRunner {
    device: Device,
}

impl EvaluationRunner {
    /// Create a runner that evaluates on the given device
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// Evaluate the model over every batch of the fold
    pub fn evaluate<M: SequenceClassifier>(
        &self,
        fold: &Fold,
        model: &M,
    ) -> crate::Result<EvalMetrics> {
        if fold.is_empty() {
            return Err(crate::QuadTuneError::Data(
                "evaluation fold has no batches".to_string(),
            ));
        }

        let mut loss_sum = 0f64;
        let mut accuracy_sum = 0f64;
        let mut precision_sum = 0f64;
        let mut recall_sum = 0f64;

        for batch in fold.batches() {
            let batch = batch.to_device(&self.device)?;
            let output = model.forward(
                &batch.input_ids,
                &batch.attention_mask,
                Some(&batch.labels),
                false,
            )?;

            let loss = output
                .loss
                .ok_or_else(|| {
                    crate::QuadTuneError::Training(
                        "model returned no loss for a labeled batch".to_string(),
                    )
                })?
                .detach();
            let loss_value = if loss.rank() > 0 {
                loss.mean_all()?.to_scalar::<f32>()?
            } else {
                loss.to_scalar::<f32>()?
            };

            let scores = output.logits.detach().to_vec2::<f32>()?;
            let labels = batch.labels.to_vec1::<u32>()?;
            let batch_metrics = metrics::compute(&scores, &labels);

            loss_sum += loss_value as f64;
            accuracy_sum += batch_metrics.accuracy;
            precision_sum += batch_metrics.precision;
            recall_sum += batch_metrics.recall;
        }

        // Macro-average: divide by batch count, not example count
        let n = fold.num_batches() as f64;
        Ok(EvalMetrics {
            loss: loss_sum / n,
            accuracy: accuracy_sum / n,
            precision: precision_sum / n,
            recall: recall_sum / n,
        })
    }
}
