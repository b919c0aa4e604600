/// Single optimization step execution
///
/// One step is: move the batch to the compute device, forward with labels,
/// reduce the per-replica loss, backward, clip the global gradient norm,
/// apply the optimizer at the scheduled learning rate, advance the
/// schedule. Gradients live only in the step's own `GradStore`, which is
/// dropped on return.
use candle_core::backprop::GradStore;
use candle_core::{Device, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};

use crate::data::Batch;
use crate::models::SequenceClassifier;
use super::scheduler::LinearScheduler;

/// Fixed ceiling for the global gradient norm
pub const GRAD_CLIP_NORM: f64 = 1.0;

/// Executes optimization steps against a model's trainable variables
pub struct StepExecutor {
    optimizer: AdamW,
    scheduler: LinearScheduler,
    vars: Vec<Var>,
    device: Device,
    device_count: usize,
}

impl StepExecutor {
    /// Create a new executor over the given trainable variables
    pub fn new(
        vars: Vec<Var>,
        scheduler: LinearScheduler,
        learning_rate: f64,
        device: Device,
        device_count: usize,
    ) -> crate::Result<Self> {
        let params = ParamsAdamW {
            lr: learning_rate,
            ..Default::default()
        };
        let optimizer = AdamW::new(vars.clone(), params)?;

        Ok(Self {
            optimizer,
            scheduler,
            vars,
            device,
            device_count,
        })
    }

    /// Execute one optimization step over a batch, returning the scalar loss
    ///
    /// A NaN loss is returned as-is; nothing downstream of the forward pass
    /// is retried or recovered.
    pub fn execute<M: SequenceClassifier>(
        &mut self,
        batch: &Batch,
        model: &M,
    ) -> crate::Result<f64> {
        let batch = batch.to_device(&self.device)?;
        let output = model.forward(
            &batch.input_ids,
            &batch.attention_mask,
            Some(&batch.labels),
            true,
        )?;

        let loss = output.loss.ok_or_else(|| {
            crate::QuadTuneError::Training("model returned no loss for a labeled batch".to_string())
        })?;

        // A replicated backend hands back one loss per replica; the plain
        // mean assumes balanced shards.
        let loss = if self.device_count > 1 {
            loss.mean_all()?
        } else {
            loss
        };
        let loss_value = loss.to_scalar::<f32>()? as f64;

        let mut grads = loss.backward()?;
        clip_grad_norm(&self.vars, &mut grads, GRAD_CLIP_NORM)?;

        self.optimizer.set_learning_rate(self.scheduler.get_lr());
        self.optimizer.step(&grads)?;
        self.scheduler.step();

        Ok(loss_value)
    }

    /// Number of steps executed so far
    pub fn steps_taken(&self) -> usize {
        self.scheduler.get_step()
    }

    /// Learning rate the next step will use
    pub fn learning_rate(&self) -> f64 {
        self.scheduler.get_lr()
    }
}

/// Scale gradients so their global L2 norm does not exceed `max_norm`
///
/// Returns the pre-clip norm.
pub fn clip_grad_norm(
    vars: &[Var],
    grads: &mut GradStore,
    max_norm: f64,
) -> crate::Result<f64> {
    let mut total_sq = 0f64;
    for var in vars {
        if let Some(grad) = grads.get(var) {
            total_sq += grad.sqr()?.sum_all()?.to_scalar::<f32>()? as f64;
        }
    }

    let total_norm = total_sq.sqrt();
    if total_norm > max_norm {
        let scale = max_norm / total_norm;
        for var in vars {
            if let Some(grad) = grads.remove(var) {
                grads.insert(var, (grad * scale)?);
            }
        }
    }

    Ok(total_norm)
}
