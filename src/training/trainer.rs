/// Epoch orchestration: train the three folds, evaluate the fourth, keep
/// the best checkpoint
use candle_core::Device;
use candle_nn::VarMap;
use serde::Serialize;

use crate::config::RunConfig;
use crate::data::{Fold, NUM_FOLDS};
use crate::models::SequenceClassifier;
use super::checkpoint::CheckpointStore;
use super::eval::EvaluationRunner;
use super::scheduler::LinearScheduler;
use super::step::StepExecutor;

/// Metrics produced by one epoch
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EpochResult {
    pub eval_loss: f64,
    pub eval_accuracy: f64,
    pub eval_precision: f64,
    pub eval_recall: f64,
    pub train_loss: f64,
}

impl EpochResult {
    /// Log all fields, key-sorted
    fn log(&self) {
        log::info!("***** Eval results *****");
        log::info!("  eval_accuracy = {}", self.eval_accuracy);
        log::info!("  eval_loss = {}", self.eval_loss);
        log::info!("  eval_precision = {}", self.eval_precision);
        log::info!("  eval_recall = {}", self.eval_recall);
        log::info!("  train_loss = {}", self.train_loss);
    }
}

/// Drives the epoch loop: Training, Evaluating, CheckpointDecision
pub struct Trainer<M: SequenceClassifier> {
    model: M,
    varmap: VarMap,
    executor: StepExecutor,
    evaluator: EvaluationRunner,
    checkpoint: CheckpointStore,
    num_epochs: usize,
    best_accuracy: f64,
}

impl<M: SequenceClassifier> Trainer<M> {
    /// Create a trainer for the model whose parameters live in `varmap`
    ///
    /// `steps_per_epoch` is the summed batch count of the three training
    /// folds; the LR schedule spans `steps_per_epoch * num_train_epochs`.
    pub fn new(
        model: M,
        varmap: VarMap,
        config: &RunConfig,
        steps_per_epoch: usize,
        device: Device,
        device_count: usize,
    ) -> crate::Result<Self> {
        let total_steps = steps_per_epoch * config.num_train_epochs;
        let scheduler = LinearScheduler::with_warmup_proportion(
            config.learning_rate,
            config.warmup_prop,
            total_steps,
        );
        let executor = StepExecutor::new(
            varmap.all_vars(),
            scheduler,
            config.learning_rate,
            device.clone(),
            device_count,
        )?;

        Ok(Self {
            model,
            varmap,
            executor,
            evaluator: EvaluationRunner::new(device),
            checkpoint: CheckpointStore::new(config.checkpoint_path.clone()),
            num_epochs: config.num_train_epochs,
            best_accuracy: 0.0,
        })
    }

    /// Run the full training loop over the four folds
    ///
    /// Folds 0..=2 train in order within each epoch; fold 3 is evaluated at
    /// every epoch end. Returns one `EpochResult` per epoch.
    pub fn run(&mut self, folds: &[Fold]) -> crate::Result<Vec<EpochResult>> {
        if folds.len() != NUM_FOLDS {
            return Err(crate::QuadTuneError::Data(format!(
                "expected {} folds, got {}",
                NUM_FOLDS,
                folds.len()
            )));
        }

        let train_folds = &folds[..NUM_FOLDS - 1];
        let eval_fold = &folds[NUM_FOLDS - 1];
        let steps_per_epoch: usize = train_folds.iter().map(Fold::num_batches).sum();

        log::info!("***** Running training *****");
        log::info!("  Num epochs = {}", self.num_epochs);
        log::info!("  Steps per epoch = {}", steps_per_epoch);

        let mut results = Vec::with_capacity(self.num_epochs);
        for epoch in 0..self.num_epochs {
            log::info!("=== Epoch {}/{} ===", epoch + 1, self.num_epochs);

            let epoch_loss = self.train_epoch(train_folds)?;
            let eval = self.evaluator.evaluate(eval_fold, &self.model)?;

            let result = EpochResult {
                eval_loss: eval.loss,
                eval_accuracy: eval.accuracy,
                eval_precision: eval.precision,
                eval_recall: eval.recall,
                train_loss: epoch_loss / steps_per_epoch as f64,
            };
            result.log();

            self.checkpoint_if_best(result.eval_accuracy)?;
            results.push(result);
        }

        Ok(results)
    }

    /// One pass over the training folds, returning the summed step loss
    fn train_epoch(&mut self, train_folds: &[Fold]) -> crate::Result<f64> {
        let mut epoch_loss = 0f64;
        for fold in train_folds {
            for batch in fold.batches() {
                let loss = self.executor.execute(batch, &self.model)?;
                epoch_loss += loss;

                let step = self.executor.steps_taken();
                if step % 100 == 0 {
                    log::info!(
                        "Step {}: loss={:.4}, lr={:.3e}",
                        step,
                        loss,
                        self.executor.learning_rate()
                    );
                }
            }
        }
        Ok(epoch_loss)
    }

    /// Persist the model if this accuracy matches or beats the best so far
    ///
    /// Non-strict comparison: a tie overwrites the previous checkpoint.
    pub fn checkpoint_if_best(&mut self, eval_accuracy: f64) -> crate::Result<bool> {
        if eval_accuracy >= self.best_accuracy {
            self.checkpoint.save(&self.varmap)?;
            self.best_accuracy = eval_accuracy;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Best evaluation accuracy observed so far
    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy
    }

    /// Total optimization steps executed
    pub fn steps_taken(&self) -> usize {
        self.executor.steps_taken()
    }

    /// The model being trained
    pub fn model(&self) -> &M {
        &self.model
    }
}
