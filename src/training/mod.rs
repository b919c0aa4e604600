/// Training infrastructure: metrics, LR schedule, step execution,
/// evaluation, checkpointing and epoch orchestration
pub mod checkpoint;
pub mod eval;
pub mod metrics;
pub mod scheduler;
pub mod step;
pub mod trainer;

pub use checkpoint::{CheckpointStore, DEFAULT_CHECKPOINT_PATH};
pub use eval::{EvalMetrics, EvaluationRunner};
pub use metrics::BatchMetrics;
pub use scheduler::{LinearScheduler, LinearSchedulerConfig};
pub use step::{clip_grad_norm, StepExecutor, GRAD_CLIP_NORM};
pub use trainer::{EpochResult, Trainer};
