/// quadtune entry point: fine-tune a sequence classifier on quadrant folds
use std::path::PathBuf;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use clap::Parser;

use quadtune::config::{ClassifierConfig, RunConfig};
use quadtune::data::{load_quadrants, Fold, FoldScheduler, EVAL_FOLD};
use quadtune::models::{loader, PooledClassifier};
use quadtune::training::{Trainer, DEFAULT_CHECKPOINT_PATH};
use quadtune::utils;

#[derive(Parser, Debug)]
#[command(name = "quadtune")]
#[command(about = "Fine-tune a sequence classifier on quadrant folds")]
struct Cli {
    /// Comma-separated GPU ids; the first listed device hosts the step
    #[arg(long, default_value = "0")]
    gpu_ids: String,

    #[arg(long, default_value_t = 64)]
    train_batch_size: usize,

    #[arg(long, default_value_t = 64)]
    eval_batch_size: usize,

    /// Attention dropout probability
    #[arg(long, default_value_t = 0.1)]
    a_dropout_prob: f32,

    /// Hidden-layer dropout probability
    #[arg(long, default_value_t = 0.1)]
    h_dropout_prob: f32,

    /// Summary (pooled representation) dropout probability
    #[arg(long, default_value_t = 0.1)]
    s_dropout_prob: f32,

    /// Fraction of total steps used for LR warmup
    #[arg(long, default_value_t = 0.1)]
    warmup_prop: f64,

    #[arg(long, default_value_t = 2e-5)]
    learning_rate: f64,

    #[arg(long, default_value_t = 8)]
    num_train_epochs: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory holding the four fold .npy files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Optional pretrained safetensors weights to fine-tune from
    #[arg(long)]
    pretrained: Option<PathBuf>,

    /// Destination of the best-model checkpoint
    #[arg(long, default_value = DEFAULT_CHECKPOINT_PATH)]
    checkpoint_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = RunConfig {
        gpu_ids: utils::parse_gpu_ids(&cli.gpu_ids)?,
        train_batch_size: cli.train_batch_size,
        eval_batch_size: cli.eval_batch_size,
        a_dropout_prob: cli.a_dropout_prob,
        h_dropout_prob: cli.h_dropout_prob,
        s_dropout_prob: cli.s_dropout_prob,
        warmup_prop: cli.warmup_prop,
        learning_rate: cli.learning_rate,
        num_train_epochs: cli.num_train_epochs,
        seed: cli.seed,
        data_dir: cli.data_dir,
        pretrained: cli.pretrained,
        checkpoint_path: cli.checkpoint_path,
    };
    config.validate()?;

    let (device, device_count) = utils::select_device(&config.gpu_ids)?;
    log::info!("device {:?} n_replicas {}", device, device_count);
    utils::seed_device(&device, config.seed);

    let (datasets, metadata) = load_quadrants(&config.data_dir)?;
    let model_config = ClassifierConfig {
        vocab_size: metadata.vocab_size,
        num_classes: metadata.num_classes,
        a_dropout_prob: config.a_dropout_prob,
        h_dropout_prob: config.h_dropout_prob,
        s_dropout_prob: config.s_dropout_prob,
        ..Default::default()
    };
    model_config.validate()?;

    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = PooledClassifier::new(&model_config, vb)?;
    if let Some(path) = &config.pretrained {
        loader::load_pretrained(&mut varmap, path)?;
    }
    log::info!("model parameters: {}", utils::count_parameters(&varmap));

    // Batches are assembled on the host; the step executor moves each one
    // to the compute device.
    let folds = FoldScheduler::build_folds(
        &datasets,
        config.train_batch_size,
        config.eval_batch_size,
        &Device::Cpu,
    )?;
    let steps_per_epoch: usize = folds[..EVAL_FOLD].iter().map(Fold::num_batches).sum();

    let mut trainer = Trainer::new(
        model,
        varmap,
        &config,
        steps_per_epoch,
        device,
        device_count,
    )?;
    trainer.run(&folds)?;

    log::info!("best eval accuracy: {:.4}", trainer.best_accuracy());
    Ok(())
}
