//! tsformer CLI: masked-autoencoder pretraining, fine-tuning, ViT training and evaluation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use ndarray::Array3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tsformer_core::{Seed, SeriesShape};
use tsformer_data::{read_labels_npy, read_npy, LabelEncoder, SeriesDataset};
use tsformer_models::{CheckpointMetadata, MaeConfig};
use tsformer_train::{
    MaePipeline, MaePipelineConfig, TrainerConfig, TrainingMode, ViTPipeline, ViTPipelineConfig,
};

/// Backend type for training.
type TrainBackend = Autodiff<NdArray>;

#[derive(Parser)]
#[command(name = "tsformer")]
#[command(author, version)]
#[command(about = "Transformer classifiers and masked-autoencoder pretraining for multivariate time series")]
#[command(long_about = "tsformer: ViT and masked-autoencoder classifiers for fixed-length multivariate time series.

Inputs are .npy arrays shaped (N, V, L), or (N, L, V) with --channels-last.
Labels are 1-D or (N, 1) integer .npy arrays.

EXAMPLES:
  # Pretrain an encoder, then fine-tune it
  tsformer pretrain --x x_train.npy --checkpoint-dir runs/mae --epochs 50
  tsformer finetune --mode finetune --x x_train.npy --y y_train.npy --checkpoint-dir runs/mae

  # Linear head on the frozen encoder
  tsformer finetune --mode linear --x x_train.npy --y y_train.npy --checkpoint-dir runs/mae

  # Train a ViT directly
  tsformer vit --x x_train.npy --y y_train.npy --checkpoint-dir runs/vit --patch-len 1

  # Evaluate a saved model
  tsformer evaluate --arch mae --name finetune_model --x x_test.npy --y y_test.npy --checkpoint-dir runs/mae

  # Run everything on synthetic data
  tsformer demo")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the training subcommands.
#[derive(clap::Args, Clone)]
struct TrainArgs {
    /// Number of training epochs
    #[arg(long, default_value = "20", value_name = "N")]
    epochs: usize,

    /// Batch size
    #[arg(long, default_value = "32", value_name = "SIZE")]
    batch_size: usize,

    /// Peak learning rate for Adam
    #[arg(long, default_value = "0.001", value_name = "LR")]
    lr: f64,

    /// Fraction of samples held out for validation
    #[arg(long, default_value = "0.2", value_name = "RATIO")]
    valid_ratio: f32,

    /// Random seed for reproducibility
    #[arg(long, default_value = "42", value_name = "SEED")]
    seed: u64,

    /// Stop after this many epochs without improvement (0 disables)
    #[arg(long, default_value = "0", value_name = "N")]
    patience: usize,
}

impl TrainArgs {
    fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig::new()
            .with_lr(self.lr)
            .with_valid_ratio(self.valid_ratio)
            .with_seed(self.seed)
            .with_early_stopping(self.patience, 1e-3)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FinetuneMode {
    /// Train only the head on the frozen encoder
    Linear,
    /// Train encoder and head jointly
    Finetune,
}

impl From<FinetuneMode> for TrainingMode {
    fn from(mode: FinetuneMode) -> Self {
        match mode {
            FinetuneMode::Linear => TrainingMode::Linear,
            FinetuneMode::Finetune => TrainingMode::FineTune,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Arch {
    /// Masked-autoencoder classifier
    Mae,
    /// Vision-Transformer classifier
    Vit,
}

#[derive(Subcommand)]
enum Commands {
    /// Pretrain a masked-autoencoder encoder on unlabeled series
    Pretrain {
        /// Input series (.npy)
        #[arg(long, value_name = "FILE")]
        x: PathBuf,

        /// Input is (N, L, V) instead of (N, V, L)
        #[arg(long)]
        channels_last: bool,

        /// Directory for checkpoints
        #[arg(long, default_value = "./checkpoints", value_name = "DIR")]
        checkpoint_dir: PathBuf,

        /// Fraction of timesteps masked per sample
        #[arg(long, default_value = "0.75", value_name = "RATIO")]
        mask_ratio: f64,

        /// Number of classes for later stages
        #[arg(long, default_value = "2", value_name = "N")]
        n_classes: usize,

        #[command(flatten)]
        train: TrainArgs,
    },
    /// Train a classifier on a pretrained (or fresh) encoder
    Finetune {
        /// Linear head or full fine-tuning
        #[arg(long, value_enum, default_value = "finetune")]
        mode: FinetuneMode,

        /// Input series (.npy)
        #[arg(long, value_name = "FILE")]
        x: PathBuf,

        /// Labels (.npy)
        #[arg(long, value_name = "FILE")]
        y: PathBuf,

        /// Input is (N, L, V) instead of (N, V, L)
        #[arg(long)]
        channels_last: bool,

        /// Directory holding `pretrained_encoder` and receiving the classifier
        #[arg(long, default_value = "./checkpoints", value_name = "DIR")]
        checkpoint_dir: PathBuf,

        /// Checkpoint name (defaults to linear_model / finetune_model)
        #[arg(long, value_name = "NAME")]
        save_name: Option<String>,

        #[command(flatten)]
        train: TrainArgs,
    },
    /// Train a ViT classifier directly on labels
    Vit {
        /// Input series (.npy)
        #[arg(long, value_name = "FILE")]
        x: PathBuf,

        /// Labels (.npy)
        #[arg(long, value_name = "FILE")]
        y: PathBuf,

        /// Input is (N, L, V) instead of (N, V, L)
        #[arg(long)]
        channels_last: bool,

        /// Directory for checkpoints
        #[arg(long, default_value = "./checkpoints", value_name = "DIR")]
        checkpoint_dir: PathBuf,

        /// Timesteps per patch
        #[arg(long, default_value = "1", value_name = "N")]
        patch_len: usize,

        /// Checkpoint name (defaults to vit_model)
        #[arg(long, value_name = "NAME")]
        save_name: Option<String>,

        #[command(flatten)]
        train: TrainArgs,
    },
    /// Evaluate a saved classifier
    Evaluate {
        /// Architecture of the checkpoint
        #[arg(long, value_enum)]
        arch: Arch,

        /// Checkpoint name
        #[arg(long, value_name = "NAME")]
        name: String,

        /// Input series (.npy)
        #[arg(long, value_name = "FILE")]
        x: PathBuf,

        /// Labels (.npy)
        #[arg(long, value_name = "FILE")]
        y: PathBuf,

        /// Input is (N, L, V) instead of (N, V, L)
        #[arg(long)]
        channels_last: bool,

        /// Directory holding the checkpoint
        #[arg(long, default_value = "./checkpoints", value_name = "DIR")]
        checkpoint_dir: PathBuf,

        /// Directory for evaluation artifacts
        #[arg(long, value_name = "DIR")]
        artifacts: Option<PathBuf>,
    },
    /// Run the full MAE lifecycle and a ViT on synthetic data
    Demo {
        /// Directory for checkpoints and artifacts
        #[arg(long, default_value = "./tsformer_demo", value_name = "DIR")]
        output: PathBuf,

        /// Epochs per stage
        #[arg(long, default_value = "10", value_name = "N")]
        epochs: usize,

        /// Random seed
        #[arg(long, default_value = "42", value_name = "SEED")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Pretrain {
            x,
            channels_last,
            checkpoint_dir,
            mask_ratio,
            n_classes,
            train,
        } => handle_pretrain(&x, channels_last, &checkpoint_dir, mask_ratio, n_classes, &train),
        Commands::Finetune {
            mode,
            x,
            y,
            channels_last,
            checkpoint_dir,
            save_name,
            train,
        } => handle_finetune(
            mode.into(),
            &x,
            &y,
            channels_last,
            &checkpoint_dir,
            save_name.as_deref(),
            &train,
        ),
        Commands::Vit {
            x,
            y,
            channels_last,
            checkpoint_dir,
            patch_len,
            save_name,
            train,
        } => handle_vit(&x, &y, channels_last, &checkpoint_dir, patch_len, save_name.as_deref(), &train),
        Commands::Evaluate {
            arch,
            name,
            x,
            y,
            channels_last,
            checkpoint_dir,
            artifacts,
        } => handle_evaluate(arch, &name, &x, &y, channels_last, &checkpoint_dir, artifacts),
        Commands::Demo { output, epochs, seed } => handle_demo(&output, epochs, seed),
    }
}

/// Load series as `(N, V, L)`.
fn load_series(path: &Path, channels_last: bool) -> Result<Array3<f32>> {
    let x = read_npy(path).with_context(|| format!("Failed to read series from {}", path.display()))?;
    if channels_last {
        return Ok(SeriesDataset::from_channels_last(x, None)?.x().clone());
    }
    Ok(x)
}

fn load_labels(path: &Path, n_samples: usize) -> Result<Vec<i64>> {
    let y = read_labels_npy(path)
        .with_context(|| format!("Failed to read labels from {}", path.display()))?;
    if y.len() != n_samples {
        bail!("{} labels for {} samples", y.len(), n_samples);
    }
    Ok(y)
}

fn series_shape(x: &Array3<f32>) -> SeriesShape {
    let (_, n_vars, seq_len) = x.dim();
    SeriesShape::new(n_vars, seq_len)
}

fn print_header(title: &str, x: &Array3<f32>, checkpoint_dir: &Path) {
    let (n, v, l) = x.dim();
    println!("=== tsformer {} ===\n", title);
    println!("  Samples:        {}", n);
    println!("  Variables:      {}", v);
    println!("  Sequence length: {}", l);
    println!("  Checkpoints:    {}", checkpoint_dir.display());
    println!();
}

fn handle_pretrain(
    x: &Path,
    channels_last: bool,
    checkpoint_dir: &Path,
    mask_ratio: f64,
    n_classes: usize,
    args: &TrainArgs,
) -> Result<()> {
    let x = load_series(x, channels_last)?;
    print_header("pretraining", &x, checkpoint_dir);

    let config = MaePipelineConfig::new(series_shape(&x), n_classes, checkpoint_dir)
        .with_mask_ratio(mask_ratio)
        .with_trainer(args.trainer_config());
    let mut pipeline = MaePipeline::<TrainBackend>::new(config, NdArrayDevice::Cpu)
        .context("Invalid model configuration")?;

    let history = pipeline.pretrain(&x, args.epochs, args.batch_size)?;
    println!(
        "Pretraining finished: {} epochs, best epoch {}, final loss {:.6}",
        history.epochs_run(),
        history.best_epoch + 1,
        history.train_losses.last().copied().unwrap_or(f32::NAN)
    );
    Ok(())
}

fn handle_finetune(
    mode: TrainingMode,
    x: &Path,
    y: &Path,
    channels_last: bool,
    checkpoint_dir: &Path,
    save_name: Option<&str>,
    args: &TrainArgs,
) -> Result<()> {
    let x = load_series(x, channels_last)?;
    let y = load_labels(y, x.dim().0)?;
    print_header(&format!("{} training", mode), &x, checkpoint_dir);

    let n_classes = LabelEncoder::new().fit(&y).n_classes();
    let pretrained = TrainingMode::Pretrain.checkpoint_name();
    let model = match CheckpointMetadata::load(checkpoint_dir, pretrained) {
        Ok(meta) => meta
            .config::<MaeConfig>()
            .context("Unreadable pretrained encoder metadata")?
            .with_n_classes(n_classes),
        Err(_) if mode == TrainingMode::Linear => {
            bail!(
                "Linear probing needs a pretrained encoder; run `tsformer pretrain --checkpoint-dir {}` first",
                checkpoint_dir.display()
            );
        }
        Err(_) => {
            let shape = series_shape(&x);
            MaeConfig::new(shape.n_vars(), shape.seq_len(), n_classes)
        }
    };

    let config = MaePipelineConfig::new(model.shape(), n_classes, checkpoint_dir)
        .with_model(model)
        .with_trainer(args.trainer_config());
    let mut pipeline = MaePipeline::<TrainBackend>::new(config, NdArrayDevice::Cpu)
        .context("Invalid model configuration")?;

    let output = pipeline.train(mode, &x, Some(&y), args.epochs, args.batch_size, save_name)?;
    let history = output.history();
    println!(
        "Training finished: best valid_acc {:.2}% at epoch {}",
        history.best_valid_acc.unwrap_or(0.0) * 100.0,
        history.best_epoch + 1
    );
    Ok(())
}

fn handle_vit(
    x: &Path,
    y: &Path,
    channels_last: bool,
    checkpoint_dir: &Path,
    patch_len: usize,
    save_name: Option<&str>,
    args: &TrainArgs,
) -> Result<()> {
    let x = load_series(x, channels_last)?;
    let y = load_labels(y, x.dim().0)?;
    print_header("ViT training", &x, checkpoint_dir);

    let n_classes = LabelEncoder::new().fit(&y).n_classes();
    let config = ViTPipelineConfig::new(series_shape(&x), n_classes, checkpoint_dir)
        .with_patch_len(patch_len)
        .with_trainer(args.trainer_config());
    let mut pipeline = ViTPipeline::<TrainBackend>::new(config, NdArrayDevice::Cpu)
        .context("Invalid model configuration")?;

    let history = pipeline.train(&x, &y, args.epochs, args.batch_size, save_name)?;
    println!(
        "Training finished: best valid_acc {:.2}% at epoch {}",
        history.best_valid_acc.unwrap_or(0.0) * 100.0,
        history.best_epoch + 1
    );
    Ok(())
}

fn handle_evaluate(
    arch: Arch,
    name: &str,
    x: &Path,
    y: &Path,
    channels_last: bool,
    checkpoint_dir: &Path,
    artifacts: Option<PathBuf>,
) -> Result<()> {
    let x = load_series(x, channels_last)?;
    let y = load_labels(y, x.dim().0)?;
    print_header(&format!("evaluation of '{}'", name), &x, checkpoint_dir);

    let report = match arch {
        Arch::Mae => {
            let mut pipeline =
                MaePipeline::<TrainBackend>::from_checkpoint(checkpoint_dir, name, NdArrayDevice::Cpu)
                    .with_context(|| format!("Failed to load checkpoint '{}'", name))?;
            if let Some(dir) = artifacts {
                pipeline.set_artifacts_dir(dir);
            }
            pipeline.evaluate(&x, &y, name)?
        }
        Arch::Vit => {
            let mut pipeline =
                ViTPipeline::<TrainBackend>::from_checkpoint(checkpoint_dir, name, NdArrayDevice::Cpu)
                    .with_context(|| format!("Failed to load checkpoint '{}'", name))?;
            if let Some(dir) = artifacts {
                pipeline.set_artifacts_dir(dir);
            }
            pipeline.evaluate(&x, &y, name)?
        }
    };

    println!("\nloss={:.4} accuracy={:.2}%", report.loss, report.accuracy * 100.0);
    Ok(())
}

/// Noisy sinusoids whose frequency and per-variable offset depend on the class.
fn synthetic_dataset(
    n: usize,
    n_vars: usize,
    seq_len: usize,
    n_classes: usize,
    seed: Seed,
) -> (Array3<f32>, Vec<i64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
    let y: Vec<i64> = (0..n).map(|i| (i % n_classes) as i64).collect();
    let x = Array3::from_shape_fn((n, n_vars, seq_len), |(i, v, t)| {
        let class = y[i] as f32;
        let freq = 0.2 + 0.3 * class;
        let offset = class * 0.5 * if v % 2 == 0 { 1.0 } else { -1.0 };
        (freq * t as f32 + v as f32).sin() + offset + rng.gen_range(-0.2..0.2)
    });
    (x, y)
}

fn handle_demo(output: &Path, epochs: usize, seed: u64) -> Result<()> {
    const N_VARS: usize = 4;
    const SEQ_LEN: usize = 23;
    const N_CLASSES: usize = 3;

    println!("=== tsformer demo ===\n");
    let seed = Seed::new(seed);
    let (x_train, y_train) = synthetic_dataset(240, N_VARS, SEQ_LEN, N_CLASSES, seed.derive("train"));
    let (x_test, y_test) = synthetic_dataset(90, N_VARS, SEQ_LEN, N_CLASSES, seed.derive("test"));
    println!(
        "Synthetic data: {} train / {} test samples of ({}, {}), {} classes\n",
        x_train.dim().0,
        x_test.dim().0,
        SEQ_LEN,
        N_VARS,
        N_CLASSES
    );

    let trainer = TrainerConfig::new().with_seed(seed);
    let shape = SeriesShape::new(N_VARS, SEQ_LEN);
    let mae_dir = output.join("mae");

    println!("--- MAE: pretrain -> linear head ---");
    let config = MaePipelineConfig::new(shape, N_CLASSES, &mae_dir).with_trainer(trainer.clone());
    let mut frozen = MaePipeline::<TrainBackend>::new(config.clone(), NdArrayDevice::Cpu)?;
    frozen.pretrain(&x_train, epochs, 32)?;
    frozen.train(TrainingMode::Linear, &x_train, Some(&y_train), epochs, 32, None)?;
    let linear = frozen.evaluate(&x_test, &y_test, "mae_linear")?;

    println!("\n--- MAE: pretrained encoder -> fine-tune ---");
    let mut finetune = MaePipeline::<TrainBackend>::new(config, NdArrayDevice::Cpu)?;
    finetune.train(TrainingMode::FineTune, &x_train, Some(&y_train), epochs, 32, None)?;
    let finetuned = finetune.evaluate(&x_test, &y_test, "mae_finetune")?;

    println!("\n--- ViT ---");
    let config = ViTPipelineConfig::new(shape, N_CLASSES, output.join("vit")).with_trainer(trainer);
    let mut vit = ViTPipeline::<TrainBackend>::new(config, NdArrayDevice::Cpu)?;
    vit.train(&x_train, &y_train, epochs, 32, None)?;
    let vit_report = vit.evaluate(&x_test, &y_test, "vit")?;

    println!("\n=== Summary ===");
    println!("{:<15} {:>10} {:>10}", "model", "loss", "accuracy");
    for (name, report) in [("mae_linear", &linear), ("mae_finetune", &finetuned), ("vit", &vit_report)] {
        println!("{:<15} {:>10.4} {:>9.2}%", name, report.loss, report.accuracy * 100.0);
    }
    println!("\nCheckpoints and artifacts under {}", output.display());
    Ok(())
}
