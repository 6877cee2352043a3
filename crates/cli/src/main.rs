use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use gan_common::{GanConfig, MnistSplits};
use gan_report::{LogDisplay, PngGridWriter, PngLossPlotter};
use gan_train::{EpochDriver, RunContext, Trainer, TrainingConfig};

#[derive(Parser, Debug)]
#[command(name = "mnist-gan", about = "Train a fully-connected GAN on MNIST")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train generator and discriminator, writing samples and loss charts.
    Train(TrainArgs),
    /// Write the default model config as JSON.
    InitConfig(InitConfigArgs),
}

// ── Train ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct TrainArgs {
    /// Directory with the four uncompressed MNIST IDX files.
    #[arg(long, conflicts_with = "download")]
    data_dir: Option<PathBuf>,
    /// Fetch MNIST from the Hugging Face hub instead of reading --data-dir.
    #[arg(long)]
    download: bool,
    /// Model config JSON. Created with defaults if the file does not exist.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
    #[arg(long, default_value_t = 100)]
    batch_size: usize,
    /// Overrides `latent_dim` from the config file.
    #[arg(long)]
    latent_dim: Option<usize>,
    /// Overrides `hidden_dim` from the config file.
    #[arg(long)]
    hidden_dim: Option<usize>,
    #[arg(long, default_value_t = 5e-4)]
    generator_lr: f64,
    #[arg(long, default_value_t = 1e-3)]
    discriminator_lr: f64,
    #[arg(long, default_value_t = 50)]
    epochs: usize,
    /// Generator updates per discriminator update.
    #[arg(long, default_value_t = 2)]
    generator_steps: usize,
    #[arg(long, default_value_t = 64)]
    sample_count: usize,
    /// Progress log period in batches (0 = off).
    #[arg(long, default_value_t = 100)]
    log_every: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Run on CPU even if CUDA is available.
    #[arg(long)]
    cpu: bool,
    #[arg(long)]
    no_shuffle: bool,
    #[arg(long)]
    no_progress: bool,
}

#[derive(Parser, Debug)]
struct InitConfigArgs {
    #[arg(long, default_value = "gan_config.json")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => cmd_train(args),
        Command::InitConfig(args) => cmd_init_config(args),
    }
}

// ── Command implementations ────────────────────────────────────────────────────

fn cmd_train(args: TrainArgs) -> Result<()> {
    let mut model_config = match &args.config {
        Some(path) if path.exists() => GanConfig::load(path)?,
        Some(path) => {
            let default = GanConfig::default();
            default.save(path)?;
            tracing::info!(path = %path.display(), "Created default config");
            default
        }
        None => GanConfig::default(),
    };
    if let Some(latent_dim) = args.latent_dim {
        model_config.latent_dim = latent_dim;
    }
    if let Some(hidden_dim) = args.hidden_dim {
        model_config.hidden_dim = hidden_dim;
    }
    model_config.validate()?;

    let training_config = TrainingConfig {
        batch_size: args.batch_size,
        epochs: args.epochs,
        generator_lr: args.generator_lr,
        discriminator_lr: args.discriminator_lr,
        generator_steps: args.generator_steps,
        sample_count: args.sample_count,
        log_every: args.log_every,
        shuffle: !args.no_shuffle,
        show_progress: !args.no_progress,
    };
    training_config.validate()?;

    let ctx = RunContext::new(&args.output_dir, args.seed, args.cpu)?;
    model_config.save(&ctx.config_path())?;

    let mnist = match (&args.data_dir, args.download) {
        (Some(dir), _) => MnistSplits::load_dir(dir, &ctx.device)?,
        (None, true) => MnistSplits::download(&ctx.device)?,
        (None, false) => bail!("either --data-dir <DIR> or --download is required"),
    };

    let mut trainer = Trainer::new(model_config, training_config, &ctx)?;
    let mut driver = EpochDriver::new(&ctx, PngGridWriter::default(), PngLossPlotter::default())
        .with_observer(LogDisplay);
    let history = driver.run(&mut trainer, &mnist.train, &mnist.test)?;

    if let (Some(g), Some(d)) = (history.test_generator.last(), history.test_discriminator.last()) {
        tracing::info!(
            epochs = history.num_epochs(),
            test_gen = format!("{g:.4}"),
            test_disc = format!("{d:.4}"),
            "Final test losses"
        );
    }
    Ok(())
}

fn cmd_init_config(args: InitConfigArgs) -> Result<()> {
    let config = GanConfig::default();
    config.save(&args.output)?;
    tracing::info!(path = %args.output.display(), "Wrote default config");
    Ok(())
}
