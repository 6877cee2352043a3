//! Trainer: owns both networks, both optimisers and the latent sampler.
//!
//! One call to [`Trainer::train_batch`] runs the alternating update:
//!
//! 1. discriminator step on `real` (label 1) and a detached `G(z)` (label 0);
//! 2. `generator_steps` generator steps on `D(G(z))` against label 1, with
//!    the same `z` for every sub-step.
//!
//! The two optimisers are built over disjoint [`VarMap`]s, so a step of one
//! can never move the other network's parameters.

use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use indicatif::{ProgressBar, ProgressStyle};

use gan_common::{
    Batches, GanConfig, GanError, GanResult, ImageDataset, LatentSampler, LossPhase, Split,
};
use gan_core::{
    bce_sum, check_compatible, fake_labels, parameter_stats, real_labels, seeded_uniform_init,
    Discriminator, Generator,
};

use crate::context::RunContext;
use crate::evaluator::Evaluator;

// ── Config ──────────────────────────────────────────────────────────────────

/// All training hyper-parameters (CLI-level knobs).
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub epochs: usize,
    pub generator_lr: f64,
    pub discriminator_lr: f64,
    /// Generator updates per discriminator update.
    pub generator_steps: usize,
    /// Images generated after every epoch.
    pub sample_count: usize,
    /// Progress log period in batches. `0` disables the line.
    pub log_every: usize,
    pub shuffle: bool,
    pub show_progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            epochs: 50,
            generator_lr: 5e-4,
            discriminator_lr: 1e-3,
            generator_steps: 2,
            sample_count: 64,
            log_every: 100,
            shuffle: true,
            show_progress: true,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> GanResult<()> {
        if self.batch_size == 0 {
            return Err(GanError::invalid_config("batch_size must be > 0"));
        }
        if self.epochs == 0 {
            return Err(GanError::invalid_config("epochs must be > 0"));
        }
        if self.generator_steps == 0 {
            return Err(GanError::invalid_config("generator_steps must be > 0"));
        }
        if self.sample_count == 0 {
            return Err(GanError::invalid_config("sample_count must be > 0"));
        }
        for (name, lr) in [
            ("generator_lr", self.generator_lr),
            ("discriminator_lr", self.discriminator_lr),
        ] {
            if !(lr.is_finite() && lr > 0.0) {
                return Err(GanError::invalid_config(format!(
                    "{name} must be a positive finite number, got {lr}"
                )));
            }
        }
        Ok(())
    }
}

/// Adam with PyTorch defaults (β = (0.9, 0.999), ε = 1e-8) and no weight decay.
fn adam(lr: f64) -> ParamsAdamW {
    ParamsAdamW {
        lr,
        beta1: 0.9,
        beta2: 0.999,
        eps: 1e-8,
        weight_decay: 0.0,
    }
}

// ── Loss records ────────────────────────────────────────────────────────────

/// Summed (not averaged) losses of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLosses {
    pub discriminator: f64,
    /// One entry per generator sub-step.
    pub generator: Vec<f64>,
}

impl BatchLosses {
    pub fn generator_total(&self) -> f64 {
        self.generator.iter().sum()
    }
}

/// Per-sample averages over one pass of a split, plus the raw batch sums.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochLosses {
    pub generator: f64,
    pub discriminator: f64,
    pub batches: Vec<BatchLosses>,
}

/// Result of a discriminator update.
pub struct DiscriminatorStep {
    pub loss: f64,
    /// `G(z)` as computed before the update, still attached to the
    /// generator's graph.
    pub fake: Tensor,
}

// ── Trainer ─────────────────────────────────────────────────────────────────

/// The training engine.
pub struct Trainer {
    pub generator: Generator,
    pub discriminator: Discriminator,
    pub generator_varmap: VarMap,
    pub discriminator_varmap: VarMap,
    generator_optimizer: AdamW,
    discriminator_optimizer: AdamW,
    sampler: LatentSampler,
    pub config: TrainingConfig,
    model_config: GanConfig,
    run_seed: u64,
    pub global_step: usize,
    epoch: usize,
    batch: usize,
    device: Device,
}

impl Trainer {
    /// Build both networks with seeded initialisation, and one Adam per
    /// network.
    pub fn new(
        model_config: GanConfig,
        config: TrainingConfig,
        ctx: &RunContext,
    ) -> GanResult<Self> {
        model_config.validate()?;
        config.validate()?;
        let device = ctx.device.clone();

        let generator_varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&generator_varmap, DType::F32, &device);
        let generator = Generator::new(vb, &model_config)?;
        seeded_uniform_init(&generator_varmap, ctx.generator_seed())?;

        let discriminator_varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&discriminator_varmap, DType::F32, &device);
        let discriminator = Discriminator::new(vb, &model_config)?;
        seeded_uniform_init(&discriminator_varmap, ctx.discriminator_seed())?;

        check_compatible(&generator, &discriminator)?;

        let stats = parameter_stats(&model_config);
        tracing::info!(
            generator_params = stats.generator_params,
            discriminator_params = stats.discriminator_params,
            total_params = stats.total(),
            "Model parameter stats"
        );

        let generator_optimizer =
            AdamW::new(generator_varmap.all_vars(), adam(config.generator_lr))?;
        let discriminator_optimizer =
            AdamW::new(discriminator_varmap.all_vars(), adam(config.discriminator_lr))?;

        let sampler = LatentSampler::new(model_config.latent_dim, ctx.latent_seed());

        Ok(Self {
            generator,
            discriminator,
            generator_varmap,
            discriminator_varmap,
            generator_optimizer,
            discriminator_optimizer,
            sampler,
            config,
            model_config,
            run_seed: ctx.seed,
            global_step: 0,
            epoch: 0,
            batch: 0,
            device,
        })
    }

    pub fn model_config(&self) -> &GanConfig {
        &self.model_config
    }

    // ── Steps ───────────────────────────────────────────────────────────────

    /// One discriminator update.
    ///
    /// Loss is `BCE(D(real), 1) + BCE(D(G(z).detach()), 0)`; only the
    /// discriminator's parameters move.
    pub fn discriminator_step(
        &mut self,
        real: &Tensor,
        latent: &Tensor,
    ) -> GanResult<DiscriminatorStep> {
        let n = real.dim(0)?;
        let real_pred = self.discriminator.discriminate(real)?;
        let real_loss = bce_sum(&real_pred, &real_labels(n, &self.device)?)?;

        let fake = self.generator.generate(latent)?;
        let fake_pred = self.discriminator.discriminate(&fake.detach())?;
        let fake_loss = bce_sum(&fake_pred, &fake_labels(n, &self.device)?)?;

        let loss = (real_loss + fake_loss)?;
        let value = GanError::check_finite(
            loss.to_scalar::<f32>()? as f64,
            LossPhase::Discriminator,
            self.epoch,
            self.batch,
        )?;

        let grads = loss.backward()?;
        self.discriminator_optimizer
            .step(&grads)
            .map_err(GanError::OptimizerStep)?;
        Ok(DiscriminatorStep { loss: value, fake })
    }

    /// One generator update on an already generated `fake`.
    ///
    /// Loss is `BCE(D(fake), 1)`. Gradients reach the discriminator too but
    /// only the generator's optimiser is stepped.
    pub fn generator_step(&mut self, fake: &Tensor) -> GanResult<f64> {
        let n = fake.dim(0)?;
        let pred = self.discriminator.discriminate(fake)?;
        let loss = bce_sum(&pred, &real_labels(n, &self.device)?)?;
        let value = GanError::check_finite(
            loss.to_scalar::<f32>()? as f64,
            LossPhase::Generator,
            self.epoch,
            self.batch,
        )?;

        let grads = loss.backward()?;
        self.generator_optimizer
            .step(&grads)
            .map_err(GanError::OptimizerStep)?;
        Ok(value)
    }

    /// Full alternating update for one batch of real images `[B, P]`.
    pub fn train_batch(&mut self, real: &Tensor) -> GanResult<BatchLosses> {
        let n = real.dim(0)?;
        let latent = self.sampler.sample(n, &self.device)?;

        let DiscriminatorStep {
            loss: discriminator,
            fake,
        } = self.discriminator_step(real, &latent)?;

        // First sub-step reuses the pre-update fake; later ones regenerate
        // from the same latent with the updated generator.
        let mut generator = Vec::with_capacity(self.config.generator_steps);
        let mut fake = fake;
        for step in 0..self.config.generator_steps {
            generator.push(self.generator_step(&fake)?);
            if step + 1 < self.config.generator_steps {
                fake = self.generator.generate(&latent)?;
            }
        }

        self.global_step += 1;
        Ok(BatchLosses {
            discriminator,
            generator,
        })
    }

    // ── Epochs ──────────────────────────────────────────────────────────────

    /// One full pass over `dataset`.
    ///
    /// The generator average is normalised by `generator_steps · len`, the
    /// discriminator average by `len`.
    pub fn train_epoch(
        &mut self,
        dataset: &dyn ImageDataset,
        epoch: usize,
    ) -> GanResult<EpochLosses> {
        self.check_dataset(dataset)?;
        let shuffle_seed = self
            .config
            .shuffle
            .then(|| Split::Train.shuffle_seed(self.run_seed, epoch));
        let batches = Batches::new(dataset, self.config.batch_size, shuffle_seed)?;
        let num_batches = batches.num_batches();
        let len = dataset.len();
        self.epoch = epoch;

        let pb = progress_bar(num_batches, self.config.show_progress, epoch);
        let mut records = Vec::with_capacity(num_batches);
        let mut generator_sum = 0.0f64;
        let mut discriminator_sum = 0.0f64;

        for (batch_idx, real) in batches.enumerate() {
            self.batch = batch_idx;
            let real = real?;
            let batch_len = real.dim(0)?;
            let losses = self.train_batch(&real)?;

            generator_sum += losses.generator_total();
            discriminator_sum += losses.discriminator;

            let last_generator = losses.generator.last().copied().unwrap_or_default();
            if self.config.log_every > 0 && batch_idx % self.config.log_every == 0 {
                let seen = batch_idx * self.config.batch_size;
                tracing::info!(
                    epoch,
                    position = format!(
                        "[{seen}/{len} ({:.0}%)]",
                        100.0 * batch_idx as f64 / num_batches as f64
                    ),
                    gen_loss = format!("{:.6}", last_generator / batch_len as f64),
                    disc_loss = format!("{:.6}", losses.discriminator / batch_len as f64),
                    "Train"
                );
            }
            pb.set_message(format!(
                "G {:.4}  D {:.4}",
                last_generator / batch_len as f64,
                losses.discriminator / batch_len as f64
            ));
            pb.inc(1);
            records.push(losses);
        }
        pb.finish_and_clear();

        let generator = GanError::check_finite(
            generator_sum / (self.config.generator_steps * len) as f64,
            LossPhase::Generator,
            epoch,
            num_batches,
        )?;
        let discriminator = GanError::check_finite(
            discriminator_sum / len as f64,
            LossPhase::Discriminator,
            epoch,
            num_batches,
        )?;
        tracing::info!(
            epoch,
            gen_loss = format!("{generator:.4}"),
            disc_loss = format!("{discriminator:.4}"),
            "Epoch train average"
        );
        Ok(EpochLosses {
            generator,
            discriminator,
            batches: records,
        })
    }

    /// Loss on `dataset` without touching any parameter or optimiser state.
    pub fn evaluate(
        &mut self,
        dataset: &dyn ImageDataset,
        epoch: usize,
    ) -> GanResult<EpochLosses> {
        self.check_dataset(dataset)?;
        let shuffle_seed = self
            .config
            .shuffle
            .then(|| Split::Test.shuffle_seed(self.run_seed, epoch));
        let batches = Batches::new(dataset, self.config.batch_size, shuffle_seed)?;
        Evaluator::new(&self.generator, &self.discriminator).evaluate(
            batches,
            dataset.len(),
            &mut self.sampler,
            epoch,
        )
    }

    /// `n` detached generator samples, `[n, P]`.
    pub fn sample_images(&mut self, n: usize) -> GanResult<Tensor> {
        let latent = self.sampler.sample(n, &self.device)?;
        Ok(self.generator.generate(&latent)?.detach())
    }

    fn check_dataset(&self, dataset: &dyn ImageDataset) -> GanResult<()> {
        if dataset.image_dim() != self.discriminator.input_dim() {
            return Err(GanError::shape_mismatch(
                format!("dataset images of {}", self.discriminator.input_dim()),
                format!("{}", dataset.image_dim()),
            ));
        }
        Ok(())
    }
}

fn progress_bar(len: usize, visible: bool, epoch: usize) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "epoch {prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("=>-"));
    pb.set_prefix(epoch.to_string());
    pb
}

// ── Tests ───────────────────────────────────────────────────────────────────
