//! # gan-train — Adversarial Training
//!
//! Everything between "two networks and a dataset" and "a finished run":
//!
//! * **[`Trainer`]** — owns both networks, both Adam optimisers and the
//!   latent sampler. [`Trainer::train_batch`] runs one discriminator step
//!   followed by `generator_steps` generator steps.
//! * **[`Evaluator`]** — the same losses on held-out data, detached.
//! * **[`EpochDriver`]** — epoch loop: train, evaluate, sample, record;
//!   charts and `losses.csv` at the end.
//! * **[`LossHistory`]** / **[`LossChart`]** — per-epoch averages and the
//!   chart descriptions built from them.
//! * **[`RunContext`]** — device, output directory and seed for one run.

pub mod context;
pub mod driver;
pub mod evaluator;
pub mod history;
pub mod trainer;

pub use context::RunContext;
pub use driver::{EpochDriver, EpochObserver, EpochReport, LossPlotter, SampleSink};
pub use evaluator::Evaluator;
pub use history::{LossChart, LossHistory, LossSeries};
pub use trainer::{BatchLosses, DiscriminatorStep, EpochLosses, Trainer, TrainingConfig};
