//! # gan-common — Shared Primitives
//!
//! Types and utilities shared across every crate in the workspace:
//!
//! * **[`GanConfig`]** / **[`ImageShape`]** — model hyper-parameters (serialised as JSON).
//! * **[`GanError`]** — the error taxonomy of a training run.
//! * **[`TensorDataset`]** / **[`MnistSplits`]** / **[`Batches`]** — data loading & batching.
//! * **[`LatentSampler`]** — seeded standard-normal noise.

pub mod config;
pub mod data;
pub mod error;
pub mod latent;

pub use config::{GanConfig, ImageShape};
pub use data::{check_divisible, Batches, ImageDataset, MnistSplits, Split, TensorDataset};
pub use error::{GanError, GanResult, LossPhase};
pub use latent::LatentSampler;
