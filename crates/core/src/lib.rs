//! # gan-core — Networks and Loss
//!
//! Every compute primitive needed to build and train the GAN:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`activation`] | `Activation` (ReLU, Sigmoid) |
//! | [`linear`] | `DenseLayer` (affine + activation) |
//! | [`model`] | `Generator`, `Discriminator`, `ParameterStats` |
//! | [`loss`] | `bce_sum`, real / fake label tensors |
//! | [`init`] | seeded `U(-1/√fan_in, 1/√fan_in)` initialisation |
//!
//! Everything goes through `candle-core`/`candle-nn`; the same code runs on
//! CPU and CUDA. Forward passes hold no hidden randomness.

pub mod activation;
pub mod init;
pub mod linear;
pub mod loss;
pub mod model;

// ── Public re-exports ───────────────────────────────────────────────────────

pub use activation::Activation;
pub use init::seeded_uniform_init;
pub use linear::DenseLayer;
pub use loss::{bce_sum, fake_labels, real_labels};
pub use model::{check_compatible, parameter_stats, Discriminator, Generator, ParameterStats};
