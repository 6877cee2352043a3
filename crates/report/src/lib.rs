//! # gan-report — Run Artifacts
//!
//! Default implementations of the output seams of `gan-train`:
//!
//! | Type | Seam | Writes |
//! |------|------|--------|
//! | [`PngGridWriter`] | `SampleSink` | `sample_GAN_<epoch>.png`, 8 images per row |
//! | [`PngLossPlotter`] | `LossPlotter` | `GAN_Train_loss.png`, `GAN_Test_loss.png` |
//! | [`LogDisplay`] | `EpochObserver` | one log line per epoch |

pub mod grid;
pub mod observer;
pub mod plot;

pub use grid::PngGridWriter;
pub use observer::LogDisplay;
pub use plot::{PngLossPlotter, PALETTE};
