//! Error types shared by every crate in the workspace.

use thiserror::Error;

/// Result type for GAN operations.
pub type GanResult<T> = Result<T, GanError>;

/// Errors that can end a training run.
///
/// None of these are retried: adversarial training has no meaningful
/// "resume mid-batch", so every variant is fatal to the current run.
#[derive(Debug, Error)]
pub enum GanError {
    /// Two tensors that must agree on a dimension do not.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// A loss became NaN or infinite.
    #[error("Non-finite {phase} loss ({value}) at epoch {epoch}, batch {batch}")]
    NonFiniteLoss {
        phase: LossPhase,
        epoch: usize,
        batch: usize,
        value: f64,
    },

    /// The backend failed while applying a parameter update.
    #[error("Optimizer step failed: {0}")]
    OptimizerStep(#[source] candle_core::Error),

    /// Any other tensor operation failed.
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset length is not a whole number of batches.
    #[error("Dataset of {len} samples is not divisible by batch size {batch_size}")]
    RaggedBatches { len: usize, batch_size: usize },

    /// Data loading error.
    #[error("Data error: {0}")]
    Data(String),

    /// Image or chart encoding error.
    #[error("Image error: {0}")]
    Image(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Which loss computation produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossPhase {
    Discriminator,
    Generator,
    EvalDiscriminator,
    EvalGenerator,
}

impl std::fmt::Display for LossPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Discriminator => "discriminator",
            Self::Generator => "generator",
            Self::EvalDiscriminator => "eval discriminator",
            Self::EvalGenerator => "eval generator",
        };
        f.write_str(name)
    }
}

impl GanError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a data error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create an image error
    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    /// Check a scalar loss, turning NaN / ±Inf into [`GanError::NonFiniteLoss`].
    pub fn check_finite(
        value: f64,
        phase: LossPhase,
        epoch: usize,
        batch: usize,
    ) -> GanResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NonFiniteLoss {
                phase,
                epoch,
                batch,
                value,
            })
        }
    }
}
