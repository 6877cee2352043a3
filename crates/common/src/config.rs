//! Model configuration for the GAN.
//!
//! Serialised as JSON next to the run outputs. Every field has a default so a
//! minimal `{}` JSON produces the classic MNIST setup (20 → 400 → 784).

use serde::{Deserialize, Serialize};

use crate::error::{GanError, GanResult};

/// Shape of a single image, `channels × height × width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub const MNIST: ImageShape = ImageShape {
        channels: 1,
        height: 28,
        width: 28,
    };

    /// Flattened length `c * h * w`.
    pub fn dim(&self) -> usize {
        self.channels * self.height * self.width
    }
}

impl Default for ImageShape {
    fn default() -> Self {
        Self::MNIST
    }
}

/// Hyper-parameters of the generator / discriminator pair.
///
/// Both networks share the hidden width; the generator maps
/// `latent_dim → hidden_dim → image_dim` and the discriminator maps
/// `image_dim → hidden_dim → 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanConfig {
    // ── Dimensions ──────────────────────────────────────────────────────────
    /// Size of the latent noise vector fed to the generator.
    #[serde(default = "default_latent_dim")]
    pub latent_dim: usize,
    /// Width of the single hidden layer in both networks.
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
    /// Image produced by the generator and consumed by the discriminator.
    #[serde(default)]
    pub image_shape: ImageShape,
}

// ── Default value functions ─────────────────────────────────────────────────

fn default_latent_dim() -> usize {
    20
}
fn default_hidden_dim() -> usize {
    400
}

// ── Impl ────────────────────────────────────────────────────────────────────

impl Default for GanConfig {
    fn default() -> Self {
        Self {
            latent_dim: default_latent_dim(),
            hidden_dim: default_hidden_dim(),
            image_shape: ImageShape::default(),
        }
    }
}

impl GanConfig {
    /// Flattened image length (P).
    pub fn image_dim(&self) -> usize {
        self.image_shape.dim()
    }

    /// Reject degenerate dimensions before any tensor is allocated.
    pub fn validate(&self) -> GanResult<()> {
        if self.latent_dim == 0 {
            return Err(GanError::invalid_config("latent_dim must be > 0"));
        }
        if self.hidden_dim == 0 {
            return Err(GanError::invalid_config("hidden_dim must be > 0"));
        }
        if self.image_dim() == 0 {
            return Err(GanError::invalid_config(format!(
                "image_shape {:?} has no pixels",
                self.image_shape
            )));
        }
        Ok(())
    }

    /// Save config to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> GanResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn load(path: &std::path::Path) -> GanResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
