//! Generator and discriminator: two-layer perceptrons with opposite shapes.
//!
//! ```text
//! Generator:     z [B, D] → Dense(D→H, ReLU) → Dense(H→P, Sigmoid) → x̂ [B, P]
//! Discriminator: x [B, P] → Dense(P→H, ReLU) → Dense(H→1, Sigmoid) → p [B, 1]
//! ```
//!
//! Each network is built into its own [`VarMap`](candle_nn::VarMap) so the
//! optimiser registered on that map can never touch the other network.

use candle_core::{Result, Tensor};
use candle_nn::{Module, VarBuilder};

use gan_common::{GanConfig, GanError, GanResult};

use crate::activation::Activation;
use crate::linear::DenseLayer;

// ── Generator ───────────────────────────────────────────────────────────────

/// Maps latent noise to images in `[0, 1]`.
pub struct Generator {
    hidden: DenseLayer,
    output: DenseLayer,
}

impl Generator {
    pub fn new(vb: VarBuilder, config: &GanConfig) -> Result<Self> {
        let hidden = DenseLayer::new(
            config.latent_dim,
            config.hidden_dim,
            Activation::Relu,
            vb.pp("hidden"),
        )?;
        let output = DenseLayer::new(
            config.hidden_dim,
            config.image_dim(),
            Activation::Sigmoid,
            vb.pp("output"),
        )?;
        Ok(Self { hidden, output })
    }

    pub fn latent_dim(&self) -> usize {
        self.hidden.in_dim()
    }

    pub fn output_dim(&self) -> usize {
        self.output.out_dim()
    }

    /// `[B, D] → [B, P]`, after checking that the input is `[_, D]`.
    pub fn generate(&self, latent: &Tensor) -> GanResult<Tensor> {
        check_rows(latent, self.latent_dim(), "generator input")?;
        Ok(self.forward(latent)?)
    }

    pub fn forward(&self, latent: &Tensor) -> Result<Tensor> {
        let h = self.hidden.forward(latent)?;
        self.output.forward(&h)
    }
}

impl Module for Generator {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Generator::forward(self, xs)
    }
}

// ── Discriminator ───────────────────────────────────────────────────────────

/// Maps images to the probability that they came from the dataset.
pub struct Discriminator {
    hidden: DenseLayer,
    output: DenseLayer,
}

impl Discriminator {
    pub fn new(vb: VarBuilder, config: &GanConfig) -> Result<Self> {
        let hidden = DenseLayer::new(
            config.image_dim(),
            config.hidden_dim,
            Activation::Relu,
            vb.pp("hidden"),
        )?;
        let output = DenseLayer::new(config.hidden_dim, 1, Activation::Sigmoid, vb.pp("output"))?;
        Ok(Self { hidden, output })
    }

    pub fn input_dim(&self) -> usize {
        self.hidden.in_dim()
    }

    /// `[B, P] → [B, 1]`, after checking that the input is `[_, P]`.
    pub fn discriminate(&self, images: &Tensor) -> GanResult<Tensor> {
        check_rows(images, self.input_dim(), "discriminator input")?;
        Ok(self.forward(images)?)
    }

    pub fn forward(&self, images: &Tensor) -> Result<Tensor> {
        let h = self.hidden.forward(images)?;
        self.output.forward(&h)
    }
}

impl Module for Discriminator {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Discriminator::forward(self, xs)
    }
}

/// Fail with [`GanError::ShapeMismatch`] unless the generator's output
/// width equals the discriminator's input width.
pub fn check_compatible(generator: &Generator, discriminator: &Discriminator) -> GanResult<()> {
    if generator.output_dim() != discriminator.input_dim() {
        return Err(GanError::shape_mismatch(
            format!("discriminator input of {}", generator.output_dim()),
            format!("{}", discriminator.input_dim()),
        ));
    }
    Ok(())
}

fn check_rows(x: &Tensor, width: usize, what: &str) -> GanResult<()> {
    match x.dims() {
        [_, w] if *w == width => Ok(()),
        dims => Err(GanError::shape_mismatch(
            format!("{what} [B, {width}]"),
            format!("{dims:?}"),
        )),
    }
}

// ── Parameter Stats ─────────────────────────────────────────────────────────

/// Parameter counts of both networks.
///
/// Computed from config alone (no model instance needed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStats {
    pub generator_params: usize,
    pub discriminator_params: usize,
}

impl ParameterStats {
    pub fn total(&self) -> usize {
        self.generator_params + self.discriminator_params
    }
}

/// Weights + biases of both two-layer networks.
pub fn parameter_stats(config: &GanConfig) -> ParameterStats {
    let d = config.latent_dim;
    let h = config.hidden_dim;
    let p = config.image_dim();
    ParameterStats {
        generator_params: (d * h + h) + (h * p + p),
        discriminator_params: (p * h + h) + (h + 1),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
