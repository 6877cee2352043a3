//! Dense (fully-connected) layer: affine transform followed by an activation.
//!
//! Weights live in the caller's [`VarMap`](candle_nn::VarMap) under
//! `<prefix>.weight` (`[out, in]`) and `<prefix>.bias` (`[out]`), so the
//! optimiser that owns that map owns the layer.

use candle_core::{Result, Tensor};
use candle_nn::{Linear, Module, VarBuilder};

use crate::activation::Activation;

/// `activation(x · Wᵀ + b)`.
pub struct DenseLayer {
    inner: Linear,
    activation: Activation,
    in_dim: usize,
    out_dim: usize,
}

impl DenseLayer {
    pub fn new(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        vb: VarBuilder,
    ) -> Result<Self> {
        let inner = candle_nn::linear(in_dim, out_dim, vb)?;
        Ok(Self {
            inner,
            activation,
            in_dim,
            out_dim,
        })
    }

    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = self.inner.forward(x)?;
        self.activation.apply(&h)
    }
}

impl Module for DenseLayer {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.forward(x)
    }
}
