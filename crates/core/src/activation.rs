//! Pointwise activations used by the GAN's dense layers.
//!
//! | Activation | Formula | Used by |
//! |------------|---------|---------|
//! | ReLU       | max(0, x) | hidden layer of both networks |
//! | Sigmoid    | 1 / (1 + e^-x) | output layer of both networks |

use candle_core::{Result, Tensor};

/// Activation applied after an affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, x: &Tensor) -> Result<Tensor> {
        match self {
            Self::Relu => x.relu(),
            Self::Sigmoid => candle_nn::ops::sigmoid(x),
        }
    }
}
