//! Latent noise sampling.
//!
//! Latents come from a seeded [`StdRng`] rather than the backend's RNG so a
//! run is reproducible on CPU, where candle cannot be seeded.

use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::GanResult;

/// Draws `(n, latent_dim)` batches of standard-normal noise.
pub struct LatentSampler {
    rng: StdRng,
    latent_dim: usize,
}

impl LatentSampler {
    pub fn new(latent_dim: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            latent_dim,
        }
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// Sample a fresh `(n, latent_dim)` batch on `device`.
    pub fn sample(&mut self, n: usize, device: &Device) -> GanResult<Tensor> {
        let values: Vec<f32> = (0..n * self.latent_dim)
            .map(|_| StandardNormal.sample(&mut self.rng))
            .collect();
        Ok(Tensor::from_vec(values, (n, self.latent_dim), device)?)
    }
}
