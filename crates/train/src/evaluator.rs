//! Held-out loss computation.
//!
//! Same losses as training, but every network output is detached and no
//! optimiser is involved; an evaluation pass leaves both parameter sets
//! untouched. The latent sampler does advance.

use candle_core::Tensor;

use gan_common::{Batches, GanError, GanResult, LatentSampler, LossPhase};
use gan_core::{bce_sum, fake_labels, real_labels, Discriminator, Generator};

use crate::trainer::{BatchLosses, EpochLosses};

/// Read-only view of both networks.
pub struct Evaluator<'a> {
    generator: &'a Generator,
    discriminator: &'a Discriminator,
}

impl<'a> Evaluator<'a> {
    pub fn new(generator: &'a Generator, discriminator: &'a Discriminator) -> Self {
        Self {
            generator,
            discriminator,
        }
    }

    /// Sum the per-batch losses over `batches` and normalise both by `len`.
    ///
    /// One generator loss per batch, so the generator average divides by
    /// `len` (not `generator_steps · len` as in training).
    pub fn evaluate(
        &self,
        batches: Batches<'_>,
        len: usize,
        sampler: &mut LatentSampler,
        epoch: usize,
    ) -> GanResult<EpochLosses> {
        let mut records = Vec::with_capacity(batches.num_batches());
        let mut generator_sum = 0.0f64;
        let mut discriminator_sum = 0.0f64;

        for (batch_idx, real) in batches.enumerate() {
            let losses = self.evaluate_batch(&real?, sampler, epoch, batch_idx)?;
            generator_sum += losses.generator_total();
            discriminator_sum += losses.discriminator;
            records.push(losses);
        }

        let generator = GanError::check_finite(
            generator_sum / len as f64,
            LossPhase::EvalGenerator,
            epoch,
            records.len(),
        )?;
        let discriminator = GanError::check_finite(
            discriminator_sum / len as f64,
            LossPhase::EvalDiscriminator,
            epoch,
            records.len(),
        )?;
        tracing::info!(
            epoch,
            gen_loss = format!("{generator:.4}"),
            disc_loss = format!("{discriminator:.4}"),
            "Test set"
        );
        Ok(EpochLosses {
            generator,
            discriminator,
            batches: records,
        })
    }

    fn evaluate_batch(
        &self,
        real: &Tensor,
        sampler: &mut LatentSampler,
        epoch: usize,
        batch: usize,
    ) -> GanResult<BatchLosses> {
        let n = real.dim(0)?;
        let device = real.device();
        let ones = real_labels(n, device)?;
        let zeros = fake_labels(n, device)?;

        let real_pred = self.discriminator.discriminate(real)?.detach();
        let latent = sampler.sample(n, device)?;
        let fake = self.generator.generate(&latent)?.detach();
        let fake_pred = self.discriminator.discriminate(&fake)?.detach();

        let discriminator = (bce_sum(&real_pred, &ones)? + bce_sum(&fake_pred, &zeros)?)?;
        let discriminator = GanError::check_finite(
            discriminator.to_scalar::<f32>()? as f64,
            LossPhase::EvalDiscriminator,
            epoch,
            batch,
        )?;
        let generator = GanError::check_finite(
            bce_sum(&fake_pred, &ones)?.to_scalar::<f32>()? as f64,
            LossPhase::EvalGenerator,
            epoch,
            batch,
        )?;

        Ok(BatchLosses {
            discriminator,
            generator: vec![generator],
        })
    }
}
