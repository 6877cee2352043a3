//! Per-run context: compute device, output directory, seed.
//!
//! Built once at startup and passed by reference to the trainer and the
//! driver. Nothing here is process-global; two contexts can coexist (tests
//! do exactly that).

use std::path::{Path, PathBuf};

use candle_core::Device;

use gan_common::GanResult;

/// Everything a run needs that is not a hyper-parameter.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Resolved once; the core never branches on device type.
    pub device: Device,
    pub output_dir: PathBuf,
    pub seed: u64,
}

impl RunContext {
    /// CUDA device 0 when available (and not `force_cpu`), CPU otherwise.
    /// Creates `output_dir` if missing.
    pub fn new(output_dir: impl Into<PathBuf>, seed: u64, force_cpu: bool) -> GanResult<Self> {
        let device = if force_cpu {
            Device::Cpu
        } else {
            Device::cuda_if_available(0)?
        };
        Self::with_device(device, output_dir, seed)
    }

    /// CPU-only context.
    pub fn cpu(output_dir: impl Into<PathBuf>, seed: u64) -> GanResult<Self> {
        Self::with_device(Device::Cpu, output_dir, seed)
    }

    fn with_device(device: Device, output_dir: impl Into<PathBuf>, seed: u64) -> GanResult<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        tracing::info!(
            device = ?device,
            output_dir = %output_dir.display(),
            seed,
            "Run context ready"
        );
        Ok(Self {
            device,
            output_dir,
            seed,
        })
    }

    // ── Derived seeds ───────────────────────────────────────────────────────

    pub fn generator_seed(&self) -> u64 {
        self.seed
    }

    pub fn discriminator_seed(&self) -> u64 {
        self.seed.wrapping_add(1)
    }

    pub fn latent_seed(&self) -> u64 {
        self.seed.wrapping_add(2)
    }

    // ── Output paths ────────────────────────────────────────────────────────

    /// `sample_GAN_<epoch>.png`
    pub fn sample_path(&self, epoch: usize) -> PathBuf {
        self.output_dir.join(format!("sample_GAN_{epoch}.png"))
    }

    pub fn train_chart_path(&self) -> PathBuf {
        self.output_dir.join("GAN_Train_loss.png")
    }

    pub fn test_chart_path(&self) -> PathBuf {
        self.output_dir.join("GAN_Test_loss.png")
    }

    pub fn losses_csv_path(&self) -> PathBuf {
        self.output_dir.join("losses.csv")
    }

    pub fn config_path(&self) -> PathBuf {
        self.output_dir.join("config.json")
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_output_dir_and_names_files() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("results");
        let ctx = RunContext::cpu(&out, 3).unwrap();
        assert!(out.is_dir());
        assert_eq!(ctx.sample_path(7), out.join("sample_GAN_7.png"));
        assert_eq!(ctx.train_chart_path(), out.join("GAN_Train_loss.png"));
        assert_eq!(ctx.test_chart_path(), out.join("GAN_Test_loss.png"));
    }

    #[test]
    fn derived_seeds_are_distinct() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RunContext::cpu(tmp.path(), 10).unwrap();
        let seeds = [
            ctx.generator_seed(),
            ctx.discriminator_seed(),
            ctx.latent_seed(),
        ];
        assert_eq!(seeds, [10, 11, 12]);
    }

    #[test]
    fn force_cpu_gives_cpu() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(tmp.path(), 0, true).unwrap();
        assert!(matches!(ctx.device, Device::Cpu));
    }
}
