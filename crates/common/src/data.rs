//! Data pipeline: MNIST loading, splits, shuffled batching.
//!
//! Images are flattened to `(n, P)` f32 tensors already scaled to `[0, 1]`.
//! Batches are gathered with `index_select`, so they stay on the dataset's
//! device.
//!
//! * **[`TensorDataset`]** — an in-memory split; also the test double.
//! * **[`MnistSplits`]** — train + test splits from IDX files or the hub.
//! * **[`Batches`]** — iterator of `(batch_size, P)` tensors in a
//!   deterministic (optionally shuffled) order.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{GanError, GanResult};

// ── Split ───────────────────────────────────────────────────────────────────

/// Which half of the dataset a batch stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// Shuffle seed for `(run seed, epoch, split)`. Distinct splits and
    /// epochs get distinct orders; the same triple always gives the same one.
    pub fn shuffle_seed(self, run_seed: u64, epoch: usize) -> u64 {
        let split_salt = match self {
            Split::Train => 0x5452_4149_4e00_0000,
            Split::Test => 0x5445_5354_0000_0000,
        };
        run_seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(split_salt)
            .wrapping_add(epoch as u64)
    }
}

// ── ImageDataset trait ──────────────────────────────────────────────────────

/// Common interface for anything that can hand out image batches.
pub trait ImageDataset {
    /// Number of images.
    fn len(&self) -> usize;
    /// Flattened image length (P).
    fn image_dim(&self) -> usize;
    /// Gather the images at `indices` into an `(indices.len(), P)` tensor.
    fn gather(&self, indices: &[u32]) -> GanResult<Tensor>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── TensorDataset ───────────────────────────────────────────────────────────

/// One split held as a single `(n, P)` f32 tensor.
#[derive(Debug, Clone)]
pub struct TensorDataset {
    images: Tensor,
}

impl TensorDataset {
    /// Wrap an image tensor. Anything past the first dimension is flattened,
    /// so `(n, 1, 28, 28)` and `(n, 784)` are equivalent.
    pub fn new(images: Tensor) -> GanResult<Self> {
        if images.rank() < 2 {
            return Err(GanError::shape_mismatch(
                "(n, P) image tensor",
                format!("{:?}", images.dims()),
            ));
        }
        let images = images.flatten_from(1)?.to_dtype(DType::F32)?;
        Ok(Self { images })
    }

    /// Build from row-major pixel data already scaled to `[0, 1]`.
    pub fn from_vec(
        pixels: Vec<f32>,
        len: usize,
        image_dim: usize,
        device: &Device,
    ) -> GanResult<Self> {
        if pixels.len() != len * image_dim {
            return Err(GanError::shape_mismatch(
                format!("{len} x {image_dim} = {} pixels", len * image_dim),
                format!("{} pixels", pixels.len()),
            ));
        }
        let images = Tensor::from_vec(pixels, (len, image_dim), device)?;
        Ok(Self { images })
    }
}

impl ImageDataset for TensorDataset {
    fn len(&self) -> usize {
        self.images.dim(0).unwrap_or(0)
    }

    fn image_dim(&self) -> usize {
        self.images.dim(1).unwrap_or(0)
    }

    fn gather(&self, indices: &[u32]) -> GanResult<Tensor> {
        let idx = Tensor::from_slice(indices, indices.len(), self.images.device())?;
        Ok(self.images.index_select(&idx, 0)?)
    }
}

// ── MnistSplits ─────────────────────────────────────────────────────────────

/// Train and test splits of MNIST. Labels are not kept; the GAN never
/// looks at them.
pub struct MnistSplits {
    pub train: TensorDataset,
    pub test: TensorDataset,
}

impl MnistSplits {
    /// Load from a directory holding the four uncompressed IDX files
    /// (`train-images-idx3-ubyte`, `t10k-images-idx3-ubyte`, ...).
    pub fn load_dir(dir: &Path, device: &Device) -> GanResult<Self> {
        if !dir.is_dir() {
            return Err(GanError::data(format!(
                "MNIST directory not found: {}",
                dir.display()
            )));
        }
        let ds = candle_datasets::vision::mnist::load_dir(dir)
            .map_err(|e| GanError::data(format!("load MNIST from {}: {e}", dir.display())))?;
        Self::from_vision(ds, device)
    }

    /// Download from the Hugging Face hub (cached after the first call).
    pub fn download(device: &Device) -> GanResult<Self> {
        let ds = candle_datasets::vision::mnist::load()
            .map_err(|e| GanError::data(format!("download MNIST: {e}")))?;
        Self::from_vision(ds, device)
    }

    fn from_vision(ds: candle_datasets::vision::Dataset, device: &Device) -> GanResult<Self> {
        let train = TensorDataset::new(ds.train_images.to_device(device)?)?;
        let test = TensorDataset::new(ds.test_images.to_device(device)?)?;
        tracing::info!(
            train = train.len(),
            test = test.len(),
            image_dim = train.image_dim(),
            "Loaded MNIST"
        );
        Ok(Self { train, test })
    }
}

// ── Batches ─────────────────────────────────────────────────────────────────

/// Iterator over fixed-size batches of a dataset.
///
/// The dataset length must be a whole number of batches; there is no short
/// trailing batch.
pub struct Batches<'a> {
    dataset: &'a dyn ImageDataset,
    order: Vec<u32>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Batches<'a> {
    /// * `shuffle_seed` — `Some(seed)` permutes the order with a seeded RNG,
    ///   `None` keeps dataset order.
    pub fn new(
        dataset: &'a dyn ImageDataset,
        batch_size: usize,
        shuffle_seed: Option<u64>,
    ) -> GanResult<Self> {
        let len = dataset.len();
        check_divisible(len, batch_size)?;
        let mut order: Vec<u32> = (0..len as u32).collect();
        if let Some(seed) = shuffle_seed {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        Ok(Self {
            dataset,
            order,
            batch_size,
            cursor: 0,
        })
    }

    /// Total number of batches in one pass.
    pub fn num_batches(&self) -> usize {
        self.order.len() / self.batch_size
    }
}

impl Iterator for Batches<'_> {
    type Item = GanResult<Tensor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor + self.batch_size > self.order.len() {
            return None;
        }
        let indices = &self.order[self.cursor..self.cursor + self.batch_size];
        self.cursor += self.batch_size;
        Some(self.dataset.gather(indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.order.len() - self.cursor) / self.batch_size;
        (left, Some(left))
    }
}

/// Fail with [`GanError::RaggedBatches`] unless `len` splits into whole batches.
pub fn check_divisible(len: usize, batch_size: usize) -> GanResult<()> {
    if batch_size == 0 {
        return Err(GanError::invalid_config("batch_size must be > 0"));
    }
    if len == 0 || len % batch_size != 0 {
        return Err(GanError::RaggedBatches { len, batch_size });
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────
