//! Epoch driver: train → evaluate → sample, once per epoch, then charts.
//!
//! Image and chart rendering sit behind [`SampleSink`] and [`LossPlotter`];
//! the driver only decides *what* is written *where*. Per-epoch reporting
//! goes through [`EpochObserver`]s, which cannot fail the run.

use std::path::Path;

use candle_core::Tensor;

use gan_common::{check_divisible, GanError, GanResult, ImageDataset, ImageShape};

use crate::context::RunContext;
use crate::history::{LossChart, LossHistory};
use crate::trainer::{EpochLosses, Trainer};

/// Epochs looked at by the mode-collapse warning.
const COLLAPSE_WINDOW: usize = 5;

// ── Output seams ────────────────────────────────────────────────────────────

/// Persists a batch of generated images.
pub trait SampleSink {
    /// `images` is `[N, P]` with values in `[0, 1]`; `shape.dim() == P`.
    fn save_samples(&mut self, images: &Tensor, shape: ImageShape, path: &Path) -> GanResult<()>;
}

/// Renders a loss chart.
pub trait LossPlotter {
    fn plot(&mut self, chart: &LossChart, path: &Path) -> GanResult<()>;
}

/// What an observer sees at the end of an epoch.
#[derive(Debug)]
pub struct EpochReport<'a> {
    pub epoch: usize,
    pub epochs: usize,
    pub train: &'a EpochLosses,
    pub test: &'a EpochLosses,
    pub sample_path: &'a Path,
}

/// Side-channel notified after every epoch.
pub trait EpochObserver {
    fn on_epoch_end(&mut self, report: &EpochReport<'_>);
}

// ── Driver ──────────────────────────────────────────────────────────────────

pub struct EpochDriver<'a> {
    ctx: &'a RunContext,
    sink: Box<dyn SampleSink + 'a>,
    plotter: Box<dyn LossPlotter + 'a>,
    observers: Vec<Box<dyn EpochObserver + 'a>>,
}

impl<'a> EpochDriver<'a> {
    pub fn new(
        ctx: &'a RunContext,
        sink: impl SampleSink + 'a,
        plotter: impl LossPlotter + 'a,
    ) -> Self {
        Self {
            ctx,
            sink: Box::new(sink),
            plotter: Box::new(plotter),
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: impl EpochObserver + 'a) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Run `trainer.config.epochs` epochs and write every artifact.
    ///
    /// Both splits are checked for whole batches before any work starts.
    pub fn run(
        &mut self,
        trainer: &mut Trainer,
        train: &dyn ImageDataset,
        test: &dyn ImageDataset,
    ) -> GanResult<LossHistory> {
        let batch_size = trainer.config.batch_size;
        check_divisible(train.len(), batch_size)?;
        check_divisible(test.len(), batch_size)?;

        let epochs = trainer.config.epochs;
        let sample_count = trainer.config.sample_count;
        let shape = trainer.model_config().image_shape;
        tracing::info!(
            epochs,
            batch_size,
            train_len = train.len(),
            test_len = test.len(),
            "Starting training"
        );

        let mut history = LossHistory::new();
        for epoch in 1..=epochs {
            let train_losses = trainer.train_epoch(train, epoch)?;
            let test_losses = trainer.evaluate(test, epoch)?;
            history.record(&train_losses, &test_losses);

            let samples = trainer.sample_images(sample_count)?;
            check_sample_shape(&samples, sample_count, shape)?;
            let sample_path = self.ctx.sample_path(epoch);
            self.sink.save_samples(&samples, shape, &sample_path)?;

            let report = EpochReport {
                epoch,
                epochs,
                train: &train_losses,
                test: &test_losses,
                sample_path: &sample_path,
            };
            for observer in &mut self.observers {
                observer.on_epoch_end(&report);
            }

            if history.looks_mode_collapsed(COLLAPSE_WINDOW) {
                tracing::warn!(
                    epoch,
                    window = COLLAPSE_WINDOW,
                    "Possible mode collapse: discriminator loss near zero, generator loss high \
                     and rising"
                );
            }
        }

        let train_chart = history.train_chart();
        let test_chart = history.test_chart();
        self.plotter.plot(&train_chart, &self.ctx.train_chart_path())?;
        self.plotter.plot(&test_chart, &self.ctx.test_chart_path())?;
        history.write_csv(&self.ctx.losses_csv_path())?;

        tracing::info!(
            output_dir = %self.ctx.output_dir().display(),
            "Training complete"
        );
        Ok(history)
    }
}

/// Samples must reshape to `[N, C, H, W]`.
fn check_sample_shape(samples: &Tensor, n: usize, shape: ImageShape) -> GanResult<()> {
    if samples.dims() != [n, shape.dim()] {
        return Err(GanError::shape_mismatch(
            format!("[{n}, {}]", shape.dim()),
            format!("{:?}", samples.dims()),
        ));
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use crate::trainer::tests::{dataset, quiet_config, small_model};
    use crate::trainer::TrainingConfig;

    #[derive(Default)]
    struct Recorded {
        samples: Vec<(PathBuf, Vec<usize>)>,
        charts: Vec<(PathBuf, LossChart)>,
        epochs: Vec<usize>,
    }

    type Shared = Rc<RefCell<Recorded>>;

    struct RecordingSink(Shared);

    impl SampleSink for RecordingSink {
        fn save_samples(
            &mut self,
            images: &Tensor,
            shape: ImageShape,
            path: &Path,
        ) -> GanResult<()> {
            let n = images.dim(0)?;
            let grid = images.reshape((n, shape.channels, shape.height, shape.width))?;
            self.0
                .borrow_mut()
                .samples
                .push((path.to_path_buf(), grid.dims().to_vec()));
            Ok(())
        }
    }

    struct RecordingPlotter(Shared);

    impl LossPlotter for RecordingPlotter {
        fn plot(&mut self, chart: &LossChart, path: &Path) -> GanResult<()> {
            self.0
                .borrow_mut()
                .charts
                .push((path.to_path_buf(), chart.clone()));
            Ok(())
        }
    }

    struct RecordingObserver(Shared);

    impl EpochObserver for RecordingObserver {
        fn on_epoch_end(&mut self, report: &EpochReport<'_>) {
            self.0.borrow_mut().epochs.push(report.epoch);
        }
    }

    struct FailingSink;

    impl SampleSink for FailingSink {
        fn save_samples(&mut self, _: &Tensor, _: ImageShape, _: &Path) -> GanResult<()> {
            Err(GanError::image("disk full"))
        }
    }

    fn run_two_epochs(tmp: &Path) -> (LossHistory, Recorded) {
        let ctx = RunContext::cpu(tmp, 11).unwrap();
        let config = TrainingConfig {
            epochs: 2,
            sample_count: 64,
            ..quiet_config(2)
        };
        let mut trainer = Trainer::new(small_model(), config, &ctx).unwrap();
        let shared: Shared = Rc::default();

        let history = {
            let mut driver = EpochDriver::new(
                &ctx,
                RecordingSink(shared.clone()),
                RecordingPlotter(shared.clone()),
            )
            .with_observer(RecordingObserver(shared.clone()));
            driver.run(&mut trainer, &dataset(4), &dataset(2)).unwrap()
        };
        let recorded = Rc::try_unwrap(shared).ok().unwrap().into_inner();
        (history, recorded)
    }

    #[test]
    fn writes_one_sample_grid_per_epoch() {
        let tmp = tempfile::tempdir().unwrap();
        let (history, rec) = run_two_epochs(tmp.path());

        assert_eq!(history.num_epochs(), 2);
        assert_eq!(rec.epochs, vec![1, 2]);
        assert_eq!(rec.samples.len(), 2);
        assert_eq!(rec.samples[0].0, tmp.path().join("sample_GAN_1.png"));
        assert_eq!(rec.samples[1].0, tmp.path().join("sample_GAN_2.png"));
        assert!(rec.samples.iter().all(|(_, dims)| dims == &[64, 1, 28, 28]));
    }

    #[test]
    fn plots_both_charts_and_writes_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let (history, rec) = run_two_epochs(tmp.path());

        assert_eq!(rec.charts.len(), 2);
        let (train_path, train_chart) = &rec.charts[0];
        assert_eq!(train_path, &tmp.path().join("GAN_Train_loss.png"));
        assert_eq!(train_chart.title, "Training Loss");
        assert_eq!(train_chart.series[0].values, history.train_discriminator);
        assert_eq!(train_chart.series[1].values, history.train_generator);

        let (test_path, test_chart) = &rec.charts[1];
        assert_eq!(test_path, &tmp.path().join("GAN_Test_loss.png"));
        assert_eq!(test_chart.title, "Test Loss");
        assert_eq!(test_chart.num_points(), 2);

        let csv = std::fs::read_to_string(tmp.path().join("losses.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn ragged_test_split_fails_before_training() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RunContext::cpu(tmp.path(), 0).unwrap();
        let mut trainer = Trainer::new(small_model(), quiet_config(2), &ctx).unwrap();
        let shared: Shared = Rc::default();
        let mut driver = EpochDriver::new(
            &ctx,
            RecordingSink(shared.clone()),
            RecordingPlotter(shared.clone()),
        );
        let err = driver
            .run(&mut trainer, &dataset(4), &dataset(3))
            .unwrap_err();
        assert!(matches!(err, GanError::RaggedBatches { len: 3, batch_size: 2 }));
        assert_eq!(trainer.global_step, 0);
    }

    #[test]
    fn sink_errors_abort_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RunContext::cpu(tmp.path(), 0).unwrap();
        let mut trainer = Trainer::new(small_model(), quiet_config(2), &ctx).unwrap();
        let shared: Shared = Rc::default();
        let mut driver = EpochDriver::new(&ctx, FailingSink, RecordingPlotter(shared.clone()));
        let err = driver
            .run(&mut trainer, &dataset(2), &dataset(2))
            .unwrap_err();
        assert!(matches!(err, GanError::Image(_)));
        assert!(shared.borrow().charts.is_empty());
    }
}
