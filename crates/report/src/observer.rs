//! Epoch summaries on the log.

use gan_train::{EpochObserver, EpochReport};

/// Logs one `info` line per epoch with all four averages.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl EpochObserver for LogDisplay {
    fn on_epoch_end(&mut self, report: &EpochReport<'_>) {
        tracing::info!(
            epoch = report.epoch,
            epochs = report.epochs,
            train_gen = format!("{:.4}", report.train.generator),
            train_disc = format!("{:.4}", report.train.discriminator),
            test_gen = format!("{:.4}", report.test.generator),
            test_disc = format!("{:.4}", report.test.discriminator),
            sample = %report.sample_path.display(),
            "Epoch complete"
        );
    }
}
