//! Per-epoch loss history and the chart descriptions built from it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use gan_common::GanResult;

use crate::trainer::EpochLosses;

// ── Chart model ─────────────────────────────────────────────────────────────

/// One named line of a chart; `values[i]` is plotted at epoch `i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct LossSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Everything a plotter needs to draw one loss chart.
#[derive(Debug, Clone, PartialEq)]
pub struct LossChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<LossSeries>,
}

impl LossChart {
    /// Two-series chart in legend order `["Disc", "Gen"]`.
    fn disc_gen(title: &str, disc: &[f64], gen: &[f64]) -> Self {
        Self {
            title: title.to_string(),
            x_label: "Epoch".to_string(),
            y_label: "Loss".to_string(),
            series: vec![
                LossSeries {
                    name: "Disc".to_string(),
                    values: disc.to_vec(),
                },
                LossSeries {
                    name: "Gen".to_string(),
                    values: gen.to_vec(),
                },
            ],
        }
    }

    /// `(min, max)` over all series, `None` when there is nothing to plot.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Length of the longest series.
    pub fn num_points(&self) -> usize {
        self.series.iter().map(|s| s.values.len()).max().unwrap_or(0)
    }
}

// ── History ─────────────────────────────────────────────────────────────────

/// Four parallel sequences, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    pub train_generator: Vec<f64>,
    pub train_discriminator: Vec<f64>,
    pub test_generator: Vec<f64>,
    pub test_discriminator: Vec<f64>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, train: &EpochLosses, test: &EpochLosses) {
        self.train_generator.push(train.generator);
        self.train_discriminator.push(train.discriminator);
        self.test_generator.push(test.generator);
        self.test_discriminator.push(test.discriminator);
    }

    pub fn num_epochs(&self) -> usize {
        self.train_generator.len()
    }

    pub fn train_chart(&self) -> LossChart {
        LossChart::disc_gen("Training Loss", &self.train_discriminator, &self.train_generator)
    }

    pub fn test_chart(&self) -> LossChart {
        LossChart::disc_gen("Test Loss", &self.test_discriminator, &self.test_generator)
    }

    /// `epoch,train_generator,train_discriminator,test_generator,test_discriminator`
    pub fn write_csv(&self, path: &Path) -> GanResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(
            out,
            "epoch,train_generator,train_discriminator,test_generator,test_discriminator"
        )?;
        for i in 0..self.num_epochs() {
            writeln!(
                out,
                "{},{:.6},{:.6},{:.6},{:.6}",
                i + 1,
                self.train_generator[i],
                self.train_discriminator[i],
                self.test_generator[i],
                self.test_discriminator[i]
            )?;
        }
        out.flush()?;
        Ok(())
    }

    /// Heuristic over the last `window` epochs of training loss: the
    /// discriminator's mean is below 0.1, the generator's mean is above 5 and
    /// the generator's loss ends the window higher than it started.
    pub fn looks_mode_collapsed(&self, window: usize) -> bool {
        let n = self.num_epochs();
        if window < 2 || n < window {
            return false;
        }
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        let disc = &self.train_discriminator[n - window..];
        let gen = &self.train_generator[n - window..];
        let climbing = gen[window - 1] > gen[0];
        mean(disc) < 0.1 && mean(gen) > 5.0 && climbing
    }
}
