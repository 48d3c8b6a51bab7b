// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one row per epoch to {models_dir}/metrics.csv:
//
//   epoch,train_loss,val_loss,train_acc,val_acc,val_bleu
//   1,3.124500,3.089200,0.020000,0.015000,0.000000
//   2,2.890100,2.854300,0.061000,0.048000,0.000000
//
// The header is written only when the file is new, so a resumed
// run keeps appending to the same log.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: [&str; 6] = ["epoch", "train_loss", "val_loss", "train_acc", "val_acc", "val_bleu"];

/// Metrics of one completed epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Global epoch number, resume offset included
    pub epoch: usize,

    /// Mean teacher-forced cross-entropy over the training batches
    pub train_loss: f64,

    /// Mean greedy-decoding loss over the validation batches
    pub val_loss: f64,

    /// Accuracy of greedy decoding on the training set
    pub train_acc: f64,

    /// Accuracy of greedy decoding on the validation set.
    /// This is the figure checkpoints are selected on.
    pub val_acc: f64,

    /// Always 0.0; kept so the report layout is stable
    pub val_bleu: f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            w.write_record(HEADER)?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record([
            m.epoch.to_string(),
            format!("{:.6}", m.train_loss),
            format!("{:.6}", m.val_loss),
            format!("{:.6}", m.train_acc),
            format!("{:.6}", m.val_acc),
            format!("{:.6}", m.val_bleu),
        ])?;
        w.flush()?;

        tracing::debug!("Logged epoch {} metrics to '{}'", m.epoch, self.csv_path.display());
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 2.5,
            val_loss:   2.25,
            train_acc:  0.5,
            val_acc:    0.25,
            val_bleu:   0.0,
        }
    }

    #[test]
    fn test_header_once_then_one_row_per_epoch() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(1)).unwrap();

        // A second logger over the same directory must not repeat the header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(2)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,val_loss,train_acc,val_acc,val_bleu");
        assert_eq!(lines[1], "1,2.500000,2.250000,0.500000,0.250000,0.000000");
        assert!(lines[2].starts_with("2,"));
    }
}
