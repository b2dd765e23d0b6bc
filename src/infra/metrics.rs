// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:         the epoch number (1, 2, 3, ...)
//   - train_loss:    average cross-entropy loss over training batches
//   - eval_loss:     average cross-entropy loss on the eval set
//   - eval_accuracy: fraction of eval records whose zygosity
//                    class was predicted correctly
//
// Evaluation only runs every `eval_epoch_freq` epochs, so the
// eval columns are left empty on the other rows.
//
// Output file: <checkpoint_dir>/metrics.csv
//
//   epoch,train_loss,eval_loss,eval_accuracy
//   1,1.098612,1.051200,0.421053
//   2,0.990100,,
//   ...

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,eval_loss,eval_accuracy";

/// Loss and accuracy over one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub loss:     f64,
    pub accuracy: f64,
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    /// `None` on epochs without an evaluation pass
    pub eval:       Option<EvalMetrics>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, eval: Option<EvalMetrics>) -> Self {
        Self { epoch, train_loss, eval }
    }

    /// Returns true if this epoch improved over the previous best eval loss
    pub fn is_improvement(&self, best_eval_loss: f64) -> bool {
        self.eval.is_some_and(|e| e.loss < best_eval_loss)
    }

    fn csv_row(&self) -> String {
        match self.eval {
            Some(e) => format!("{},{:.6},{:.6},{:.6}", self.epoch, self.train_loss, e.loss, e.accuracy),
            None => format!("{},{:.6},,", self.epoch, self.train_loss),
        }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// resumed runs append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!("Logged epoch {} metrics: train_loss={:.4}", m.epoch, m.train_loss);
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

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, Some(EvalMetrics { loss: 2.3, accuracy: 0.4 }));
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));

        // nothing to compare without an eval pass
        assert!(!EpochMetrics::new(3, 2.0, None).is_improvement(10.0));
    }

    #[test]
    fn test_rows_appended_under_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 1.5, Some(EvalMetrics { loss: 1.25, accuracy: 0.5 }))).unwrap();
        logger.log(&EpochMetrics::new(2, 1.0, None)).unwrap();

        // reopening must not duplicate the header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![HEADER, "1,1.500000,1.250000,0.500000", "2,1.000000,,"]);
    }
}
