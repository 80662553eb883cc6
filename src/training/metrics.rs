//! Training metrics and history tracking

use std::fmt;
use std::path::Path;

use crate::Result;

/// Metrics accumulated over the batches of one epoch
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Sum of per-batch mean losses
    pub total_loss: f64,
    /// Number of correct class predictions
    pub correct: usize,
    /// Total predictions
    pub total_predictions: usize,
    /// Number of batches accumulated
    pub batch_count: usize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update metrics with a batch result
    pub fn update(&mut self, loss: f32, correct: usize, batch_size: usize) {
        self.total_loss += loss as f64;
        self.correct += correct;
        self.total_predictions += batch_size;
        self.batch_count += 1;
    }

    /// Get average loss over accumulated batches
    pub fn avg_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.total_loss / self.batch_count as f64
        }
    }

    /// Get classification accuracy
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct as f64 / self.total_predictions as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.4} | Acc: {:.2}%",
            self.avg_loss(),
            self.accuracy() * 100.0
        )
    }
}

/// Per-epoch training curves
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub val_accuracies: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record metrics for an epoch
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: &Metrics) {
        self.train_losses.push(train.avg_loss());
        self.val_losses.push(val.avg_loss());
        self.train_accuracies.push(train.accuracy());
        self.val_accuracies.push(val.accuracy());

        if val.avg_loss() < self.best_val_loss {
            self.best_val_loss = val.avg_loss();
            self.best_epoch = epoch;
        }
    }

    /// Number of recorded epochs
    pub fn len(&self) -> usize {
        self.train_losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_losses.is_empty()
    }

    /// Write the curves as CSV for external plotting
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["epoch", "loss", "val_loss", "accuracy", "val_accuracy"])?;

        for i in 0..self.train_losses.len() {
            writer.write_record(&[
                (i + 1).to_string(),
                format!("{:.6}", self.train_losses[i]),
                format!("{:.6}", self.val_losses[i]),
                format!("{:.6}", self.train_accuracies[i]),
                format!("{:.6}", self.val_accuracies[i]),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_averaging() {
        let mut metrics = Metrics::new();
        metrics.update(0.8, 3, 4);
        metrics.update(0.4, 4, 4);

        assert!((metrics.avg_loss() - 0.6).abs() < 1e-9);
        assert!((metrics.accuracy() - 7.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let metrics = Metrics::new();
        assert_eq!(metrics.avg_loss(), 0.0);
        assert_eq!(metrics.accuracy(), 0.0);
    }

    #[test]
    fn test_history_tracks_best_epoch() {
        let mut history = TrainingHistory::new();

        let mut train = Metrics::new();
        train.update(1.0, 1, 2);

        for (epoch, val_loss) in [0.9f32, 0.5, 0.7].iter().enumerate() {
            let mut val = Metrics::new();
            val.update(*val_loss, 1, 2);
            history.record_epoch(epoch, &train, &val);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.best_epoch, 1);
        assert!((history.best_val_loss - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_history_csv_format() {
        let mut history = TrainingHistory::new();
        let mut train = Metrics::new();
        train.update(0.5, 9, 10);
        let mut val = Metrics::new();
        val.update(0.6, 8, 10);
        history.record_epoch(0, &train, &val);

        let path = std::env::temp_dir().join("repnet_test_history.csv");
        history.write_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "epoch,loss,val_loss,accuracy,val_accuracy"
        );
        assert_eq!(lines.next().unwrap(), "1,0.500000,0.600000,0.900000,0.800000");
    }
}
