//! In-memory record of training progress.

use std::fmt;

use serde::Serialize;

use super::callback::{BatchLogs, EpochLogs, TrainingCallback, TrainingPlan};

/// Granularity at which metrics are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Batch,
    Epoch,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Batch => f.write_str("batch"),
            Granularity::Epoch => f.write_str("epoch"),
        }
    }
}

/// Four parallel, append-only metric sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSeries {
    pub loss: Vec<Option<f32>>,
    pub accuracy: Vec<Option<f32>>,
    pub val_loss: Vec<Option<f32>>,
    pub val_accuracy: Vec<Option<f32>>,
}

impl MetricSeries {
    fn push(
        &mut self,
        loss: Option<f32>,
        accuracy: Option<f32>,
        val_loss: Option<f32>,
        val_accuracy: Option<f32>,
    ) {
        self.loss.push(loss);
        self.accuracy.push(accuracy);
        self.val_loss.push(val_loss);
        self.val_accuracy.push(val_accuracy);
    }

    pub fn len(&self) -> usize {
        self.loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loss.is_empty()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Records loss, accuracy, validation loss and validation accuracy after
/// every batch and every epoch.
///
/// Construct it, pass it to [`crate::training::fit`] as a callback, then read
/// it back. Starting a new run clears previous records.
///
/// # Example
///
/// ```rust
/// use food_gru::training::{Granularity, TrainingHistory};
///
/// let history = TrainingHistory::new();
/// assert!(history.series(Granularity::Epoch).is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingHistory {
    batch: MetricSeries,
    epoch: MetricSeries,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, granularity: Granularity) -> &MetricSeries {
        match granularity {
            Granularity::Batch => &self.batch,
            Granularity::Epoch => &self.epoch,
        }
    }

    pub fn losses(&self, granularity: Granularity) -> &[Option<f32>] {
        &self.series(granularity).loss
    }

    pub fn accuracy(&self, granularity: Granularity) -> &[Option<f32>] {
        &self.series(granularity).accuracy
    }

    pub fn val_loss(&self, granularity: Granularity) -> &[Option<f32>] {
        &self.series(granularity).val_loss
    }

    pub fn val_accuracy(&self, granularity: Granularity) -> &[Option<f32>] {
        &self.series(granularity).val_accuracy
    }
}

impl TrainingCallback for TrainingHistory {
    fn on_train_begin(&mut self, _plan: &TrainingPlan) {
        self.batch.clear();
        self.epoch.clear();
    }

    fn on_batch_end(&mut self, _batch: usize, logs: &BatchLogs) {
        self.batch
            .push(Some(logs.loss), Some(logs.accuracy), None, None);
    }

    fn on_epoch_end(&mut self, _epoch: usize, logs: &EpochLogs) {
        self.epoch.push(
            Some(logs.loss),
            Some(logs.accuracy),
            logs.val_loss,
            logs.val_accuracy,
        );
    }
}
