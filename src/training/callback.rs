//! Observers notified synchronously by the fit loop.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::logging;

/// Shape of a run, announced before the first batch.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrainingPlan {
    pub epochs: usize,
    pub batch_size: usize,
    pub train_examples: usize,
    pub validation_examples: usize,
    pub batches_per_epoch: usize,
}

/// Metrics of one optimisation step. Validation metrics never exist at
/// batch level.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchLogs {
    /// Rows in this batch (the last batch of an epoch may be short)
    pub size: usize,
    pub loss: f32,
    pub accuracy: f32,
}

/// Metrics of one finished epoch.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EpochLogs {
    /// Size-weighted mean of the batch losses
    pub loss: f32,
    /// Size-weighted mean of the batch accuracies
    pub accuracy: f32,
    /// `None` when the validation split is empty
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Receives progress from [`crate::training::fit`].
///
/// Every method has an empty default so observers only implement what they
/// need.
pub trait TrainingCallback {
    fn on_train_begin(&mut self, _plan: &TrainingPlan) {}

    /// `batch` counts from zero within the epoch.
    fn on_batch_end(&mut self, _batch: usize, _logs: &BatchLogs) {}

    /// `epoch` counts from zero.
    fn on_epoch_end(&mut self, _epoch: usize, _logs: &EpochLogs) {}

    fn on_train_end(&mut self) {}
}

/// Prints one line per epoch.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    epochs: usize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrainingCallback for ConsoleProgress {
    fn on_train_begin(&mut self, plan: &TrainingPlan) {
        self.epochs = plan.epochs;
        println!(
            "Train on {} samples, validate on {} samples",
            plan.train_examples, plan.validation_examples
        );
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) {
        println!("Epoch {}/{} - {}", epoch + 1, self.epochs, format_epoch(logs));
    }
}

/// Appends one structured record per epoch to the JSON log.
#[derive(Debug, Default)]
pub struct JsonProgress;

impl TrainingCallback for JsonProgress {
    fn on_train_begin(&mut self, plan: &TrainingPlan) {
        logging::record("training_started", plan);
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) {
        logging::record(
            "epoch_end",
            &json!({
                "epoch": epoch + 1,
                "metrics": logs,
                "elapsed_ms": logs.elapsed.as_millis() as u64,
            }),
        );
    }
}

/// `1s - loss: 0.1590 - acc: 0.2800 - val_loss: 0.1601 - val_acc: 0.2500`
pub fn format_epoch(logs: &EpochLogs) -> String {
    let mut line = format!(
        "{}s - loss: {:.4} - acc: {:.4}",
        logs.elapsed.as_secs(),
        logs.loss,
        logs.accuracy
    );
    if let Some(val_loss) = logs.val_loss {
        line.push_str(&format!(" - val_loss: {val_loss:.4}"));
    }
    if let Some(val_accuracy) = logs.val_accuracy {
        line.push_str(&format!(" - val_acc: {val_accuracy:.4}"));
    }
    line
}
