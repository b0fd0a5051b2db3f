//! Fit loop, progress observers and metric history.

pub mod callback;
pub mod history;
pub mod trainer;

pub use callback::{
    format_epoch, BatchLogs, ConsoleProgress, EpochLogs, JsonProgress, TrainingCallback,
    TrainingPlan,
};
pub use history::{Granularity, MetricSeries, TrainingHistory};
pub use trainer::{fit, training_rows, FitReport};
