//! Loss function and accuracy metric.

use ndarray::{Array2, ArrayView1};

/// Mean squared error over every class of every row.
///
/// Returns the loss and its gradient with respect to `predictions`.
pub fn mse_loss(predictions: &Array2<f32>, targets: &Array2<f32>) -> (f32, Array2<f32>) {
    let count = predictions.len().max(1) as f32;
    let diff = predictions - targets;
    let loss = diff.mapv(|d| d * d).sum() / count;
    let grad = diff * (2.0 / count);
    (loss, grad)
}

/// Index of the largest entry; the first one wins ties.
pub fn argmax(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (index, &value) in row.iter().enumerate() {
        if value > best_value {
            best = index;
            best_value = value;
        }
    }
    best
}

/// Fraction of rows whose highest prediction matches the target's.
pub fn categorical_accuracy(predictions: &Array2<f32>, targets: &Array2<f32>) -> f32 {
    let rows = predictions.nrows();
    if rows == 0 {
        return 0.0;
    }
    let hits = predictions
        .rows()
        .into_iter()
        .zip(targets.rows())
        .filter(|(pred, target)| argmax(pred.view()) == argmax(target.view()))
        .count();
    hits as f32 / rows as f32
}
