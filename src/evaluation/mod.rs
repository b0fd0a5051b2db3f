//! Test-set evaluation and prediction.

pub mod confusion;

use ndarray::{concatenate, s, Array2, Array3, Axis};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::neural::{argmax, categorical_accuracy, mse_loss, GruClassifier};

pub use confusion::ConfusionMatrix;

/// Loss and accuracy over a whole split, measured in inference mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

/// Class probabilities for every example.
///
/// Batches are independent in inference mode, so they run in parallel and
/// are stitched back together in input order.
pub fn predict(
    model: &GruClassifier,
    features: &Array3<f32>,
    batch_size: usize,
) -> Result<Array2<f32>> {
    if batch_size == 0 {
        return Err(Error::training("batch size must be positive"));
    }
    let examples = features.dim().0;
    if examples == 0 {
        return Ok(Array2::zeros((0, model.class_count())));
    }

    let starts: Vec<usize> = (0..examples).step_by(batch_size).collect();
    let batches = starts
        .par_iter()
        .map(|&start| {
            let end = (start + batch_size).min(examples);
            model.forward(&features.slice(s![start..end, .., ..]).to_owned())
        })
        .collect::<Result<Vec<_>>>()?;

    let views: Vec<_> = batches.iter().map(|batch| batch.view()).collect();
    Ok(concatenate(Axis(0), &views)?)
}

/// Mean squared error and categorical accuracy against one-hot `targets`.
pub fn evaluate(
    model: &GruClassifier,
    features: &Array3<f32>,
    targets: &Array2<f32>,
    batch_size: usize,
) -> Result<Evaluation> {
    if targets.nrows() != features.dim().0 {
        return Err(Error::data(format!(
            "{} feature rows but {} target rows",
            features.dim().0,
            targets.nrows()
        )));
    }
    if targets.nrows() == 0 {
        return Err(Error::data("cannot evaluate on an empty split"));
    }
    let predictions = predict(model, features, batch_size)?;
    if predictions.ncols() != targets.ncols() {
        return Err(Error::data(format!(
            "model predicts {} classes but targets have {} columns",
            predictions.ncols(),
            targets.ncols()
        )));
    }
    let (loss, _) = mse_loss(&predictions, targets);
    Ok(Evaluation {
        loss,
        accuracy: categorical_accuracy(&predictions, targets),
    })
}

/// Index of the highest-scoring class of every row.
pub fn argmax_rows(scores: &Array2<f32>) -> Vec<usize> {
    scores.rows().into_iter().map(argmax).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn model_and_input(examples: usize) -> (GruClassifier, Array3<f32>) {
        let mut rng = StdRng::seed_from_u64(17);
        let model = GruClassifier::build(&ModelConfig::default(), (6, 3), 5, &mut rng).unwrap();
        let input = Array3::from_shape_simple_fn((examples, 6, 3), || rng.gen_range(-1.0..1.0));
        (model, input)
    }

    #[test]
    fn batched_prediction_matches_single_pass() {
        let (model, input) = model_and_input(23);
        let batched = predict(&model, &input, 4).unwrap();
        let whole = model.forward(&input).unwrap();
        assert_eq!(batched.dim(), (23, 5));
        for (a, b) in batched.iter().zip(whole.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_input_predicts_nothing() {
        let (model, _) = model_and_input(1);
        let empty = Array3::zeros((0, 6, 3));
        assert_eq!(predict(&model, &empty, 8).unwrap().dim(), (0, 5));
    }

    #[test]
    fn evaluate_reports_bounded_metrics() {
        let (model, input) = model_and_input(10);
        let mut targets = Array2::zeros((10, 5));
        for i in 0..10 {
            targets[[i, i % 5]] = 1.0;
        }
        let result = evaluate(&model, &input, &targets, 3).unwrap();
        assert!(result.loss > 0.0 && result.loss < 1.0);
        assert!((0.0..=1.0).contains(&result.accuracy));
    }

    #[test]
    fn evaluate_rejects_row_mismatch() {
        let (model, input) = model_and_input(4);
        let targets = Array2::zeros((3, 5));
        assert!(evaluate(&model, &input, &targets, 2).is_err());
    }

    #[test]
    fn argmax_rows_picks_highest_score() {
        let scores = array![[0.1, 0.7, 0.2], [0.5, 0.2, 0.3], [0.0, 0.0, 1.0]];
        assert_eq!(argmax_rows(&scores), vec![1, 0, 2]);
    }
}
