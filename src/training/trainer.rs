//! Mini-batch fit loop with a held-out validation tail.

use std::time::Instant;

use ndarray::{s, Array2, Array3, Axis};
use rand::Rng;
use serde::Serialize;

use crate::config::FitConfig;
use crate::data::permutation;
use crate::error::{Error, Result};
use crate::evaluation;
use crate::neural::{AdamOptimizer, GruClassifier};

use super::callback::{BatchLogs, EpochLogs, TrainingCallback, TrainingPlan};

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub epochs: usize,
    pub train_examples: usize,
    pub validation_examples: usize,
    pub final_train_loss: f32,
    pub final_train_accuracy: f32,
    pub final_val_loss: Option<f32>,
    pub final_val_accuracy: Option<f32>,
    pub training_time_ms: u64,
}

/// Number of leading rows kept for training.
///
/// Float products such as `40 * 0.8` may land just under the integer they
/// denote, so a small epsilon is added before flooring.
pub fn training_rows(examples: usize, validation_split: f32) -> usize {
    let kept = examples as f64 * (1.0 - f64::from(validation_split));
    ((kept + 1e-6).floor() as usize).min(examples)
}

/// Trains `model` on `features` against one-hot `targets`.
///
/// The last rows are held out for validation according to
/// `config.validation_split`; the same rows are used every epoch. The
/// remaining rows are reshuffled at the start of each epoch when
/// `config.shuffle` is set. Callbacks are invoked in slice order.
pub fn fit<R: Rng + ?Sized>(
    model: &mut GruClassifier,
    features: &Array3<f32>,
    targets: &Array2<f32>,
    config: &FitConfig,
    callbacks: &mut [&mut dyn TrainingCallback],
    rng: &mut R,
) -> Result<FitReport> {
    let examples = features.dim().0;
    if examples == 0 {
        return Err(Error::training("no training data"));
    }
    if targets.nrows() != examples {
        return Err(Error::training(format!(
            "{examples} feature rows but {} target rows",
            targets.nrows()
        )));
    }
    if config.batch_size == 0 {
        return Err(Error::training("batch size must be positive"));
    }
    if !(0.0..1.0).contains(&config.validation_split) {
        return Err(Error::training(format!(
            "validation split {} outside [0, 1)",
            config.validation_split
        )));
    }
    let split_at = training_rows(examples, config.validation_split);
    if split_at == 0 {
        return Err(Error::training(format!(
            "validation split {} leaves no training rows out of {examples}",
            config.validation_split
        )));
    }

    let train_x = features.slice(s![..split_at, .., ..]);
    let train_y = targets.slice(s![..split_at, ..]);
    let val_x = features.slice(s![split_at.., .., ..]).to_owned();
    let val_y = targets.slice(s![split_at.., ..]).to_owned();
    let validation_examples = examples - split_at;

    let plan = TrainingPlan {
        epochs: config.epochs,
        batch_size: config.batch_size,
        train_examples: split_at,
        validation_examples,
        batches_per_epoch: (split_at + config.batch_size - 1) / config.batch_size,
    };
    for callback in callbacks.iter_mut() {
        callback.on_train_begin(&plan);
    }

    let mut optimizer = AdamOptimizer::new(config.learning_rate);
    let started = Instant::now();
    let mut last_epoch: Option<EpochLogs> = None;

    for epoch in 0..config.epochs {
        let epoch_started = Instant::now();
        let order: Vec<usize> = if config.shuffle {
            permutation(split_at, rng)
        } else {
            (0..split_at).collect()
        };

        let mut loss_sum = 0.0f64;
        let mut accuracy_sum = 0.0f64;
        for (batch, indices) in order.chunks(config.batch_size).enumerate() {
            let batch_x = train_x.select(Axis(0), indices);
            let batch_y = train_y.select(Axis(0), indices);
            let step = model.train_step(&batch_x, &batch_y, &mut optimizer, rng)?;

            let size = indices.len();
            loss_sum += f64::from(step.loss) * size as f64;
            accuracy_sum += f64::from(step.accuracy) * size as f64;

            let logs = BatchLogs {
                size,
                loss: step.loss,
                accuracy: step.accuracy,
            };
            for callback in callbacks.iter_mut() {
                callback.on_batch_end(batch, &logs);
            }
        }

        let (val_loss, val_accuracy) = if validation_examples > 0 {
            let result = evaluation::evaluate(model, &val_x, &val_y, config.batch_size)?;
            (Some(result.loss), Some(result.accuracy))
        } else {
            (None, None)
        };

        let logs = EpochLogs {
            loss: (loss_sum / split_at as f64) as f32,
            accuracy: (accuracy_sum / split_at as f64) as f32,
            val_loss,
            val_accuracy,
            elapsed: epoch_started.elapsed(),
        };
        for callback in callbacks.iter_mut() {
            callback.on_epoch_end(epoch, &logs);
        }
        last_epoch = Some(logs);
    }

    for callback in callbacks.iter_mut() {
        callback.on_train_end();
    }

    // Zero epochs leaves the model untouched, so report its current fit.
    let last = match last_epoch {
        Some(logs) => logs,
        None => {
            let train = model.measure(&train_x.to_owned(), &train_y.to_owned())?;
            EpochLogs {
                loss: train.loss,
                accuracy: train.accuracy,
                val_loss: None,
                val_accuracy: None,
                elapsed: started.elapsed(),
            }
        }
    };

    Ok(FitReport {
        epochs: config.epochs,
        train_examples: split_at,
        validation_examples,
        final_train_loss: last.loss,
        final_train_accuracy: last.accuracy,
        final_val_loss: last.val_loss,
        final_val_accuracy: last.val_accuracy,
        training_time_ms: started.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Counter {
        begins: usize,
        batches: Vec<(usize, usize)>,
        epochs: Vec<EpochLogs>,
        ends: usize,
        plan: Option<TrainingPlan>,
    }

    impl TrainingCallback for Counter {
        fn on_train_begin(&mut self, plan: &TrainingPlan) {
            self.begins += 1;
            self.plan = Some(*plan);
        }

        fn on_batch_end(&mut self, batch: usize, logs: &BatchLogs) {
            self.batches.push((batch, logs.size));
        }

        fn on_epoch_end(&mut self, _epoch: usize, logs: &EpochLogs) {
            self.epochs.push(*logs);
        }

        fn on_train_end(&mut self) {
            self.ends += 1;
        }
    }

    fn toy_data(examples: usize, rng: &mut StdRng) -> (Array3<f32>, Array2<f32>) {
        let features = Array3::from_shape_simple_fn((examples, 5, 4), || rng.gen_range(-1.0..1.0));
        let mut targets = Array2::zeros((examples, 5));
        for i in 0..examples {
            targets[[i, i % 5]] = 1.0;
        }
        (features, targets)
    }

    fn config(epochs: usize, batch_size: usize) -> FitConfig {
        FitConfig {
            epochs,
            batch_size,
            ..FitConfig::default()
        }
    }

    #[test]
    fn split_keeps_leading_rows() {
        assert_eq!(training_rows(40, 0.2), 32);
        assert_eq!(training_rows(10, 0.0), 10);
        assert_eq!(training_rows(7, 0.5), 3);
        assert_eq!(training_rows(1, 0.2), 0);
    }

    #[test]
    fn one_epoch_over_forty_examples() {
        let mut rng = StdRng::seed_from_u64(3);
        let (features, targets) = toy_data(40, &mut rng);
        let mut model =
            GruClassifier::build(&ModelConfig::default(), (5, 4), 5, &mut rng).unwrap();
        let mut counter = Counter::default();

        let report = fit(
            &mut model,
            &features,
            &targets,
            &config(1, 32),
            &mut [&mut counter],
            &mut rng,
        )
        .unwrap();

        assert_eq!(report.train_examples, 32);
        assert_eq!(report.validation_examples, 8);
        assert_eq!(counter.begins, 1);
        assert_eq!(counter.ends, 1);
        assert_eq!(counter.batches, vec![(0, 32)]);
        assert_eq!(counter.epochs.len(), 1);
        assert!(counter.epochs[0].val_loss.is_some());
        assert_eq!(counter.plan.unwrap().batches_per_epoch, 1);
    }

    #[test]
    fn short_last_batch_and_weighted_epoch_mean() {
        let mut rng = StdRng::seed_from_u64(9);
        let (features, targets) = toy_data(25, &mut rng);
        let mut model =
            GruClassifier::build(&ModelConfig::default(), (5, 4), 5, &mut rng).unwrap();
        let mut counter = Counter::default();
        let fit_config = FitConfig {
            validation_split: 0.0,
            ..config(2, 10)
        };

        let report = fit(
            &mut model,
            &features,
            &targets,
            &fit_config,
            &mut [&mut counter],
            &mut rng,
        )
        .unwrap();

        let sizes: Vec<usize> = counter.batches.iter().map(|&(_, size)| size).collect();
        assert_eq!(sizes, vec![10, 10, 5, 10, 10, 5]);
        assert_eq!(counter.epochs.len(), 2);
        assert!(counter.epochs.iter().all(|logs| logs.val_loss.is_none()));
        assert_eq!(report.final_val_accuracy, None);
        assert!((0.0..=1.0).contains(&report.final_train_accuracy));
    }

    #[test]
    fn loss_decreases_on_a_learnable_problem() {
        let mut rng = StdRng::seed_from_u64(21);
        let examples = 40;
        let mut features = Array3::zeros((examples, 3, 5));
        let mut targets = Array2::zeros((examples, 5));
        for i in 0..examples {
            let class = i % 5;
            for t in 0..3 {
                features[[i, t, class]] = 1.0;
            }
            targets[[i, class]] = 1.0;
        }
        let mut model =
            GruClassifier::build(&ModelConfig::default(), (3, 5), 5, &mut rng).unwrap();
        let before = model.measure(&features, &targets).unwrap().loss;

        let fit_config = FitConfig {
            epochs: 60,
            batch_size: 8,
            learning_rate: 1e-2,
            validation_split: 0.0,
            shuffle: true,
        };
        fit(&mut model, &features, &targets, &fit_config, &mut [], &mut rng).unwrap();

        let after = model.measure(&features, &targets).unwrap().loss;
        assert!(after < before, "loss went from {before} to {after}");
    }

    #[test]
    fn rejects_invalid_runs() {
        let mut rng = StdRng::seed_from_u64(1);
        let (features, targets) = toy_data(10, &mut rng);
        let mut model =
            GruClassifier::build(&ModelConfig::default(), (5, 4), 5, &mut rng).unwrap();

        let zero_batch = config(1, 0);
        assert!(fit(&mut model, &features, &targets, &zero_batch, &mut [], &mut rng).is_err());

        let bad_split = FitConfig {
            validation_split: 1.0,
            ..config(1, 4)
        };
        assert!(fit(&mut model, &features, &targets, &bad_split, &mut [], &mut rng).is_err());

        let short_targets = targets.slice(s![..9, ..]).to_owned();
        assert!(fit(&mut model, &features, &short_targets, &config(1, 4), &mut [], &mut rng).is_err());

        let empty = Array3::zeros((0, 5, 4));
        let no_targets = Array2::zeros((0, 5));
        assert!(fit(&mut model, &empty, &no_targets, &config(1, 4), &mut [], &mut rng).is_err());
    }
}
