//! Recurrent classifier architecture.

use ndarray::{Array2, Array3};
use rand::Rng;

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::neural::activation::Activation;
use crate::neural::dense::{DenseLayer, Dropout, Init};
use crate::neural::gru::GruLayer;
use crate::neural::loss::{categorical_accuracy, mse_loss};
use crate::neural::optimizer::AdamOptimizer;

const RULE_WIDTH: usize = 65;

/// GRU → Dense(relu) → Dropout → Dense(softmax).
///
/// The GRU emits only its final state; the output layer produces one
/// probability per class.
#[derive(Debug, Clone)]
pub struct GruClassifier {
    gru: GruLayer,
    hidden: DenseLayer,
    dropout: Dropout,
    output: DenseLayer,
    input_shape: (usize, usize),
}

/// Loss and accuracy of one optimisation step, measured on the batch in
/// training mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetrics {
    pub loss: f32,
    pub accuracy: f32,
}

impl GruClassifier {
    /// Builds the classifier.
    ///
    /// # Arguments
    ///
    /// * `config` - Layer widths, dropout rate and GRU activation
    /// * `input_shape` - `(sequence_length, feature_dim)` of one example
    /// * `class_count` - Number of output classes
    /// * `rng` - Source for weight initialisation
    pub fn build<R: Rng + ?Sized>(
        config: &ModelConfig,
        input_shape: (usize, usize),
        class_count: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let (steps, features) = input_shape;
        if steps == 0 || features == 0 {
            return Err(Error::model(format!(
                "input shape ({steps}, {features}) must be non-empty"
            )));
        }
        if config.gru_units == 0 || config.dense_units == 0 {
            return Err(Error::model("layer widths must be positive"));
        }
        if class_count == 0 {
            return Err(Error::model("class count must be positive"));
        }
        if !(0.0..1.0).contains(&config.dropout) {
            return Err(Error::model(format!(
                "dropout rate {} must lie in [0, 1)",
                config.dropout
            )));
        }
        if config.gru_activation == Activation::Softmax {
            return Err(Error::model("softmax cannot be used inside the GRU cell"));
        }

        let gru = GruLayer::new(
            "gru_1",
            features,
            config.gru_units,
            config.gru_activation,
            rng,
        );
        let hidden = DenseLayer::new(
            "dense_1",
            config.gru_units,
            config.dense_units,
            Activation::Relu,
            Init::Normal(0.05),
            rng,
        );
        let output = DenseLayer::new(
            "dense_2",
            config.dense_units,
            class_count,
            Activation::Softmax,
            Init::GlorotUniform,
            rng,
        );

        Ok(Self {
            gru,
            hidden,
            dropout: Dropout::new(config.dropout),
            output,
            input_shape,
        })
    }

    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    pub fn class_count(&self) -> usize {
        self.output.units()
    }

    pub fn parameter_count(&self) -> usize {
        self.gru.parameter_count() + self.hidden.parameter_count() + self.output.parameter_count()
    }

    /// Inference pass: dropout disabled, rows of the result sum to one.
    pub fn forward(&self, input: &Array3<f32>) -> Result<Array2<f32>> {
        self.check_input(input)?;
        let state = self.gru.forward(input);
        let hidden = self.hidden.forward(&state);
        Ok(self.output.forward(&hidden))
    }

    /// One optimisation step on a batch with one-hot `targets`.
    ///
    /// Loss and accuracy are computed on the training-mode forward pass,
    /// before the update is applied.
    pub fn train_step<R: Rng + ?Sized>(
        &mut self,
        input: &Array3<f32>,
        targets: &Array2<f32>,
        optimizer: &mut AdamOptimizer,
        rng: &mut R,
    ) -> Result<StepMetrics> {
        self.check_input(input)?;
        self.check_targets(input, targets)?;

        // Forward pass
        let (state, gru_cache) = self.gru.forward_cached(input);
        let (hidden, hidden_cache) = self.hidden.forward_cached(&state);
        let mask = self
            .dropout
            .sample_mask(hidden.nrows(), hidden.ncols(), rng);
        let dropped = &hidden * &mask;
        let (predictions, output_cache) = self.output.forward_cached(&dropped);

        let (loss, grad_predictions) = mse_loss(&predictions, targets);
        let accuracy = categorical_accuracy(&predictions, targets);

        // Backward pass - collect gradients before touching any weights
        let (grad_dropped, output_grads) = self.output.backward(&output_cache, &grad_predictions);
        let grad_hidden = grad_dropped * &mask;
        let (grad_state, hidden_grads) = self.hidden.backward(&hidden_cache, &grad_hidden);
        let gru_grads = self.gru.backward(&gru_cache, &grad_state);

        optimizer.begin_iteration();
        self.output.apply_gradients(&output_grads, optimizer);
        self.hidden.apply_gradients(&hidden_grads, optimizer);
        self.gru.apply_gradients(&gru_grads, optimizer);

        Ok(StepMetrics { loss, accuracy })
    }

    /// Loss and accuracy in inference mode, without updating weights.
    pub fn measure(&self, input: &Array3<f32>, targets: &Array2<f32>) -> Result<StepMetrics> {
        self.check_targets(input, targets)?;
        let predictions = self.forward(input)?;
        let (loss, _) = mse_loss(&predictions, targets);
        Ok(StepMetrics {
            loss,
            accuracy: categorical_accuracy(&predictions, targets),
        })
    }

    /// Layer table in the usual `Layer (type) / Output Shape / Param #`
    /// layout.
    pub fn summary(&self) -> String {
        let rows = [
            (
                format!("{} (GRU)", self.gru.name()),
                format!("(None, {})", self.gru.units()),
                self.gru.parameter_count(),
            ),
            (
                format!("{} (Dense)", self.hidden.name()),
                format!("(None, {})", self.hidden.units()),
                self.hidden.parameter_count(),
            ),
            (
                "dropout_1 (Dropout)".to_string(),
                format!("(None, {})", self.hidden.units()),
                0,
            ),
            (
                format!("{} (Dense)", self.output.name()),
                format!("(None, {})", self.output.units()),
                self.output.parameter_count(),
            ),
        ];

        let mut out = String::new();
        out.push_str(&"_".repeat(RULE_WIDTH));
        out.push('\n');
        out.push_str(&format!("{:<29}{:<26}{}\n", "Layer (type)", "Output Shape", "Param #"));
        out.push_str(&"=".repeat(RULE_WIDTH));
        out.push('\n');
        for (index, (layer, shape, params)) in rows.iter().enumerate() {
            out.push_str(&format!("{layer:<29}{shape:<26}{params}\n"));
            let rule = if index + 1 == rows.len() { "=" } else { "_" };
            out.push_str(&rule.repeat(RULE_WIDTH));
            out.push('\n');
        }
        let total = group_thousands(self.parameter_count());
        out.push_str(&format!("Total params: {total}\n"));
        out.push_str(&format!("Trainable params: {total}\n"));
        out.push_str("Non-trainable params: 0\n");
        out.push_str(&"_".repeat(RULE_WIDTH));
        out
    }

    fn check_input(&self, input: &Array3<f32>) -> Result<()> {
        let (_, steps, features) = input.dim();
        if (steps, features) != self.input_shape {
            return Err(Error::model(format!(
                "expected input of shape (batch, {}, {}), got (batch, {steps}, {features})",
                self.input_shape.0, self.input_shape.1
            )));
        }
        Ok(())
    }

    fn check_targets(&self, input: &Array3<f32>, targets: &Array2<f32>) -> Result<()> {
        if targets.nrows() != input.dim().0 || targets.ncols() != self.class_count() {
            return Err(Error::model(format!(
                "expected targets of shape ({}, {}), got {:?}",
                input.dim().0,
                self.class_count(),
                targets.dim()
            )));
        }
        Ok(())
    }
}

fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn random_input(rng: &mut StdRng, batch: usize) -> Array3<f32> {
        Array3::from_shape_simple_fn((batch, 20, 8), || rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_network_creation() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = GruClassifier::build(&ModelConfig::default(), (20, 8), 5, &mut rng).unwrap();
        assert_eq!(net.class_count(), 5);
        assert_eq!(net.input_shape(), (20, 8));
        // 3 * (8*32 + 32*32 + 32) + (32*64 + 64) + (64*5 + 5)
        assert_eq!(net.parameter_count(), 3936 + 2112 + 325);
    }

    #[test]
    fn test_forward_rows_are_distributions() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = GruClassifier::build(&ModelConfig::default(), (20, 8), 5, &mut rng).unwrap();
        let input = random_input(&mut rng, 7);

        let output = net.forward(&input).unwrap();
        assert_eq!(output.dim(), (7, 5));
        for row in output.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_train_step_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = ModelConfig {
            dropout: 0.0,
            ..ModelConfig::default()
        };
        let mut net = GruClassifier::build(&config, (20, 8), 5, &mut rng).unwrap();
        let mut optimizer = AdamOptimizer::new(1e-2);

        let input = random_input(&mut rng, 10);
        let mut targets = Array2::zeros((10, 5));
        for i in 0..10 {
            targets[[i, i % 5]] = 1.0;
        }

        let before = net.measure(&input, &targets).unwrap().loss;
        for _ in 0..30 {
            net.train_step(&input, &targets, &mut optimizer, &mut rng).unwrap();
        }
        let after = net.measure(&input, &targets).unwrap().loss;
        assert!(after < before, "loss went from {before} to {after}");
    }

    #[test]
    fn test_rejects_wrong_input_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = GruClassifier::build(&ModelConfig::default(), (20, 8), 5, &mut rng).unwrap();
        let input = Array3::zeros((2, 20, 7));
        assert!(net.forward(&input).is_err());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = ModelConfig {
            dropout: 1.0,
            ..ModelConfig::default()
        };
        assert!(GruClassifier::build(&config, (20, 8), 5, &mut rng).is_err());
        assert!(GruClassifier::build(&ModelConfig::default(), (20, 8), 0, &mut rng).is_err());
        assert!(GruClassifier::build(&ModelConfig::default(), (0, 8), 5, &mut rng).is_err());
    }

    #[test]
    fn test_summary_lists_layers() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = GruClassifier::build(&ModelConfig::default(), (20, 8), 5, &mut rng).unwrap();
        let summary = net.summary();
        assert!(summary.contains("gru_1 (GRU)"));
        assert!(summary.contains("dropout_1 (Dropout)"));
        assert!(summary.contains("Total params: 6,373"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
