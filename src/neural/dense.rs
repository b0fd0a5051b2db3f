//! Fully connected layer and dropout.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

use super::activation::Activation;
use super::optimizer::AdamOptimizer;

/// Weight initialisation scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    GlorotUniform,
    /// Zero-mean normal with the given standard deviation.
    Normal(f32),
}

impl Init {
    pub fn sample<R: Rng + ?Sized>(self, rows: usize, cols: usize, rng: &mut R) -> Array2<f32> {
        match self {
            Init::GlorotUniform => {
                let limit = (6.0 / (rows + cols) as f32).sqrt();
                let dist = Uniform::new_inclusive(-limit, limit);
                Array2::from_shape_simple_fn((rows, cols), || dist.sample(rng))
            }
            Init::Normal(std) => Array2::from_shape_simple_fn((rows, cols), || {
                let z: f32 = rng.sample(StandardNormal);
                z * std
            }),
        }
    }
}

/// Affine map followed by an activation.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    name: String,
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    activation: Activation,
}

/// Values kept from the forward pass for backpropagation.
#[derive(Debug, Clone)]
pub struct DenseCache {
    input: Array2<f32>,
    pre: Array2<f32>,
    output: Array2<f32>,
}

#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl DenseLayer {
    pub fn new<R: Rng + ?Sized>(
        name: impl Into<String>,
        input_size: usize,
        units: usize,
        activation: Activation,
        init: Init,
        rng: &mut R,
    ) -> Self {
        Self {
            name: name.into(),
            weights: init.sample(input_size, units, rng),
            bias: Array1::zeros(units),
            activation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> usize {
        self.bias.len()
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    pub fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        let pre = input.dot(&self.weights) + &self.bias;
        self.activation.apply(&pre)
    }

    pub fn forward_cached(&self, input: &Array2<f32>) -> (Array2<f32>, DenseCache) {
        let pre = input.dot(&self.weights) + &self.bias;
        let output = self.activation.apply(&pre);
        let cache = DenseCache {
            input: input.clone(),
            pre,
            output: output.clone(),
        };
        (output, cache)
    }

    /// Returns the gradient with respect to the layer input and the
    /// parameter gradients.
    pub fn backward(
        &self,
        cache: &DenseCache,
        grad_output: &Array2<f32>,
    ) -> (Array2<f32>, DenseGradients) {
        let grad_pre = self
            .activation
            .backward(&cache.pre, &cache.output, grad_output);
        let gradients = DenseGradients {
            weights: cache.input.t().dot(&grad_pre),
            bias: grad_pre.sum_axis(Axis(0)),
        };
        let grad_input = grad_pre.dot(&self.weights.t());
        (grad_input, gradients)
    }

    pub fn apply_gradients(&mut self, gradients: &DenseGradients, optimizer: &mut AdamOptimizer) {
        optimizer.step(
            &format!("{}/weights", self.name),
            &mut self.weights,
            &gradients.weights,
        );
        optimizer.step(&format!("{}/bias", self.name), &mut self.bias, &gradients.bias);
    }
}

/// Inverted dropout: kept activations are scaled by `1 / (1 - rate)` so
/// inference is the identity.
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    rate: f32,
}

impl Dropout {
    pub fn new(rate: f32) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Draws a scaled keep-mask for a `(rows, cols)` activation.
    pub fn sample_mask<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Array2<f32> {
        if self.rate <= 0.0 {
            return Array2::ones((rows, cols));
        }
        let scale = 1.0 / (1.0 - self.rate);
        Array2::from_shape_simple_fn((rows, cols), || {
            if rng.gen::<f32>() < self.rate {
                0.0
            } else {
                scale
            }
        })
    }
}
