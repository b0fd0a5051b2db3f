//! Gated recurrent unit layer.
//!
//! For every time step `t` with input `x_t` and previous state `h`:
//!
//! ```text
//! z  = sigmoid(x_t·W_z + h·U_z + b_z)
//! r  = sigmoid(x_t·W_r + h·U_r + b_r)
//! h~ = act(x_t·W_h + (r ⊙ h)·U_h + b_h)
//! h' = z ⊙ h + (1 - z) ⊙ h~
//! ```
//!
//! The layer consumes a `(batch, steps, features)` tensor and returns only
//! the final state, shape `(batch, units)`.

use ndarray::{s, Array1, Array2, Array3, Axis};
use rand::Rng;
use rand_distr::StandardNormal;

use super::activation::{sigmoid, Activation};
use super::dense::Init;
use super::optimizer::AdamOptimizer;

/// Parameters of one gate: input kernel, recurrent kernel, bias.
#[derive(Debug, Clone)]
pub struct GateParams {
    pub kernel: Array2<f32>,
    pub recurrent: Array2<f32>,
    pub bias: Array1<f32>,
}

impl GateParams {
    fn new<R: Rng + ?Sized>(features: usize, units: usize, rng: &mut R) -> Self {
        Self {
            kernel: Init::GlorotUniform.sample(features, units, rng),
            recurrent: orthogonal(units, rng),
            bias: Array1::zeros(units),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias: Array1::zeros(self.bias.len()),
        }
    }

    fn parameter_count(&self) -> usize {
        self.kernel.len() + self.recurrent.len() + self.bias.len()
    }

    fn pre_activation(&self, x: &Array2<f32>, h: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.kernel) + h.dot(&self.recurrent) + &self.bias
    }

    fn accumulate(&mut self, x: &Array2<f32>, h: &Array2<f32>, grad_pre: &Array2<f32>) {
        self.kernel += &x.t().dot(grad_pre);
        self.recurrent += &h.t().dot(grad_pre);
        self.bias += &grad_pre.sum_axis(Axis(0));
    }

    fn apply(&mut self, prefix: &str, grads: &GateParams, optimizer: &mut AdamOptimizer) {
        optimizer.step(&format!("{prefix}/kernel"), &mut self.kernel, &grads.kernel);
        optimizer.step(
            &format!("{prefix}/recurrent"),
            &mut self.recurrent,
            &grads.recurrent,
        );
        optimizer.step(&format!("{prefix}/bias"), &mut self.bias, &grads.bias);
    }
}

#[derive(Debug, Clone)]
pub struct GruLayer {
    name: String,
    input_size: usize,
    units: usize,
    activation: Activation,
    pub update: GateParams,
    pub reset: GateParams,
    pub candidate: GateParams,
}

/// Gradients for the three gates, same layout as the layer parameters.
#[derive(Debug, Clone)]
pub struct GruGradients {
    pub update: GateParams,
    pub reset: GateParams,
    pub candidate: GateParams,
}

#[derive(Debug, Clone)]
struct Gates {
    z: Array2<f32>,
    r: Array2<f32>,
    candidate_pre: Array2<f32>,
    candidate: Array2<f32>,
}

#[derive(Debug, Clone)]
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    gates: Gates,
}

/// Per-step activations recorded by [`GruLayer::forward_cached`].
#[derive(Debug, Clone)]
pub struct GruCache {
    steps: Vec<StepCache>,
}

impl GruLayer {
    pub fn new<R: Rng + ?Sized>(
        name: impl Into<String>,
        input_size: usize,
        units: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        Self {
            name: name.into(),
            input_size,
            units,
            activation,
            update: GateParams::new(input_size, units, rng),
            reset: GateParams::new(input_size, units, rng),
            candidate: GateParams::new(input_size, units, rng),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn parameter_count(&self) -> usize {
        self.update.parameter_count()
            + self.reset.parameter_count()
            + self.candidate.parameter_count()
    }

    /// Final hidden state for every sequence in the batch.
    pub fn forward(&self, input: &Array3<f32>) -> Array2<f32> {
        let (batch, steps, _) = input.dim();
        let mut h = Array2::zeros((batch, self.units));
        for t in 0..steps {
            let x = input.slice(s![.., t, ..]).to_owned();
            h = self.step(&x, &h).0;
        }
        h
    }

    pub fn forward_cached(&self, input: &Array3<f32>) -> (Array2<f32>, GruCache) {
        let (batch, steps, _) = input.dim();
        let mut h = Array2::zeros((batch, self.units));
        let mut cache = GruCache {
            steps: Vec::with_capacity(steps),
        };
        for t in 0..steps {
            let x = input.slice(s![.., t, ..]).to_owned();
            let (h_next, gates) = self.step(&x, &h);
            cache.steps.push(StepCache {
                x,
                h_prev: std::mem::replace(&mut h, h_next),
                gates,
            });
        }
        (h, cache)
    }

    fn step(&self, x: &Array2<f32>, h: &Array2<f32>) -> (Array2<f32>, Gates) {
        let z = self.update.pre_activation(x, h).mapv(sigmoid);
        let r = self.reset.pre_activation(x, h).mapv(sigmoid);
        let gated = &r * h;
        let candidate_pre = self.candidate.pre_activation(x, &gated);
        let candidate = self.activation.apply(&candidate_pre);
        let h_next = &z * h + &(z.mapv(|v| 1.0 - v) * &candidate);
        let gates = Gates {
            z,
            r,
            candidate_pre,
            candidate,
        };
        (h_next, gates)
    }

    /// Backpropagation through time from the gradient on the final state.
    pub fn backward(&self, cache: &GruCache, grad_final: &Array2<f32>) -> GruGradients {
        let mut grads = GruGradients {
            update: self.update.zeros_like(),
            reset: self.reset.zeros_like(),
            candidate: self.candidate.zeros_like(),
        };
        let mut dh = grad_final.clone();

        for step in cache.steps.iter().rev() {
            let Gates {
                z,
                r,
                candidate_pre,
                candidate,
            } = &step.gates;
            let one_minus_z = z.mapv(|v| 1.0 - v);
            let dz = &dh * &(&step.h_prev - candidate);
            let d_candidate = &dh * &one_minus_z;
            let mut dh_prev = &dh * z;

            let d_candidate_pre = self
                .activation
                .backward(candidate_pre, candidate, &d_candidate);
            let gated = r * &step.h_prev;
            grads
                .candidate
                .accumulate(&step.x, &gated, &d_candidate_pre);
            let d_gated = d_candidate_pre.dot(&self.candidate.recurrent.t());
            let dr = &d_gated * &step.h_prev;
            dh_prev += &(&d_gated * r);

            let dz_pre = &dz * &(z * &one_minus_z);
            let dr_pre = &dr * &r.mapv(|v| v * (1.0 - v));
            grads.update.accumulate(&step.x, &step.h_prev, &dz_pre);
            grads.reset.accumulate(&step.x, &step.h_prev, &dr_pre);
            dh_prev += &dz_pre.dot(&self.update.recurrent.t());
            dh_prev += &dr_pre.dot(&self.reset.recurrent.t());

            dh = dh_prev;
        }

        grads
    }

    pub fn apply_gradients(&mut self, grads: &GruGradients, optimizer: &mut AdamOptimizer) {
        let name = self.name.clone();
        self.update
            .apply(&format!("{name}/update"), &grads.update, optimizer);
        self.reset.apply(&format!("{name}/reset"), &grads.reset, optimizer);
        self.candidate
            .apply(&format!("{name}/candidate"), &grads.candidate, optimizer);
    }
}

/// Square orthogonal matrix from Gram-Schmidt on a Gaussian sample.
fn orthogonal<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Array2<f32> {
    let mut q: Array2<f32> = Array2::from_shape_simple_fn((n, n), || rng.sample(StandardNormal));
    for i in 0..n {
        for j in 0..i {
            let projection = q.row(i).dot(&q.row(j));
            let basis = q.row(j).to_owned();
            q.row_mut(i).scaled_add(-projection, &basis);
        }
        let norm = q.row(i).dot(&q.row(i)).sqrt();
        if norm > f32::EPSILON {
            q.row_mut(i).mapv_inplace(|v| v / norm);
        } else {
            // Degenerate draw: fall back to the unit vector.
            q.row_mut(i).fill(0.0);
            q[[i, i]] = 1.0;
        }
    }
    q
}
