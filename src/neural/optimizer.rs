//! Adam optimizer keyed by parameter name.

use std::collections::HashMap;

use ndarray::{Array, ArrayD, Dimension, Zip};

/// Adam with bias-corrected step size.
///
/// Moment estimates are stored per parameter name, so every layer passes a
/// stable key such as `"gru/w_z"` to [`AdamOptimizer::step`]. Call
/// [`AdamOptimizer::begin_iteration`] once per batch before updating.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    iteration: i32,
    moments: HashMap<String, (ArrayD<f32>, ArrayD<f32>)>,
}

impl AdamOptimizer {
    pub fn new(learning_rate: f32) -> Self {
        Self::with_params(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn with_params(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            iteration: 0,
            moments: HashMap::new(),
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Number of completed iterations.
    pub fn iterations(&self) -> i32 {
        self.iteration
    }

    pub fn begin_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Updates `param` in place from `grad`.
    pub fn step<D: Dimension>(&mut self, key: &str, param: &mut Array<f32, D>, grad: &Array<f32, D>) {
        let t = self.iteration.max(1);
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt()
            / (1.0 - self.beta1.powi(t));
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        let (m, v) = self.moments.entry(key.to_string()).or_insert_with(|| {
            (
                ArrayD::zeros(param.raw_dim().into_dyn()),
                ArrayD::zeros(param.raw_dim().into_dyn()),
            )
        });

        let mut param = param.view_mut().into_dyn();
        let grad = grad.view().into_dyn();
        Zip::from(&mut param)
            .and(m)
            .and(v)
            .and(&grad)
            .for_each(|p, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *p -= lr_t * *m / (v.sqrt() + epsilon);
            });
    }

    pub fn reset(&mut self) {
        self.iteration = 0;
        self.moments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut optimizer = AdamOptimizer::new(0.1);
        let mut param = array![1.0f32, -1.0];
        let grad = array![0.5f32, -2.0];

        optimizer.begin_iteration();
        optimizer.step("p", &mut param, &grad);

        // Bias correction makes the first step exactly lr * sign(g).
        assert!((param[0] - 0.9).abs() < 1e-5);
        assert!((param[1] + 0.9).abs() < 1e-5);
    }

    #[test]
    fn minimises_quadratic() {
        let mut optimizer = AdamOptimizer::new(0.05);
        let mut param = Array1::from_elem(3, 4.0f32);
        for _ in 0..500 {
            let grad = param.mapv(|p| 2.0 * p);
            optimizer.begin_iteration();
            optimizer.step("p", &mut param, &grad);
        }
        assert!(param.iter().all(|p| p.abs() < 0.05));
    }

    #[test]
    fn keys_keep_independent_moments() {
        let mut optimizer = AdamOptimizer::new(0.1);
        let mut a = array![[1.0f32]];
        let mut b = array![[1.0f32]];
        optimizer.begin_iteration();
        optimizer.step("a", &mut a, &array![[1.0f32]]);
        optimizer.step("b", &mut b, &array![[-1.0f32]]);
        assert!(a[[0, 0]] < 1.0);
        assert!(b[[0, 0]] > 1.0);
        assert_eq!(optimizer.iterations(), 1);
    }
}
