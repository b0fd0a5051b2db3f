//! Element-wise activations and their derivatives.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Axis};
use serde::Serialize;

use crate::error::Error;

/// Activation applied after an affine map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
    /// Row-wise softmax; only valid on an output layer.
    Softmax,
}

impl Activation {
    /// Applies the activation to a `(batch, units)` pre-activation.
    pub fn apply(self, pre: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Linear => pre.clone(),
            Activation::Relu => pre.mapv(|v| v.max(0.0)),
            Activation::Tanh => pre.mapv(f32::tanh),
            Activation::Sigmoid => pre.mapv(sigmoid),
            Activation::Softmax => softmax_rows(pre),
        }
    }

    /// Chain rule through the activation.
    ///
    /// `pre` is the pre-activation, `out` the activation output and
    /// `grad_out` the gradient with respect to `out`.
    pub fn backward(
        self,
        pre: &Array2<f32>,
        out: &Array2<f32>,
        grad_out: &Array2<f32>,
    ) -> Array2<f32> {
        match self {
            Activation::Linear => grad_out.clone(),
            Activation::Relu => {
                let mut grad = grad_out.clone();
                ndarray::Zip::from(&mut grad).and(pre).for_each(|g, &p| {
                    if p <= 0.0 {
                        *g = 0.0;
                    }
                });
                grad
            }
            Activation::Tanh => grad_out * &out.mapv(|y| 1.0 - y * y),
            Activation::Sigmoid => grad_out * &out.mapv(|y| y * (1.0 - y)),
            Activation::Softmax => {
                // dz_i = p_i * (g_i - sum_j p_j g_j)
                let dot = (out * grad_out).sum_axis(Axis(1)).insert_axis(Axis(1));
                out * &(grad_out - &dot)
            }
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Linear => "linear",
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::Sigmoid => "sigmoid",
            Activation::Softmax => "softmax",
        };
        f.write_str(name)
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Activation::Linear),
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "sigmoid" => Ok(Activation::Sigmoid),
            "softmax" => Ok(Activation::Softmax),
            other => Err(Error::config(format!("unknown activation '{other}'"))),
        }
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax over each row.
pub fn softmax_rows(pre: &Array2<f32>) -> Array2<f32> {
    let mut out = pre.clone();
    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn softmax_rows_sum_to_one() {
        let pre = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, -1000.0]];
        let out = Activation::Softmax.apply(&pre);
        for row in out.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|v| v.is_finite() && *v >= 0.0));
        }
        assert!((out[[1, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn relu_blocks_negative_gradient() {
        let pre = array![[-1.0, 0.5]];
        let out = Activation::Relu.apply(&pre);
        let grad = Activation::Relu.backward(&pre, &out, &array![[3.0, 3.0]]);
        assert_eq!(grad, array![[0.0f32, 3.0]]);
    }

    #[test]
    fn softmax_backward_matches_finite_difference() {
        let pre = array![[0.2, -0.4, 1.1]];
        let weights = array![[0.3, -1.2, 0.7]];
        let loss = |p: &Array2<f32>| (&Activation::Softmax.apply(p) * &weights).sum();

        let out = Activation::Softmax.apply(&pre);
        let analytic = Activation::Softmax.backward(&pre, &out, &weights);

        let eps = 1e-3;
        for j in 0..3 {
            let mut plus = pre.clone();
            plus[[0, j]] += eps;
            let mut minus = pre.clone();
            minus[[0, j]] -= eps;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
            assert!((numeric - analytic[[0, j]]).abs() < 1e-3);
        }
    }

    #[test]
    fn parses_names() {
        assert_eq!("ReLU".parse::<Activation>().unwrap(), Activation::Relu);
        assert_eq!("softmax".parse::<Activation>().unwrap(), Activation::Softmax);
        assert!("gelu".parse::<Activation>().is_err());
    }
}
