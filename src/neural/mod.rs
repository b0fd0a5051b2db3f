//! Recurrent classifier built natively on `ndarray`.
//!
//! The model stacks a [`GruLayer`] returning its final state, a ReLU
//! [`DenseLayer`], inverted [`Dropout`] and a softmax output layer, trained
//! with [`AdamOptimizer`] against a mean squared error loss.

pub mod activation;
pub mod dense;
pub mod gru;
pub mod loss;
pub mod network;
pub mod optimizer;

pub use activation::Activation;
pub use dense::{DenseLayer, Dropout, Init};
pub use gru::GruLayer;
pub use loss::{argmax, categorical_accuracy, mse_loss};
pub use network::{GruClassifier, StepMetrics};
pub use optimizer::AdamOptimizer;
