//! # Food GRU
//!
//! Trains a small recurrent classifier on pre-extracted image features of
//! five food classes. Each example is a `(sequence_length, feature_dim)`
//! matrix stored in NumPy `.npy` files, one file per class and split.
//!
//! ## Quick Start
//!
//! ```rust
//! use food_gru::{GruClassifier, ModelConfig};
//! use ndarray::Array3;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let model = GruClassifier::build(&ModelConfig::default(), (20, 8), 5, &mut rng).unwrap();
//!
//! let batch = Array3::<f32>::zeros((4, 20, 8));
//! let probabilities = model.forward(&batch).unwrap();
//! assert_eq!(probabilities.dim(), (4, 5));
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Pipeline configuration via TOML
//! - [`data`] - `.npy` loading, one-hot encoding and shuffling
//! - [`neural`] - GRU, dense layers and the Adam optimizer
//! - [`training`] - Fit loop, callbacks and metric history
//! - [`evaluation`] - Test metrics, predictions and confusion matrices
//! - [`plot`] - SVG charts
//! - [`pipeline`] - The end-to-end training run
//! - [`logging`] - JSON line-delimited logging

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod neural;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod training;

pub use config::{DataConfig, FitConfig, FoodConfig, ModelConfig, OutputConfig};
pub use data::{Dataset, EncodedSplit, OneHotEncoder, Split};
pub use error::{Error, Result};
pub use evaluation::{evaluate, predict, ConfusionMatrix, Evaluation};
pub use neural::{AdamOptimizer, GruClassifier};
pub use training::{fit, FitReport, Granularity, TrainingCallback, TrainingHistory};
