//! Pipeline configuration via TOML files.
//!
//! Every key is optional; anything missing falls back to the values the
//! food classifier was originally tuned with.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::value::Table;
use toml::Value;

use crate::error::{Error, Result};
use crate::neural::Activation;

const CLASS_STEMS: [&str; 5] = [
    "chicken_curry",
    "french_fries",
    "pizza",
    "macarons",
    "miso_soup",
];
const CLASS_NAMES: [&str; 5] = [
    "chicken curry",
    "french fries",
    "pizza",
    "macarons",
    "miso soup",
];

/// Full pipeline configuration loaded from a TOML file.
///
/// # Examples
///
/// ```
/// use food_gru::FoodConfig;
///
/// let config = FoodConfig::load_from_file("config/food_gru.toml")
///     .unwrap_or_else(|_| FoodConfig::default());
///
/// println!("Training for {} epochs", config.training.epochs);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct FoodConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub training: FitConfig,
    pub output: OutputConfig,
    /// Seed for weight initialisation, shuffling and dropout masks
    pub seed: u64,
}

/// Input files and class names, one entry per class in label order.
#[derive(Debug, Clone, Serialize)]
pub struct DataConfig {
    pub train_files: Vec<PathBuf>,
    pub test_files: Vec<PathBuf>,
    pub class_names: Vec<String>,
}

/// Layer widths and regularisation of the recurrent classifier.
#[derive(Debug, Clone, Serialize)]
pub struct ModelConfig {
    /// Hidden width of the GRU layer
    pub gru_units: usize,
    /// Width of the fully connected hidden layer
    pub dense_units: usize,
    /// Dropout rate applied after the hidden layer while training
    pub dropout: f32,
    /// Activation of the GRU candidate state
    pub gru_activation: Activation,
}

/// Hyperparameters of the fit loop.
#[derive(Debug, Clone, Serialize)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Fraction of the training rows held out for validation
    pub validation_split: f32,
    /// Reshuffle the training rows at the start of every epoch
    pub shuffle: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputConfig {
    pub plot_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Row-normalise the confusion matrix before printing and plotting
    pub normalize_confusion: bool,
}

impl FoodConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self> {
        let value: Value = toml::from_str(toml_str)?;
        let defaults = Self::default();

        let data = section(&value, "data");
        let model = section(&value, "model");
        let training = section(&value, "training");
        let output = section(&value, "output");

        let data = DataConfig {
            train_files: path_list(&data, "train_files")
                .unwrap_or(defaults.data.train_files),
            test_files: path_list(&data, "test_files").unwrap_or(defaults.data.test_files),
            class_names: string_list(&data, "class_names")
                .unwrap_or(defaults.data.class_names),
        };

        let gru_activation = match model.get("gru_activation").and_then(|v| v.as_str()) {
            Some(name) => name.parse()?,
            None => defaults.model.gru_activation,
        };
        let model = ModelConfig {
            gru_units: usize_value(&model, "gru_units", defaults.model.gru_units)?,
            dense_units: usize_value(&model, "dense_units", defaults.model.dense_units)?,
            dropout: float_value(&model, "dropout")
                .unwrap_or(defaults.model.dropout)
                .clamp(0.0, 0.95),
            gru_activation,
        };

        let seed = training
            .get("seed")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(0) as u64)
            .unwrap_or(defaults.seed);
        let training = FitConfig {
            epochs: usize_value(&training, "epochs", defaults.training.epochs)?.max(1),
            batch_size: usize_value(&training, "batch_size", defaults.training.batch_size)?
                .max(1),
            learning_rate: float_value(&training, "learning_rate")
                .unwrap_or(defaults.training.learning_rate),
            validation_split: float_value(&training, "validation_split")
                .unwrap_or(defaults.training.validation_split)
                .clamp(0.0, 0.95),
            shuffle: training
                .get("shuffle")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.training.shuffle),
        };

        let output = OutputConfig {
            plot_dir: output
                .get("plot_dir")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(defaults.output.plot_dir),
            log_dir: output
                .get("log_dir")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(defaults.output.log_dir),
            normalize_confusion: output
                .get("normalize_confusion")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.output.normalize_confusion),
        };

        let config = Self {
            data,
            model,
            training,
            output,
            seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the per-class lists line up.
    pub fn validate(&self) -> Result<()> {
        let classes = self.data.class_names.len();
        if classes == 0 {
            return Err(Error::config("at least one class is required"));
        }
        if self.data.train_files.len() != classes || self.data.test_files.len() != classes {
            return Err(Error::config(format!(
                "expected {classes} train and test files, found {} and {}",
                self.data.train_files.len(),
                self.data.test_files.len()
            )));
        }
        if self.training.learning_rate <= 0.0 || !self.training.learning_rate.is_finite() {
            return Err(Error::config("learning_rate must be a positive number"));
        }
        Ok(())
    }

    pub fn class_count(&self) -> usize {
        self.data.class_names.len()
    }
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            model: ModelConfig::default(),
            training: FitConfig::default(),
            output: OutputConfig::default(),
            seed: 42,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_files: CLASS_STEMS
                .iter()
                .map(|stem| PathBuf::from(format!("Data/{stem}_train.npy")))
                .collect(),
            test_files: CLASS_STEMS
                .iter()
                .map(|stem| PathBuf::from(format!("Data/{stem}_test.npy")))
                .collect(),
            class_names: CLASS_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            gru_units: 32,
            dense_units: 64,
            dropout: 0.3,
            gru_activation: Activation::Relu,
        }
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            batch_size: 32,
            learning_rate: 1e-4,
            validation_split: 0.2,
            shuffle: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            plot_dir: PathBuf::from("plots"),
            log_dir: PathBuf::from("logs"),
            normalize_confusion: true,
        }
    }
}

fn section(value: &Value, name: &str) -> Table {
    value
        .get(name)
        .and_then(|v| v.as_table())
        .cloned()
        .unwrap_or_default()
}

fn usize_value(table: &Table, key: &str, default: usize) -> Result<usize> {
    match table.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_integer()
            .filter(|v| *v >= 0)
            .map(|v| v as usize)
            .ok_or_else(|| Error::config(format!("{key} must be a non-negative integer"))),
    }
}

fn float_value(table: &Table, key: &str) -> Option<f32> {
    table.get(key).and_then(|value| {
        if let Some(float) = value.as_float() {
            Some(float as f32)
        } else {
            value.as_integer().map(|int| int as f32)
        }
    })
}

fn string_list(table: &Table, key: &str) -> Option<Vec<String>> {
    table
        .get(key)
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|items| !items.is_empty())
}

fn path_list(table: &Table, key: &str) -> Option<Vec<PathBuf>> {
    string_list(table, key).map(|items| items.into_iter().map(PathBuf::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let config = FoodConfig::from_str("").unwrap();
        assert_eq!(config.model.gru_units, 32);
        assert_eq!(config.model.dense_units, 64);
        assert_eq!(config.training.epochs, 200);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.model.gru_activation, Activation::Relu);
        assert_eq!(config.class_count(), 5);
        assert_eq!(
            config.data.train_files[2],
            PathBuf::from("Data/pizza_train.npy")
        );
        assert_eq!(config.data.class_names[4], "miso soup");
    }

    #[test]
    fn parses_custom_values() {
        let toml = r#"
            [data]
            train_files = ["a_train.npy", "b_train.npy"]
            test_files = ["a_test.npy", "b_test.npy"]
            class_names = ["a", "b"]

            [model]
            gru_units = 8
            dense_units = 16
            dropout = 0.5
            gru_activation = "tanh"

            [training]
            epochs = 3
            batch_size = 4
            learning_rate = 0.01
            validation_split = 0.25
            shuffle = false
            seed = 7

            [output]
            plot_dir = "out"
            normalize_confusion = false
        "#;
        let config = FoodConfig::from_str(toml).unwrap();
        assert_eq!(config.class_count(), 2);
        assert_eq!(config.model.gru_units, 8);
        assert_eq!(config.model.dropout, 0.5);
        assert_eq!(config.model.gru_activation, Activation::Tanh);
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.learning_rate, 0.01);
        assert!(!config.training.shuffle);
        assert_eq!(config.seed, 7);
        assert_eq!(config.output.plot_dir, PathBuf::from("out"));
        assert_eq!(config.output.log_dir, PathBuf::from("logs"));
        assert!(!config.output.normalize_confusion);
    }

    #[test]
    fn clamps_out_of_range_fractions() {
        let toml = "[model]\ndropout = 1.5\n[training]\nvalidation_split = -0.3\nbatch_size = 0";
        let config = FoodConfig::from_str(toml).unwrap();
        assert_eq!(config.model.dropout, 0.95);
        assert_eq!(config.training.validation_split, 0.0);
        assert_eq!(config.training.batch_size, 1);
    }

    #[test]
    fn rejects_mismatched_class_lists() {
        let toml = "[data]\nclass_names = [\"only one\"]";
        let err = FoodConfig::from_str(toml).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn rejects_unknown_activation() {
        let toml = "[model]\ngru_activation = \"swish\"";
        assert!(FoodConfig::from_str(toml).is_err());
    }

    #[test]
    fn rejects_negative_widths() {
        let toml = "[model]\ngru_units = -4";
        assert!(FoodConfig::from_str(toml).is_err());
    }
}
