//! Error types for the food classifier pipeline.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a training run.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be parsed or holds an invalid value.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Input data is missing, malformed or inconsistent.
    #[error("Data error: {message}")]
    Data {
        /// Description of the data problem
        message: String,
    },

    /// The model architecture cannot be built or applied to the input.
    #[error("Model error: {message}")]
    Model {
        /// Description of the model problem
        message: String,
    },

    /// Fitting was requested with arguments it cannot honour.
    #[error("Training error: {message}")]
    Training {
        /// Description of the training problem
        message: String,
    },

    /// A chart could not be rendered.
    #[error("Plot error: {message}")]
    Plot {
        /// Message from the drawing backend
        message: String,
    },

    /// Reading a `.npy` file failed.
    #[error("NumPy read error: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),

    /// An array could not be reshaped.
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// TOML parse failure.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a data error
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training(message: impl Into<String>) -> Self {
        Self::Training {
            message: message.into(),
        }
    }

    /// Create a plot error
    pub fn plot(message: impl Into<String>) -> Self {
        Self::Plot {
            message: message.into(),
        }
    }

    /// Short category name, used as the `kind` of logged failures.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Config { .. } => "configuration",
            Error::Data { .. } => "data",
            Error::Model { .. } => "model",
            Error::Training { .. } => "training",
            Error::Plot { .. } => "plot",
            Error::Npy(_) => "npy",
            Error::Shape(_) => "shape",
            Error::Toml(_) => "toml",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
        }
    }
}
