//! Loading per-class feature files.
//!
//! Each `.npy` file holds a stack of examples for a single class. The class
//! index of a file is its position in the path list.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use ndarray::{concatenate, Array3, ArrayD, Axis};
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use serde_json::json;

use crate::error::{Error, Result};
use crate::logging;

/// Features and parallel integer labels of one split.
#[derive(Debug, Clone)]
pub struct Split {
    /// `(examples, sequence_length, feature_dim)`
    pub features: Array3<f32>,
    pub labels: Vec<usize>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(sequence_length, feature_dim)` of one example.
    pub fn example_shape(&self) -> (usize, usize) {
        let (_, steps, features) = self.features.dim();
        (steps, features)
    }

    /// Number of examples per class index.
    pub fn class_counts(&self, class_count: usize) -> Vec<usize> {
        let mut counts = vec![0; class_count];
        for &label in &self.labels {
            if let Some(count) = counts.get_mut(label) {
                *count += 1;
            }
        }
        counts
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: Split,
    pub test: Split,
}

/// Reads one feature file as `(examples, sequence_length, feature_dim)`.
///
/// `f32` and `f64` files are accepted. Trailing axes beyond the second are
/// flattened into the feature dimension; a rank-2 file gets a feature
/// dimension of one.
pub fn load_feature_file<P: AsRef<Path>>(path: P) -> Result<Array3<f32>> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|err| Error::data(format!("cannot read {}: {err}", path.display())))?;

    let array = match ArrayD::<f32>::read_npy(Cursor::new(&bytes)) {
        Ok(array) => array,
        Err(ReadNpyError::WrongDescriptor(_)) => {
            ArrayD::<f64>::read_npy(Cursor::new(&bytes))?.mapv(|v| v as f32)
        }
        Err(err) => return Err(err.into()),
    };

    into_sequences(array).map_err(|err| match err {
        Error::Data { message } => Error::data(format!("{}: {message}", path.display())),
        other => other,
    })
}

fn into_sequences(array: ArrayD<f32>) -> Result<Array3<f32>> {
    let shape = array.shape().to_vec();
    if shape.len() < 2 {
        return Err(Error::data(format!(
            "expected at least 2 dimensions, found shape {shape:?}"
        )));
    }
    let examples = shape[0];
    let steps = shape[1];
    let features: usize = shape[2..].iter().product();

    let standard = array.as_standard_layout().into_owned();
    Ok(standard.into_shape((examples, steps, features))?)
}

/// Loads one file per class and labels every example with its file's
/// position in `paths`.
pub fn load_split<P: AsRef<Path>>(paths: &[P]) -> Result<Split> {
    if paths.is_empty() {
        return Err(Error::data("no feature files given"));
    }

    let mut blocks = Vec::with_capacity(paths.len());
    let mut labels = Vec::new();
    let mut expected: Option<(usize, usize)> = None;

    for (class, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let block = load_feature_file(path)?;
        let (examples, steps, features) = block.dim();

        match expected {
            None => expected = Some((steps, features)),
            Some(shape) if shape != (steps, features) => {
                return Err(Error::data(format!(
                    "{} holds examples of shape ({steps}, {features}), expected {shape:?}",
                    path.display()
                )));
            }
            Some(_) => {}
        }

        logging::record(
            "dataset_file_loaded",
            &json!({
                "path": path.display().to_string(),
                "class": class,
                "examples": examples,
                "shape": [steps, features],
            }),
        );

        labels.extend(std::iter::repeat(class).take(examples));
        blocks.push(block);
    }

    let views: Vec<_> = blocks.iter().map(|block| block.view()).collect();
    let features = concatenate(Axis(0), &views)?;

    Ok(Split { features, labels })
}

/// Loads the train and test splits; both must list the same classes in the
/// same order and share one example shape.
pub fn load_dataset<P: AsRef<Path>>(train_paths: &[P], test_paths: &[P]) -> Result<Dataset> {
    if train_paths.len() != test_paths.len() {
        return Err(Error::data(format!(
            "{} train files but {} test files",
            train_paths.len(),
            test_paths.len()
        )));
    }

    let train = load_split(train_paths)?;
    let test = load_split(test_paths)?;
    if train.example_shape() != test.example_shape() {
        return Err(Error::data(format!(
            "train examples have shape {:?} but test examples have shape {:?}",
            train.example_shape(),
            test.example_shape()
        )));
    }

    logging::record(
        "dataset_ready",
        &json!({
            "train_examples": train.len(),
            "test_examples": test.len(),
            "example_shape": train.example_shape(),
            "classes": train_paths.len(),
        }),
    );

    Ok(Dataset { train, test })
}
