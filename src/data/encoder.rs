//! One-hot label encoding.

use ndarray::{Array2, Array3};

use super::loader::Split;
use crate::error::{Error, Result};
use crate::neural::argmax;

/// Maps integer labels to indicator rows.
///
/// Columns follow the sorted set of categories seen by [`OneHotEncoder::fit`].
/// The same fitted encoder must be used for every split so a column always
/// means the same class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotEncoder {
    categories: Vec<usize>,
}

/// A split with its labels in both integer and one-hot form.
#[derive(Debug, Clone)]
pub struct EncodedSplit {
    pub features: Array3<f32>,
    pub one_hot: Array2<f32>,
    pub labels: Vec<usize>,
}

impl EncodedSplit {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl OneHotEncoder {
    pub fn fit(labels: &[usize]) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::data("cannot fit a one-hot encoder on no labels"));
        }
        let mut categories = labels.to_vec();
        categories.sort_unstable();
        categories.dedup();
        Ok(Self { categories })
    }

    pub fn fit_transform(labels: &[usize]) -> Result<(Self, Array2<f32>)> {
        let encoder = Self::fit(labels)?;
        let encoded = encoder.transform(labels)?;
        Ok((encoder, encoded))
    }

    pub fn categories(&self) -> &[usize] {
        &self.categories
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Encodes labels with the fitted categories. A label the encoder has
    /// not seen is an error.
    pub fn transform(&self, labels: &[usize]) -> Result<Array2<f32>> {
        let mut encoded = Array2::zeros((labels.len(), self.categories.len()));
        for (row, label) in labels.iter().enumerate() {
            let column = self.categories.binary_search(label).map_err(|_| {
                Error::data(format!(
                    "label {label} was not seen when fitting (known: {:?})",
                    self.categories
                ))
            })?;
            encoded[[row, column]] = 1.0;
        }
        Ok(encoded)
    }

    /// Recovers the category of each row from its largest entry.
    pub fn inverse_transform(&self, encoded: &Array2<f32>) -> Result<Vec<usize>> {
        if encoded.ncols() != self.categories.len() {
            return Err(Error::data(format!(
                "expected {} columns, found {}",
                self.categories.len(),
                encoded.ncols()
            )));
        }
        Ok(encoded
            .rows()
            .into_iter()
            .map(|row| self.categories[argmax(row)])
            .collect())
    }

    pub fn encode_split(&self, split: Split) -> Result<EncodedSplit> {
        let one_hot = self.transform(&split.labels)?;
        Ok(EncodedSplit {
            features: split.features,
            one_hot,
            labels: split.labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn encodes_sorted_categories() {
        let (encoder, encoded) = OneHotEncoder::fit_transform(&[2, 0, 1, 2]).unwrap();
        assert_eq!(encoder.categories(), &[0, 1, 2]);
        assert_eq!(
            encoded,
            array![
                [0.0f32, 0.0, 1.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0]
            ]
        );
    }

    #[test]
    fn reuses_train_columns_for_test_labels() {
        let encoder = OneHotEncoder::fit(&[0, 1, 2, 3, 4]).unwrap();
        // A test split holding only classes 3 and 1 must keep the train columns.
        let encoded = encoder.transform(&[3, 1]).unwrap();
        assert_eq!(encoded.ncols(), 5);
        assert_eq!(encoded[[0, 3]], 1.0);
        assert_eq!(encoded[[1, 1]], 1.0);
    }

    #[test]
    fn round_trips_through_argmax() {
        let labels = vec![4, 0, 3, 3, 1, 2];
        let (encoder, encoded) = OneHotEncoder::fit_transform(&labels).unwrap();
        assert_eq!(encoder.inverse_transform(&encoded).unwrap(), labels);
    }

    #[test]
    fn unseen_label_is_an_error() {
        let encoder = OneHotEncoder::fit(&[0, 1]).unwrap();
        assert!(encoder.transform(&[2]).is_err());
    }

    #[test]
    fn empty_fit_is_an_error() {
        assert!(OneHotEncoder::fit(&[]).is_err());
    }
}
