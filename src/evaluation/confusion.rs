//! Confusion matrix of true versus predicted classes.

use std::fmt;

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use crate::error::{Error, Result};

/// Row `i`, column `j` counts examples of true class `i` predicted as `j`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    pub fn from_predictions(
        truth: &[usize],
        predicted: &[usize],
        class_count: usize,
    ) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(Error::data(format!(
                "{} true labels but {} predictions",
                truth.len(),
                predicted.len()
            )));
        }
        let mut counts = Array2::zeros((class_count, class_count));
        for (&t, &p) in truth.iter().zip(predicted) {
            if t >= class_count || p >= class_count {
                return Err(Error::data(format!(
                    "class pair ({t}, {p}) outside 0..{class_count}"
                )));
            }
            counts[[t, p]] += 1;
        }
        Ok(Self { counts })
    }

    pub fn class_count(&self) -> usize {
        self.counts.nrows()
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Number of examples tabulated.
    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Examples per true class.
    pub fn row_sums(&self) -> Array1<usize> {
        self.counts.sum_axis(Axis(1))
    }

    /// Fraction of correctly classified examples, zero when empty.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.diag().sum() as f64 / total as f64
    }

    /// Each row divided by its sum. Rows without examples stay zero.
    pub fn normalized(&self) -> Array2<f64> {
        let mut normalized = self.counts.mapv(|c| c as f64);
        for mut row in normalized.rows_mut() {
            let sum = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|v| v / sum);
            }
        }
        normalized
    }

    /// Cell values as floats, normalised or raw.
    pub fn values(&self, normalize: bool) -> Array2<f64> {
        if normalize {
            self.normalized()
        } else {
            self.counts.mapv(|c| c as f64)
        }
    }

    /// Text dump of the normalised matrix with two decimals.
    pub fn display_normalized(&self) -> NormalizedDisplay<'_> {
        NormalizedDisplay(self)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);
        write_rows(f, self.counts.rows().into_iter().map(|row| {
            row.iter()
                .map(|c| format!("{c:>width$}"))
                .collect::<Vec<_>>()
        }))
    }
}

pub struct NormalizedDisplay<'a>(&'a ConfusionMatrix);

impl fmt::Display for NormalizedDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let normalized = self.0.normalized();
        write_rows(f, normalized.rows().into_iter().map(|row| {
            row.iter().map(|v| format!("{v:.2}")).collect::<Vec<_>>()
        }))
    }
}

fn write_rows<I>(f: &mut fmt::Formatter<'_>, rows: I) -> fmt::Result
where
    I: Iterator<Item = Vec<String>>,
{
    let rows: Vec<Vec<String>> = rows.collect();
    write!(f, "[")?;
    for (index, row) in rows.iter().enumerate() {
        if index > 0 {
            write!(f, "\n ")?;
        }
        write!(f, "[{}]", row.join(" "))?;
    }
    write!(f, "]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfusionMatrix {
        let truth = [0, 0, 0, 1, 1, 2, 2, 2, 2];
        let predicted = [0, 1, 0, 1, 1, 2, 0, 2, 2];
        ConfusionMatrix::from_predictions(&truth, &predicted, 4).unwrap()
    }

    #[test]
    fn totals_match_example_counts() {
        let cm = sample();
        assert_eq!(cm.total(), 9);
        assert_eq!(cm.row_sums().to_vec(), vec![3, 2, 4, 0]);
        assert_eq!(cm.counts()[[0, 1]], 1);
        assert_eq!(cm.counts()[[2, 0]], 1);
        assert!((cm.accuracy() - 7.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn normalized_rows_sum_to_one() {
        let cm = sample();
        let normalized = cm.normalized();
        for (row, &count) in normalized.rows().into_iter().zip(cm.row_sums().iter()) {
            if count > 0 {
                assert!((row.sum() - 1.0).abs() < 1e-12);
            } else {
                assert_eq!(row.sum(), 0.0);
            }
        }
        assert!((normalized[[0, 0]] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(ConfusionMatrix::from_predictions(&[0, 1], &[0], 2).is_err());
        assert!(ConfusionMatrix::from_predictions(&[0, 2], &[0, 1], 2).is_err());
    }

    #[test]
    fn prints_like_an_array_dump() {
        let cm = ConfusionMatrix::from_predictions(&[0, 0, 1, 1], &[0, 1, 1, 1], 2).unwrap();
        assert_eq!(cm.to_string(), "[[1 1]\n [0 2]]");
        assert_eq!(
            cm.display_normalized().to_string(),
            "[[0.50 0.50]\n [0.00 1.00]]"
        );
    }
}
