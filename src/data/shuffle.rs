//! Joint permutation of features and labels.

use ndarray::Axis;
use rand::seq::SliceRandom;
use rand::Rng;

use super::encoder::EncodedSplit;

/// Uniformly random ordering of `0..len`.
pub fn permutation<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
}

/// Reorders features, one-hot rows and labels by the same index list.
pub fn apply_permutation(split: &EncodedSplit, order: &[usize]) -> EncodedSplit {
    EncodedSplit {
        features: split.features.select(Axis(0), order),
        one_hot: split.one_hot.select(Axis(0), order),
        labels: order.iter().map(|&i| split.labels[i]).collect(),
    }
}

/// Shuffles a split with one random permutation, keeping every feature row
/// paired with its labels.
pub fn shuffle_split<R: Rng + ?Sized>(split: &EncodedSplit, rng: &mut R) -> EncodedSplit {
    let order = permutation(split.len(), rng);
    apply_permutation(split, &order)
}
