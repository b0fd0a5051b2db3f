//! Dataset loading, label encoding and shuffling.

pub mod encoder;
pub mod loader;
pub mod shuffle;

pub use encoder::{EncodedSplit, OneHotEncoder};
pub use loader::{load_dataset, load_feature_file, load_split, Dataset, Split};
pub use shuffle::{apply_permutation, permutation, shuffle_split};
