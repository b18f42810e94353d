pub mod batch;
pub mod dataset;
pub mod features;
pub mod npy;

pub use batch::{Batch, BatchIter};
pub use dataset::{balanced_class_weights, Example, Labels, OnsetDataset};
pub use features::{Features, MappedNpy};
pub use npy::{load_channel_first, load_interleaved, load_npy, load_splits, load_test, DataPaths, Splits};
