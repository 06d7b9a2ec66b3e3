//! Data loading and partitioning.

pub mod builtin;
pub mod dataset;
pub mod split;

pub use dataset::{CsvOptions, Dataset, DatasetSummary};
pub use split::{SplitSummary, TrainTestSplit, train_test_split};
