//! # hypertune-ml: estimators, cross-validation and hyperparameter search
//!
//! This crate walks through three ways of tuning a classifier on a tabular
//! binary classification dataset:
//! 1. **Manual search**: sweep one hyperparameter over a hand-picked list
//! 2. **Grid search**: evaluate every combination of a small fixed grid
//! 3. **Randomized search**: evaluate a fixed number of sampled combinations
//!
//! Every step is deterministic for a given seed. [`tutorial::run_tutorial`]
//! runs them in order and fingerprints the results.

// Foundation
pub mod config;
pub mod error;
pub mod reproducibility;

// Data
pub mod data;
pub mod preprocessing;

// Estimators and evaluation
pub mod eval;
pub mod models;

// Search
pub mod search;
pub mod tutorial;

// Re-exports
pub use config::{ConfigOverrides, HypertuneConfig, load_config};
pub use data::{Dataset, TrainTestSplit, train_test_split};
pub use error::MlError;
pub use eval::{CrossValidation, Scoring};
pub use models::{Classifier, ModelFamily, ModelSpec};
pub use search::{GridSearch, ManualSweep, ParamValue, RandomizedSearch, SearchResult, SweepResult};
pub use tutorial::{TutorialReport, run_tutorial, run_verified};
