//! Scoring and cross-validation.

pub mod cv;
pub mod metrics;

pub use cv::{CrossValidation, CrossValidationResult, Fold, cross_val_score};
pub use metrics::{Scoring, accuracy, confusion_matrix};
