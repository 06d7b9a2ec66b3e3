//! Estimators: logistic regression, CART trees and random forests.

pub mod forest;
pub mod logistic;
pub mod tree;

pub use forest::{RandomForest, RandomForestConfig};
pub use logistic::{LogisticRegression, LogisticRegressionConfig, Penalty, Solver};
pub use tree::{DecisionTree, DecisionTreeConfig, MaxFeatures};

use crate::error::MlError;
use crate::preprocessing::StandardScaler;
use crate::search::params::{ParamSet, ParamValue};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fitted-or-unfitted classifier over dense numeric features.
pub trait Classifier: fmt::Debug {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), MlError>;

    /// One row per sample, one column per class seen during `fit`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError>;

    /// Most probable class per row; ties go to the lower class index.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, MlError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (i, &p)| {
                        if p > best.1 { (i, p) } else { best }
                    })
                    .0
            })
            .collect())
    }
}

/// Estimator family selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    DecisionTree,
    RandomForest,
}

impl ModelFamily {
    pub fn accepted_params(&self) -> &'static [&'static str] {
        match self {
            Self::LogisticRegression => &["C", "max_iter", "penalty", "solver", "tol"],
            Self::DecisionTree => &["max_depth", "max_features", "min_samples_split"],
            Self::RandomForest => &[
                "bootstrap",
                "max_depth",
                "max_features",
                "min_samples_split",
                "n_estimators",
            ],
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogisticRegression => write!(f, "logistic_regression"),
            Self::DecisionTree => write!(f, "decision_tree"),
            Self::RandomForest => write!(f, "random_forest"),
        }
    }
}

/// A model family plus its preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub family: ModelFamily,
    /// Standardize features (fitted on training rows only) before the model.
    #[serde(default)]
    pub standardize: bool,
}

impl ModelSpec {
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            standardize: matches!(family, ModelFamily::LogisticRegression),
        }
    }

    /// Reject parameter names the family does not know.
    pub fn check_param_names<'a>(
        &self,
        names: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), MlError> {
        let accepted = self.family.accepted_params();
        for name in names {
            if !accepted.contains(&name.as_str()) {
                return Err(MlError::invalid_input(format!(
                    "unknown parameter '{name}' for {}; accepted: {}",
                    self.family,
                    accepted.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Build an unfitted pipeline.
    ///
    /// Unknown names and badly typed values are `InvalidInput`; combinations
    /// the estimator cannot honour are `Model` errors.
    pub fn build(&self, params: &ParamSet, seed: u64) -> Result<Pipeline, MlError> {
        self.check_param_names(params.keys())?;
        let model: Box<dyn Classifier> = match self.family {
            ModelFamily::LogisticRegression => Box::new(LogisticRegression::new(
                LogisticRegressionConfig::from_params(params)?,
            )),
            ModelFamily::DecisionTree => Box::new(DecisionTree::new(
                DecisionTreeConfig::from_params(params, MaxFeatures::All)?,
                seed,
            )),
            ModelFamily::RandomForest => Box::new(RandomForest::new(
                RandomForestConfig::from_params(params)?,
                seed,
            )),
        };
        Ok(Pipeline {
            scaler: self.standardize.then(StandardScaler::new),
            model,
        })
    }
}

/// Optional standardization followed by a classifier.
#[derive(Debug)]
pub struct Pipeline {
    scaler: Option<StandardScaler>,
    model: Box<dyn Classifier>,
}

impl Classifier for Pipeline {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), MlError> {
        match &mut self.scaler {
            Some(scaler) => {
                let z = scaler.fit_transform(x)?;
                self.model.fit(&z, y)
            }
            None => self.model.fit(x, y),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        match &self.scaler {
            Some(scaler) => self.model.predict_proba(&scaler.transform(x)?),
            None => self.model.predict_proba(x),
        }
    }
}

/// Number of classes implied by a label vector, checked against `x`.
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &[usize]) -> Result<usize, MlError> {
    if x.nrows() == 0 {
        return Err(MlError::model("cannot fit on zero samples"));
    }
    if x.nrows() != y.len() {
        return Err(MlError::model(format!(
            "{} rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    Ok(y.iter().copied().max().unwrap_or(0) + 1)
}

pub(crate) fn param_f64(params: &ParamSet, name: &str, default: f64) -> Result<f64, MlError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| type_error(name, "a number", v)),
    }
}

pub(crate) fn param_usize(params: &ParamSet, name: &str, default: usize) -> Result<usize, MlError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_i64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| type_error(name, "a non-negative integer", v)),
    }
}

pub(crate) fn param_bool(params: &ParamSet, name: &str, default: bool) -> Result<bool, MlError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_bool().ok_or_else(|| type_error(name, "a boolean", v)),
    }
}

pub(crate) fn type_error(name: &str, expected: &str, got: &ParamValue) -> MlError {
    MlError::invalid_input(format!(
        "parameter '{name}' must be {expected}, got {} {got}",
        got.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug)]
    struct Fixed(Array2<f64>);

    impl Classifier for Fixed {
        fn fit(&mut self, _x: &Array2<f64>, _y: &[usize]) -> Result<(), MlError> {
            Ok(())
        }
        fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_predict_argmax_ties_to_lower_class() {
        let model = Fixed(array![[0.2, 0.8], [0.5, 0.5], [0.9, 0.1]]);
        let preds = model.predict(&array![[0.0], [0.0], [0.0]]).unwrap();
        assert_eq!(preds, vec![1, 0, 0]);
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let spec = ModelSpec::new(ModelFamily::LogisticRegression);
        let mut params = ParamSet::new();
        params.insert("n_estimators".into(), ParamValue::Int(10));
        let err = spec.build(&params, 0).unwrap_err();
        assert!(matches!(err, MlError::InvalidInput(_)));
        assert!(err.to_string().contains("n_estimators"));
    }

    #[test]
    fn test_default_standardize_per_family() {
        assert!(ModelSpec::new(ModelFamily::LogisticRegression).standardize);
        assert!(!ModelSpec::new(ModelFamily::RandomForest).standardize);
    }

    #[test]
    fn test_wrong_value_type() {
        let mut params = ParamSet::new();
        params.insert("C".into(), ParamValue::Str("big".into()));
        let err = ModelSpec::new(ModelFamily::LogisticRegression)
            .build(&params, 0)
            .unwrap_err();
        assert!(matches!(err, MlError::InvalidInput(_)));
    }

    #[test]
    fn test_family_serde_names() {
        let json = serde_json::to_string(&ModelFamily::RandomForest).unwrap();
        assert_eq!(json, "\"random_forest\"");
        assert_eq!(ModelFamily::LogisticRegression.to_string(), "logistic_regression");
    }
}
