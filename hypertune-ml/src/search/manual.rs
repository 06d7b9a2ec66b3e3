//! Manual search: one hyperparameter swept over a hand-picked list.

use crate::error::MlError;
use crate::eval::{CrossValidation, CrossValidationResult, Scoring, cross_val_score};
use crate::models::{ModelFamily, ModelSpec};
use crate::search::params::{ParamSet, ParamValue};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct ManualSweep {
    pub spec: ModelSpec,
    pub param: String,
    pub values: Vec<ParamValue>,
    /// Held fixed for every point; `param` overrides any entry of the same name.
    pub base_params: ParamSet,
    pub cv: CrossValidation,
    pub scoring: Scoring,
    pub seed: u64,
}

/// Scores of a sweep, in the order the values were given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub param: String,
    pub model: ModelFamily,
    pub scoring: Scoring,
    pub points: Vec<SweepPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: ParamValue,
    pub cv: CrossValidationResult,
}

impl SweepPoint {
    pub fn mean_score(&self) -> f64 {
        self.cv.mean_score
    }
}

impl SweepResult {
    /// Highest mean score; the first such point wins ties.
    pub fn best(&self) -> Option<&SweepPoint> {
        self.points.iter().fold(None, |best: Option<&SweepPoint>, p| match best {
            Some(b) if b.mean_score() >= p.mean_score() => best,
            _ => Some(p),
        })
    }

    pub fn mean_scores(&self) -> Vec<f64> {
        self.points.iter().map(SweepPoint::mean_score).collect()
    }
}

impl ManualSweep {
    pub fn new(spec: ModelSpec, param: impl Into<String>, values: Vec<ParamValue>) -> Self {
        Self {
            spec,
            param: param.into(),
            values,
            base_params: ParamSet::new(),
            cv: CrossValidation::default(),
            scoring: Scoring::default(),
            seed: 0,
        }
    }

    pub fn with_base_params(mut self, base_params: ParamSet) -> Self {
        self.base_params = base_params;
        self
    }

    pub fn with_cv(mut self, cv: CrossValidation) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cross-validate every value. Any failure aborts the sweep.
    pub fn run(&self, x: &Array2<f64>, y: &[usize]) -> Result<SweepResult, MlError> {
        if self.values.is_empty() {
            return Err(MlError::invalid_input(format!(
                "no values given to sweep '{}'",
                self.param
            )));
        }
        self.spec
            .check_param_names(self.base_params.keys().chain(std::iter::once(&self.param)))?;

        tracing::info!(
            model = %self.spec.family,
            param = %self.param,
            values = self.values.len(),
            "starting manual sweep"
        );

        let mut points = Vec::with_capacity(self.values.len());
        for value in &self.values {
            let mut params = self.base_params.clone();
            params.insert(self.param.clone(), value.clone());
            let cv = cross_val_score(&self.spec, &params, x, y, &self.cv, self.scoring, self.seed)
                .map_err(|e| match e {
                    e @ MlError::InvalidInput(_) => e,
                    other => MlError::search(format!("{} = {value}: {other}", self.param)),
                })?;
            tracing::debug!(param = %self.param, %value, mean = cv.mean_score, "sweep point");
            points.push(SweepPoint {
                value: value.clone(),
                cv,
            });
        }

        Ok(SweepResult {
            param: self.param.clone(),
            model: self.spec.family,
            scoring: self.scoring,
            points,
        })
    }
}
