//! Exhaustive grid search.

use crate::data::TrainTestSplit;
use crate::error::MlError;
use crate::eval::{CrossValidation, Scoring};
use crate::models::ModelSpec;
use crate::search::params::{ParamGrid, format_params, grid_combinations};
use crate::search::result::{
    SearchResult, SearchStrategy, evaluate_candidates, finish, refit_and_score,
};
use ndarray::Array2;
use std::time::Instant;

/// Evaluates every combination of a fixed grid.
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub spec: ModelSpec,
    pub grid: ParamGrid,
    pub cv: CrossValidation,
    pub scoring: Scoring,
    /// Seed handed to every model built during the search.
    pub seed: u64,
    /// Refit the best candidate on all training rows (see `fit_split`).
    pub refit: bool,
}

impl GridSearch {
    pub fn new(spec: ModelSpec, grid: ParamGrid) -> Self {
        Self {
            spec,
            grid,
            cv: CrossValidation::default(),
            scoring: Scoring::default(),
            seed: 0,
            refit: true,
        }
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

    /// Cross-validate the whole grid on `x`, `y`.
    pub fn fit(&self, x: &Array2<f64>, y: &[usize]) -> Result<SearchResult, MlError> {
        self.spec.check_param_names(self.grid.keys())?;
        let candidates = grid_combinations(&self.grid)?;
        tracing::info!(
            model = %self.spec.family,
            candidates = candidates.len(),
            folds = self.cv.n_folds,
            "starting grid search"
        );

        let started = Instant::now();
        let evaluated = evaluate_candidates(
            &self.spec,
            candidates,
            x,
            y,
            &self.cv,
            self.scoring,
            self.seed,
        )?;
        let result = finish(
            SearchStrategy::Grid,
            self.spec.family,
            self.scoring,
            evaluated,
            started,
        )?;
        tracing::info!(
            best = %format_params(&result.best_params),
            score = result.best_score,
            failed = result.n_failed(),
            "grid search finished"
        );
        Ok(result)
    }

    /// Search on the training side of `split`; with `refit`, also score the
    /// best candidate on the test side.
    pub fn fit_split(&self, split: &TrainTestSplit) -> Result<SearchResult, MlError> {
        let mut result = self.fit(&split.x_train, &split.y_train)?;
        if self.refit {
            result.test_score = Some(refit_and_score(
                &self.spec,
                &result.best_params,
                (&split.x_train, &split.y_train),
                (&split.x_test, &split.y_test),
                self.scoring,
                self.seed,
            )?);
        }
        Ok(result)
    }
}
