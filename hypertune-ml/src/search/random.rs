//! Randomized search over parameter distributions.

use crate::data::TrainTestSplit;
use crate::error::MlError;
use crate::eval::{CrossValidation, Scoring};
use crate::models::ModelSpec;
use crate::search::params::{
    ParamDistribution, ParamDistributions, ParamGrid, ParamSet, format_params, grid_combinations,
};
use crate::search::result::{
    SearchResult, SearchStrategy, evaluate_candidates, finish, refit_and_score,
};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;

/// Evaluates `n_iter` sampled combinations.
///
/// When every distribution is a finite `choice`, combinations are drawn
/// without replacement from the full grid (so at most the grid size is
/// evaluated). Otherwise each combination draws every parameter
/// independently, in key order.
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    pub spec: ModelSpec,
    pub distributions: ParamDistributions,
    pub n_iter: usize,
    pub cv: CrossValidation,
    pub scoring: Scoring,
    /// Drives sampling and is handed to every model built during the search.
    pub seed: u64,
    pub refit: bool,
}

impl RandomizedSearch {
    pub fn new(spec: ModelSpec, distributions: ParamDistributions, n_iter: usize) -> Self {
        Self {
            spec,
            distributions,
            n_iter,
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

    /// Draw the candidate list. Deterministic for a given seed.
    pub fn sample_candidates(&self) -> Result<Vec<ParamSet>, MlError> {
        if self.n_iter == 0 {
            return Err(MlError::invalid_input("n_iter must be at least 1"));
        }
        self.spec.check_param_names(self.distributions.keys())?;
        for (name, dist) in &self.distributions {
            dist.validate(name)?;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);

        if self.distributions.values().all(ParamDistribution::is_choice) {
            let grid: ParamGrid = self
                .distributions
                .iter()
                .filter_map(|(name, dist)| match dist {
                    ParamDistribution::Choice { values } => Some((name.clone(), values.clone())),
                    _ => None,
                })
                .collect();
            let combos = grid_combinations(&grid)?;
            let n = self.n_iter.min(combos.len());
            if n < self.n_iter {
                tracing::warn!(
                    n_iter = self.n_iter,
                    grid_size = combos.len(),
                    "n_iter exceeds the number of distinct combinations; evaluating all of them"
                );
            }
            let picked = rand::seq::index::sample(&mut rng, combos.len(), n);
            return Ok(picked.into_iter().map(|i| combos[i].clone()).collect());
        }

        Ok((0..self.n_iter)
            .map(|_| {
                self.distributions
                    .iter()
                    .map(|(name, dist)| (name.clone(), dist.sample(&mut rng)))
                    .collect()
            })
            .collect())
    }

    pub fn fit(&self, x: &Array2<f64>, y: &[usize]) -> Result<SearchResult, MlError> {
        let candidates = self.sample_candidates()?;
        tracing::info!(
            model = %self.spec.family,
            candidates = candidates.len(),
            folds = self.cv.n_folds,
            "starting randomized search"
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
            SearchStrategy::Randomized,
            self.spec.family,
            self.scoring,
            evaluated,
            started,
        )?;
        tracing::info!(
            best = %format_params(&result.best_params),
            score = result.best_score,
            failed = result.n_failed(),
            "randomized search finished"
        );
        Ok(result)
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelFamily;
    use crate::search::params::ParamValue;
    use ndarray::array;
    use std::collections::HashSet;

    fn forest_space() -> ParamDistributions {
        let mut d = ParamDistributions::new();
        d.insert(
            "n_estimators".into(),
            ParamDistribution::choice([ParamValue::Int(3), ParamValue::Int(5)]),
        );
        d.insert(
            "max_depth".into(),
            ParamDistribution::choice([ParamValue::from("none"), ParamValue::Int(2)]),
        );
        d.insert(
            "max_features".into(),
            ParamDistribution::choice([ParamValue::from("sqrt"), ParamValue::from("log2")]),
        );
        d
    }

    fn spec() -> ModelSpec {
        ModelSpec::new(ModelFamily::RandomForest)
    }

    #[test]
    fn test_choice_only_samples_without_replacement() {
        let search = RandomizedSearch::new(spec(), forest_space(), 5).with_seed(42);
        let candidates = search.sample_candidates().unwrap();
        assert_eq!(candidates.len(), 5);
        let distinct: HashSet<String> = candidates.iter().map(format_params).collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_n_iter_capped_at_grid_size() {
        let search = RandomizedSearch::new(spec(), forest_space(), 50).with_seed(1);
        assert_eq!(search.sample_candidates().unwrap().len(), 8);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let a = RandomizedSearch::new(spec(), forest_space(), 4).with_seed(42);
        let b = RandomizedSearch::new(spec(), forest_space(), 4).with_seed(42);
        assert_eq!(a.sample_candidates().unwrap(), b.sample_candidates().unwrap());
    }

    #[test]
    fn test_continuous_distributions_sample_with_replacement() {
        let mut space = ParamDistributions::new();
        space.insert("C".into(), ParamDistribution::LogUniform { min: 1e-3, max: 10.0 });
        space.insert("max_iter".into(), ParamDistribution::IntRange { min: 100, max: 200 });
        let spec = ModelSpec::new(ModelFamily::LogisticRegression);
        let search = RandomizedSearch::new(spec, space.clone(), 12).with_seed(3);
        let candidates = search.sample_candidates().unwrap();
        assert_eq!(candidates.len(), 12);
        for c in &candidates {
            for (name, dist) in &space {
                assert!(dist.contains(&c[name]));
            }
        }
    }

    #[test]
    fn test_fit_best_params_from_declared_sets() {
        let x = array![
            [0.0, 0.1], [0.2, 0.0], [0.1, 0.3], [0.3, 0.2], [0.2, 0.2], [0.0, 0.0],
            [3.0, 3.1], [3.2, 2.9], [2.9, 3.3], [3.1, 3.0], [3.3, 3.2], [3.0, 2.8],
        ];
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
        let space = forest_space();
        let search = RandomizedSearch::new(spec(), space.clone(), 3)
            .with_seed(42)
            .with_cv(CrossValidation::new(3));
        let result = search.fit(&x, &y).unwrap();
        assert_eq!(result.candidates.len(), 3);
        assert_eq!(result.strategy, SearchStrategy::Randomized);
        assert!((0.0..=1.0).contains(&result.best_score));
        for (name, value) in &result.best_params {
            assert!(space[name].contains(value));
        }
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let search = RandomizedSearch::new(spec(), forest_space(), 0);
        assert!(search.sample_candidates().is_err());
    }
}
