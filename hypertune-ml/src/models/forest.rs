//! Bagged ensembles of CART trees.

use crate::error::MlError;
use crate::models::tree::{DecisionTree, DecisionTreeConfig, MaxFeatures};
use crate::models::{Classifier, check_fit_input, param_bool, param_usize};
use crate::search::params::ParamSet;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestConfig {
    pub n_estimators: usize,
    pub bootstrap: bool,
    pub tree: DecisionTreeConfig,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            bootstrap: true,
            tree: DecisionTreeConfig {
                max_features: MaxFeatures::Sqrt,
                ..Default::default()
            },
        }
    }
}

impl RandomForestConfig {
    pub fn from_params(params: &ParamSet) -> Result<Self, MlError> {
        let n_estimators = param_usize(params, "n_estimators", 100)?;
        if n_estimators == 0 {
            return Err(MlError::invalid_input("n_estimators must be at least 1"));
        }
        Ok(Self {
            n_estimators,
            bootstrap: param_bool(params, "bootstrap", true)?,
            tree: DecisionTreeConfig::from_params(params, MaxFeatures::Sqrt)?,
        })
    }
}

/// Tree `i` draws its bootstrap sample and split features from `seed + i`.
/// Class probabilities are averaged over all trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: RandomForestConfig,
    seed: u64,
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn new(config: RandomForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            trees: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), MlError> {
        let n_classes = check_fit_input(x, y)?;
        let n = x.nrows();

        self.trees = (0..self.config.n_estimators)
            .map(|i| {
                let tree_seed = self.seed.wrapping_add(i as u64);
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let rows: Vec<usize> = if self.config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut tree = DecisionTree::new(self.config.tree.clone(), tree_seed);
                tree.fit_rows(x, y, rows, n_classes, &mut rng);
                tree
            })
            .collect();
        self.n_classes = n_classes;
        tracing::trace!(
            n_trees = self.trees.len(),
            max_depth = self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            "fitted random forest"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        let first = self
            .trees
            .first()
            .ok_or_else(|| MlError::model("random forest used before fit"))?;
        first.check_predict_input(x)?;

        let mut out = Array2::zeros((x.nrows(), self.n_classes));
        for tree in &self.trees {
            tree.accumulate_proba(x, &mut out);
        }
        out /= self.trees.len() as f64;
        Ok(out)
    }
}
