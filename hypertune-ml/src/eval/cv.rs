//! Stratified k-fold cross-validation.

use crate::error::MlError;
use crate::eval::metrics::Scoring;
use crate::models::{Classifier, ModelSpec};
use crate::search::params::ParamSet;
use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Cross-validation configuration.
///
/// Folds are stratified: each class's rows are dealt round-robin across folds,
/// continuing the rotation from one class to the next so fold sizes differ by
/// at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    #[serde(default = "default_folds")]
    pub n_folds: usize,
    /// Shuffle each class's rows before dealing them out.
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
}

fn default_folds() -> usize {
    5
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            n_folds: default_folds(),
            shuffle: false,
            random_state: None,
        }
    }
}

/// Row indices of one fold, both sides ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl CrossValidation {
    pub fn new(n_folds: usize) -> Self {
        Self {
            n_folds,
            ..Default::default()
        }
    }

    pub fn split(&self, y: &[usize]) -> Result<Vec<Fold>, MlError> {
        let k = self.n_folds;
        if k < 2 {
            return Err(MlError::invalid_input(format!("n_folds must be at least 2, got {k}")));
        }
        let n_classes = y.iter().copied().max().map_or(0, |m| m + 1);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &class) in y.iter().enumerate() {
            members[class].push(i);
        }
        if let Some(smallest) = members.iter().map(Vec::len).filter(|&c| c > 0).min() {
            if smallest < k {
                return Err(MlError::invalid_input(format!(
                    "n_folds = {k} exceeds the smallest class size ({smallest})"
                )));
            }
        } else {
            return Err(MlError::invalid_input("cannot split zero samples"));
        }

        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(0));
            for class_rows in &mut members {
                class_rows.shuffle(&mut rng);
            }
        }

        let mut fold_of = vec![0usize; y.len()];
        let mut counter = 0usize;
        for class_rows in &members {
            for &row in class_rows {
                fold_of[row] = counter % k;
                counter += 1;
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&i| fold_of[i] == fold);
                Fold { train, test }
            })
            .collect())
    }
}

/// Cross-validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub metric_name: String,
}

impl CrossValidationResult {
    pub fn from_scores(scores: Vec<f64>, metric_name: &str) -> Self {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        Self {
            fold_scores: scores,
            mean_score: mean,
            std_score: variance.sqrt(),
            metric_name: metric_name.to_string(),
        }
    }
}

/// Score one parameter set on every fold.
///
/// Each fold builds a fresh pipeline from `spec` and fits it on that fold's
/// training rows only.
pub fn cross_val_score(
    spec: &ModelSpec,
    params: &ParamSet,
    x: &Array2<f64>,
    y: &[usize],
    cv: &CrossValidation,
    scoring: Scoring,
    seed: u64,
) -> Result<CrossValidationResult, MlError> {
    if x.nrows() != y.len() {
        return Err(MlError::invalid_input(format!(
            "{} rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    let folds = cv.split(y)?;
    let mut scores = Vec::with_capacity(folds.len());
    for (i, fold) in folds.iter().enumerate() {
        let x_train = x.select(Axis(0), &fold.train);
        let y_train: Vec<usize> = fold.train.iter().map(|&r| y[r]).collect();
        let x_test = x.select(Axis(0), &fold.test);
        let y_test: Vec<usize> = fold.test.iter().map(|&r| y[r]).collect();

        let mut model = spec.build(params, seed)?;
        model.fit(&x_train, &y_train)?;
        let predictions = model.predict(&x_test)?;
        let score = scoring.score(&y_test, &predictions)?;
        tracing::trace!(fold = i, score, "fold scored");
        scores.push(score);
    }
    Ok(CrossValidationResult::from_scores(scores, &scoring.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelFamily;
    use ndarray::array;
    use std::collections::HashSet;

    #[test]
    fn test_default_cross_validation() {
        let cv = CrossValidation::default();
        assert_eq!(cv.n_folds, 5);
        assert!(!cv.shuffle);
    }

    #[test]
    fn test_from_scores() {
        let result = CrossValidationResult::from_scores(vec![0.8, 1.0], "accuracy");
        assert!((result.mean_score - 0.9).abs() < 1e-12);
        assert!((result.std_score - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_folds_partition_and_stratify() {
        let y: Vec<usize> = (0..20).map(|i| usize::from(i % 4 == 0)).collect();
        let folds = CrossValidation::new(5).split(&y).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = HashSet::new();
        for fold in &folds {
            assert_eq!(fold.test.len(), 4);
            assert_eq!(fold.test.iter().filter(|&&i| y[i] == 1).count(), 1);
            assert_eq!(fold.train.len() + fold.test.len(), 20);
            for &i in &fold.test {
                assert!(seen.insert(i), "row {i} in two test folds");
            }
        }
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let y: Vec<usize> = (0..30).map(|i| i % 2).collect();
        let cv = CrossValidation {
            n_folds: 3,
            shuffle: true,
            random_state: Some(9),
        };
        assert_eq!(cv.split(&y).unwrap(), cv.split(&y).unwrap());
        assert_ne!(cv.split(&y).unwrap(), CrossValidation::new(3).split(&y).unwrap());
    }

    #[test]
    fn test_too_many_folds() {
        let y = vec![0, 0, 0, 1, 1];
        assert!(CrossValidation::new(3).split(&y).is_err());
        assert!(CrossValidation::new(1).split(&y).is_err());
        assert!(CrossValidation::new(2).split(&y).is_ok());
    }

    #[test]
    fn test_cross_val_score_on_separable_data() {
        let x = array![
            [-3.0], [-2.5], [-2.0], [-1.5], [-1.0], [-0.8],
            [0.8], [1.0], [1.5], [2.0], [2.5], [3.0],
        ];
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
        let spec = ModelSpec::new(ModelFamily::LogisticRegression);
        let result = cross_val_score(
            &spec,
            &ParamSet::new(),
            &x,
            &y,
            &CrossValidation::new(3),
            Scoring::Accuracy,
            0,
        )
        .unwrap();
        assert_eq!(result.fold_scores.len(), 3);
        assert_eq!(result.mean_score, 1.0);
        assert_eq!(result.metric_name, "accuracy");
    }
}
