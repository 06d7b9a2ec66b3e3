//! Seeded train/test partitioning.

use crate::data::dataset::{Dataset, class_counts};
use crate::error::MlError;
use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Two disjoint partitions of a dataset.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub y_train: Vec<usize>,
    pub x_test: Array2<f64>,
    pub y_test: Vec<usize>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    n_classes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub train_class_counts: Vec<usize>,
    pub test_class_counts: Vec<usize>,
}

impl TrainTestSplit {
    pub fn summary(&self) -> SplitSummary {
        SplitSummary {
            n_train: self.y_train.len(),
            n_test: self.y_test.len(),
            n_features: self.x_train.ncols(),
            train_class_counts: class_counts(&self.y_train, self.n_classes),
            test_class_counts: class_counts(&self.y_test, self.n_classes),
        }
    }
}

/// Number of test rows for `n` samples: `ceil(n * test_size)`.
pub fn test_count(n: usize, test_size: f64) -> Result<usize, MlError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(MlError::invalid_input(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(MlError::invalid_input(format!(
            "test_size {test_size} leaves an empty partition for {n} samples"
        )));
    }
    Ok(n_test)
}

/// Split `dataset` into train and test partitions.
///
/// Without `stratify`, all row indices are shuffled with `seed` and the first
/// `ceil(n * test_size)` go to the test side. With `stratify`, each class
/// contributes test rows in proportion to its size.
pub fn train_test_split(
    dataset: &Dataset,
    test_size: f64,
    seed: u64,
    stratify: bool,
) -> Result<TrainTestSplit, MlError> {
    let n = dataset.n_samples();
    let n_test = test_count(n, test_size)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let (mut train_indices, mut test_indices) = if stratify {
        stratified_indices(dataset.targets(), dataset.n_classes(), n_test, &mut rng)
    } else {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        let train = order.split_off(n_test);
        (train, order)
    };
    if stratify {
        train_indices.shuffle(&mut rng);
        test_indices.shuffle(&mut rng);
    }

    let x = dataset.features();
    let y = dataset.targets();
    tracing::debug!(
        n_train = train_indices.len(),
        n_test = test_indices.len(),
        stratify,
        "split dataset"
    );

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &train_indices),
        y_train: train_indices.iter().map(|&i| y[i]).collect(),
        x_test: x.select(Axis(0), &test_indices),
        y_test: test_indices.iter().map(|&i| y[i]).collect(),
        train_indices,
        test_indices,
        n_classes: dataset.n_classes(),
    })
}

/// Per-class test allocation by largest remainder, then a per-class shuffle.
fn stratified_indices(
    targets: &[usize],
    n_classes: usize,
    n_test: usize,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let n = targets.len();
    let counts = class_counts(targets, n_classes);

    let mut alloc: Vec<usize> = counts.iter().map(|&c| c * n_test / n).collect();
    let mut remainders: Vec<(usize, usize)> = counts
        .iter()
        .enumerate()
        .map(|(class, &c)| (class, (c * n_test) % n))
        .collect();
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut missing = n_test - alloc.iter().sum::<usize>();
    for (class, _) in remainders {
        if missing == 0 {
            break;
        }
        if alloc[class] < counts[class] {
            alloc[class] += 1;
            missing -= 1;
        }
    }

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (class, &take) in alloc.iter().enumerate() {
        let mut members: Vec<usize> = (0..n).filter(|&i| targets[i] == class).collect();
        members.shuffle(rng);
        test.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::builtin;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_split_sizes() {
        let ds = builtin::diagnostic_cells().unwrap();
        let split = train_test_split(&ds, 0.2, 42, false).unwrap();
        let summary = split.summary();
        assert_eq!(summary.n_train, 455);
        assert_eq!(summary.n_test, 114);
        assert_eq!(summary.n_features, 30);
        assert_eq!(split.x_train.nrows(), 455);
        assert_eq!(split.x_test.nrows(), 114);
    }

    #[test]
    fn test_split_is_disjoint_and_exhaustive() {
        let ds = builtin::diagnostic_cells().unwrap();
        let split = train_test_split(&ds, 0.25, 3, false).unwrap();
        let train: HashSet<_> = split.train_indices.iter().copied().collect();
        let test: HashSet<_> = split.test_indices.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), ds.n_samples());
    }

    #[test]
    fn test_split_deterministic_for_seed() {
        let ds = builtin::diagnostic_cells().unwrap();
        let a = train_test_split(&ds, 0.2, 42, false).unwrap();
        let b = train_test_split(&ds, 0.2, 42, false).unwrap();
        let c = train_test_split(&ds, 0.2, 43, false).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_stratified_split_keeps_proportions() {
        let ds = builtin::diagnostic_cells().unwrap();
        let split = train_test_split(&ds, 0.2, 42, true).unwrap();
        let summary = split.summary();
        assert_eq!(summary.n_test, 114);
        // 212 * 114 / 569 = 42.47, 357 * 114 / 569 = 71.53
        assert_eq!(summary.test_class_counts, vec![42, 72]);
        assert_eq!(summary.train_class_counts, vec![170, 285]);
    }

    #[test]
    fn test_invalid_test_size() {
        let ds = builtin::diagnostic_cells().unwrap();
        assert!(train_test_split(&ds, 0.0, 1, false).is_err());
        assert!(train_test_split(&ds, 1.0, 1, false).is_err());
        assert!(train_test_split(&ds, f64::NAN, 1, false).is_err());
    }
}
