//! Classification scores.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score used to compare candidates. Higher is better; all lie in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    Accuracy,
    /// Class 1 is the positive class for precision, recall and F1.
    Precision,
    Recall,
    F1,
    BalancedAccuracy,
}

impl Scoring {
    pub fn score(&self, y_true: &[usize], y_pred: &[usize]) -> Result<f64, MlError> {
        if y_true.len() != y_pred.len() {
            return Err(MlError::evaluation(format!(
                "{} labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(MlError::evaluation("cannot score zero samples"));
        }
        Ok(match self {
            Self::Accuracy => accuracy(y_true, y_pred),
            Self::Precision => binary_counts(y_true, y_pred).precision(),
            Self::Recall => binary_counts(y_true, y_pred).recall(),
            Self::F1 => binary_counts(y_true, y_pred).f1(),
            Self::BalancedAccuracy => balanced_accuracy(y_true, y_pred),
        })
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Accuracy => "accuracy",
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::F1 => "f1",
            Self::BalancedAccuracy => "balanced_accuracy",
        };
        f.write_str(name)
    }
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len().max(1) as f64
}

/// Mean per-class recall over classes present in `y_true`.
pub fn balanced_accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let n_classes = y_true.iter().chain(y_pred).copied().max().map_or(0, |m| m + 1);
    let cm = confusion_matrix(y_true, y_pred, n_classes);
    let recalls: Vec<f64> = cm
        .iter()
        .enumerate()
        .filter_map(|(class, row)| {
            let support: usize = row.iter().sum();
            (support > 0).then(|| row[class] as f64 / support as f64)
        })
        .collect();
    if recalls.is_empty() {
        0.0
    } else {
        recalls.iter().sum::<f64>() / recalls.len() as f64
    }
}

/// `matrix[true][predicted]` counts.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let size = y_true
        .iter()
        .chain(y_pred)
        .copied()
        .max()
        .map_or(n_classes, |m| n_classes.max(m + 1));
    let mut matrix = vec![vec![0; size]; size];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        matrix[t][p] += 1;
    }
    matrix
}

#[derive(Debug, Clone, Copy)]
struct BinaryCounts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl BinaryCounts {
    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn f1(&self) -> f64 {
        ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_)
    }
}

fn binary_counts(y_true: &[usize], y_pred: &[usize]) -> BinaryCounts {
    let mut counts = BinaryCounts { tp: 0, fp: 0, fn_: 0 };
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == 1, p == 1) {
            (true, true) => counts.tp += 1,
            (false, true) => counts.fp += 1,
            (true, false) => counts.fn_ += 1,
            (false, false) => {}
        }
    }
    counts
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
