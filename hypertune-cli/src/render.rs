//! Plain-text rendering of run results.

use hypertune_ml::data::{DatasetSummary, SplitSummary};
use hypertune_ml::search::{SearchResult, SweepResult, TrialStatus, format_params};
use hypertune_ml::tutorial::TutorialReport;
use std::fmt::Write;

/// Candidates listed per search; the rest are summarised in one line.
const TOP_CANDIDATES: usize = 5;

pub fn dataset(summary: &DatasetSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dataset: {}", summary.name);
    let _ = writeln!(
        out,
        "  {} samples, {} features",
        summary.n_samples, summary.n_features
    );
    for (name, count) in summary.target_names.iter().zip(&summary.class_counts) {
        let _ = writeln!(out, "  {name}: {count}");
    }
    out
}

pub fn split(summary: &SplitSummary) -> String {
    format!(
        "Train/test split: {} train, {} test, {} features\n",
        summary.n_train, summary.n_test, summary.n_features
    )
}

pub fn sweep(result: &SweepResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Manual search over {} ({}, {})",
        result.param, result.model, result.scoring
    );
    for point in &result.points {
        let _ = writeln!(
            out,
            "  {} = {:<8} mean {:.4}  std {:.4}",
            result.param,
            point.value.to_string(),
            point.cv.mean_score,
            point.cv.std_score
        );
    }
    if let Some(best) = result.best() {
        let _ = writeln!(
            out,
            "  best: {} = {} ({:.4})",
            result.param,
            best.value,
            best.mean_score()
        );
    }
    out
}

pub fn search(title: &str, result: &SearchResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{title} ({}, {} candidates, {})",
        result.model,
        result.candidates.len(),
        result.scoring
    );

    let mut ranked: Vec<_> = result.candidates.iter().collect();
    ranked.sort_by_key(|c| (c.rank, c.index));
    for c in ranked.iter().take(TOP_CANDIDATES) {
        match (&c.status, &c.cv) {
            (TrialStatus::Completed, Some(cv)) => {
                let _ = writeln!(
                    out,
                    "  #{:<2} mean {:.4}  std {:.4}  {}",
                    c.rank,
                    cv.mean_score,
                    cv.std_score,
                    format_params(&c.params)
                );
            }
            (TrialStatus::Failed { reason }, _) => {
                let _ = writeln!(
                    out,
                    "  #{:<2} failed  {}: {reason}",
                    c.rank,
                    format_params(&c.params)
                );
            }
            (TrialStatus::Completed, None) => {}
        }
    }
    if ranked.len() > TOP_CANDIDATES {
        let _ = writeln!(out, "  ... {} more", ranked.len() - TOP_CANDIDATES);
    }
    if result.n_failed() > 0 {
        let _ = writeln!(out, "  {} candidate(s) failed", result.n_failed());
    }

    let _ = writeln!(out, "  Best parameters: {}", format_params(&result.best_params));
    let _ = writeln!(out, "  Best CV {}: {:.4}", result.scoring, result.best_score);
    if let Some(test) = result.test_score {
        let _ = writeln!(out, "  Test {}: {:.4}", result.scoring, test);
    }
    out
}

pub fn tutorial(report: &TutorialReport) -> String {
    [
        dataset(&report.dataset),
        split(&report.split),
        sweep(&report.sweep),
        search("Grid search", &report.grid),
        search("Randomized search", &report.random),
        format!("Seed {} fingerprint {}\n", report.seed, report.fingerprint),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypertune_ml::eval::{CrossValidationResult, Scoring};
    use hypertune_ml::models::ModelFamily;
    use hypertune_ml::search::{CandidateResult, ParamSet, ParamValue, SearchStrategy, SweepPoint};
    use pretty_assertions::assert_eq;

    fn cv(scores: Vec<f64>) -> CrossValidationResult {
        CrossValidationResult::from_scores(scores, "accuracy")
    }

    fn params(c: f64, penalty: &str) -> ParamSet {
        let mut p = ParamSet::new();
        p.insert("C".into(), ParamValue::Float(c));
        p.insert("penalty".into(), ParamValue::from(penalty));
        p
    }

    #[test]
    fn test_dataset_summary() {
        let summary = DatasetSummary {
            name: "cells".into(),
            n_samples: 569,
            n_features: 30,
            target_names: vec!["malignant".into(), "benign".into()],
            class_counts: vec![212, 357],
        };
        assert_eq!(
            dataset(&summary),
            "Dataset: cells\n  569 samples, 30 features\n  malignant: 212\n  benign: 357\n"
        );
    }

    #[test]
    fn test_sweep_uses_four_decimals() {
        let result = SweepResult {
            param: "C".into(),
            model: ModelFamily::LogisticRegression,
            scoring: Scoring::Accuracy,
            points: vec![
                SweepPoint { value: ParamValue::Float(0.1), cv: cv(vec![0.9, 0.95]) },
                SweepPoint { value: ParamValue::Float(1.0), cv: cv(vec![0.96, 0.97]) },
            ],
        };
        let text = sweep(&result);
        assert!(text.starts_with("Manual search over C (logistic_regression, accuracy)\n"));
        assert!(text.contains("C = 0.1      mean 0.9250  std 0.0250"));
        assert!(text.ends_with("best: C = 1.0 (0.9650)\n"));
    }

    #[test]
    fn test_search_lists_ranked_candidates_and_failures() {
        let result = SearchResult {
            id: "x".into(),
            strategy: SearchStrategy::Grid,
            model: ModelFamily::LogisticRegression,
            scoring: Scoring::Accuracy,
            candidates: vec![
                CandidateResult {
                    index: 0,
                    params: params(0.1, "l1"),
                    status: TrialStatus::Completed,
                    cv: Some(cv(vec![0.9])),
                    rank: 2,
                },
                CandidateResult {
                    index: 1,
                    params: params(1.0, "l2"),
                    status: TrialStatus::Completed,
                    cv: Some(cv(vec![0.95])),
                    rank: 1,
                },
                CandidateResult {
                    index: 2,
                    params: params(10.0, "l1"),
                    status: TrialStatus::Failed { reason: "diverged".into() },
                    cv: None,
                    rank: 3,
                },
            ],
            best_index: 1,
            best_params: params(1.0, "l2"),
            best_score: 0.95,
            test_score: Some(0.9561),
            duration_secs: 0.5,
        };
        let text = search("Grid search", &result);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Grid search (logistic_regression, 3 candidates, accuracy)");
        assert_eq!(lines[1], "  #1  mean 0.9500  std 0.0000  {C: 1.0, penalty: \"l2\"}");
        assert_eq!(lines[2], "  #2  mean 0.9000  std 0.0000  {C: 0.1, penalty: \"l1\"}");
        assert!(lines[3].contains("failed"));
        assert!(text.contains("1 candidate(s) failed"));
        assert!(text.contains("Best parameters: {C: 1.0, penalty: \"l2\"}"));
        assert!(text.contains("Best CV accuracy: 0.9500"));
        assert!(text.ends_with("Test accuracy: 0.9561\n"));
    }
}
