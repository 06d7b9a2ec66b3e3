//! Candidate evaluation, ranking and search results.

use crate::error::MlError;
use crate::eval::{CrossValidation, CrossValidationResult, Scoring, cross_val_score};
use crate::models::{Classifier, ModelFamily, ModelSpec};
use crate::search::params::{ParamSet, format_params};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// How candidates were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Grid,
    Randomized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialStatus {
    Completed,
    Failed { reason: String },
}

/// One evaluated parameter combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub index: usize,
    pub params: ParamSet,
    pub status: TrialStatus,
    pub cv: Option<CrossValidationResult>,
    /// 1 is best; equal means share the lower rank, failed candidates rank last.
    pub rank: usize,
}

impl CandidateResult {
    pub fn mean_score(&self) -> Option<f64> {
        self.cv.as_ref().map(|cv| cv.mean_score)
    }
}

/// Outcome of a grid or randomized search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub strategy: SearchStrategy,
    pub model: ModelFamily,
    pub scoring: Scoring,
    pub candidates: Vec<CandidateResult>,
    pub best_index: usize,
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Score of the refitted best candidate on held-out data, when requested.
    pub test_score: Option<f64>,
    pub duration_secs: f64,
}

impl SearchResult {
    pub fn n_failed(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| matches!(c.status, TrialStatus::Failed { .. }))
            .count()
    }

    pub fn best(&self) -> &CandidateResult {
        &self.candidates[self.best_index]
    }
}

/// Cross-validate every candidate.
///
/// `InvalidInput` errors abort the whole evaluation; any other error marks that
/// candidate as failed and evaluation continues.
pub(crate) fn evaluate_candidates(
    spec: &ModelSpec,
    candidates: Vec<ParamSet>,
    x: &Array2<f64>,
    y: &[usize],
    cv: &CrossValidation,
    scoring: Scoring,
    seed: u64,
) -> Result<Vec<CandidateResult>, MlError> {
    let total = candidates.len();
    let mut results = Vec::with_capacity(total);
    for (index, params) in candidates.into_iter().enumerate() {
        let (status, cv_result) = match cross_val_score(spec, &params, x, y, cv, scoring, seed) {
            Ok(result) => {
                tracing::debug!(
                    candidate = index + 1,
                    total,
                    params = %format_params(&params),
                    mean = result.mean_score,
                    "candidate evaluated"
                );
                (TrialStatus::Completed, Some(result))
            }
            Err(e @ MlError::InvalidInput(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(
                    candidate = index + 1,
                    params = %format_params(&params),
                    error = %e,
                    "candidate failed; excluded from ranking"
                );
                (TrialStatus::Failed { reason: e.to_string() }, None)
            }
        };
        results.push(CandidateResult {
            index,
            params,
            status,
            cv: cv_result,
            rank: 0,
        });
    }
    assign_ranks(&mut results);
    Ok(results)
}

/// Min-rank by descending mean score; failures after every success.
pub(crate) fn assign_ranks(results: &mut [CandidateResult]) {
    let means: Vec<Option<f64>> = results.iter().map(CandidateResult::mean_score).collect();
    let n_ok = means.iter().filter(|m| m.is_some()).count();
    for (candidate, mean) in results.iter_mut().zip(&means) {
        candidate.rank = match mean {
            Some(m) => 1 + means.iter().flatten().filter(|&&other| other > *m).count(),
            None => n_ok + 1,
        };
    }
}

/// Highest mean among completed candidates; the earliest wins ties.
pub(crate) fn best_candidate(results: &[CandidateResult]) -> Option<usize> {
    results
        .iter()
        .filter_map(|c| c.mean_score().map(|m| (c.index, m)))
        .fold(None, |best: Option<(usize, f64)>, (i, m)| match best {
            Some((_, bm)) if bm >= m => best,
            _ => Some((i, m)),
        })
        .map(|(i, _)| i)
}

/// Assemble a result from evaluated candidates.
pub(crate) fn finish(
    strategy: SearchStrategy,
    model: ModelFamily,
    scoring: Scoring,
    candidates: Vec<CandidateResult>,
    started: std::time::Instant,
) -> Result<SearchResult, MlError> {
    let best_index = best_candidate(&candidates).ok_or_else(|| {
        MlError::search(format!("all {} candidates failed", candidates.len()))
    })?;
    let best = &candidates[best_index];
    let best_params = best.params.clone();
    let best_score = best.mean_score().unwrap_or(0.0);
    Ok(SearchResult {
        id: uuid::Uuid::new_v4().to_string(),
        strategy,
        model,
        scoring,
        best_index,
        best_params,
        best_score,
        candidates,
        test_score: None,
        duration_secs: started.elapsed().as_secs_f64(),
    })
}

/// Fit `params` on the full training rows and score on held-out rows.
pub fn refit_and_score(
    spec: &ModelSpec,
    params: &ParamSet,
    train: (&Array2<f64>, &[usize]),
    test: (&Array2<f64>, &[usize]),
    scoring: Scoring,
    seed: u64,
) -> Result<f64, MlError> {
    let mut model = spec.build(params, seed)?;
    model.fit(train.0, train.1)?;
    let predictions = model.predict(test.0)?;
    scoring.score(test.1, &predictions)
}
