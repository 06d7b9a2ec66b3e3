//! The end-to-end walkthrough: load, split, sweep, grid search, randomized search.

use crate::config::HypertuneConfig;
use crate::data::{Dataset, DatasetSummary, SplitSummary, TrainTestSplit, train_test_split};
use crate::error::MlError;
use crate::eval::CrossValidation;
use crate::models::ModelFamily;
use crate::reproducibility::{EnvironmentSnapshot, fingerprint};
use crate::search::{
    CandidateResult, GridSearch, ManualSweep, ParamSet, RandomizedSearch, SearchResult,
    SearchStrategy, SweepResult,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a tutorial run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorialReport {
    pub run_id: String,
    pub seed: u64,
    pub dataset: DatasetSummary,
    pub split: SplitSummary,
    pub sweep: SweepResult,
    pub grid: SearchResult,
    pub random: SearchResult,
    pub environment: EnvironmentSnapshot,
    /// Digest of the seed-dependent results; see [`TutorialReport::compute_fingerprint`].
    pub fingerprint: String,
}

#[derive(Serialize)]
struct SearchDigest<'a> {
    strategy: SearchStrategy,
    model: ModelFamily,
    candidates: &'a [CandidateResult],
    best_index: usize,
    best_params: &'a ParamSet,
    best_score: f64,
    test_score: Option<f64>,
}

impl<'a> From<&'a SearchResult> for SearchDigest<'a> {
    fn from(r: &'a SearchResult) -> Self {
        Self {
            strategy: r.strategy,
            model: r.model,
            candidates: &r.candidates,
            best_index: r.best_index,
            best_params: &r.best_params,
            best_score: r.best_score,
            test_score: r.test_score,
        }
    }
}

#[derive(Serialize)]
struct Digest<'a> {
    seed: u64,
    dataset: &'a DatasetSummary,
    split: &'a SplitSummary,
    sweep: &'a SweepResult,
    grid: SearchDigest<'a>,
    random: SearchDigest<'a>,
}

impl TutorialReport {
    /// SHA-256 over every printed value. Run ids, timings and the environment
    /// are left out, so two runs with the same config agree.
    pub fn compute_fingerprint(&self) -> Result<String, MlError> {
        fingerprint(&Digest {
            seed: self.seed,
            dataset: &self.dataset,
            split: &self.split,
            sweep: &self.sweep,
            grid: SearchDigest::from(&self.grid),
            random: SearchDigest::from(&self.random),
        })
    }
}

/// Cross-validation settings for a run; a shuffled CV without its own seed
/// takes the run seed.
pub fn cross_validation(config: &HypertuneConfig) -> CrossValidation {
    let mut cv = config.cv.clone();
    if cv.shuffle && cv.random_state.is_none() {
        cv.random_state = Some(config.seed);
    }
    cv
}

/// Load the configured dataset and split it.
pub fn prepare(
    config: &HypertuneConfig,
    workspace: &Path,
) -> Result<(Dataset, TrainTestSplit), MlError> {
    let dataset = config.data.source.load(workspace)?;
    tracing::info!(
        dataset = dataset.name(),
        samples = dataset.n_samples(),
        features = dataset.n_features(),
        "dataset loaded"
    );
    let split = train_test_split(
        &dataset,
        config.data.test_size,
        config.seed,
        config.data.stratify,
    )?;
    tracing::info!(
        train = split.y_train.len(),
        test = split.y_test.len(),
        stratify = config.data.stratify,
        "train/test split"
    );
    Ok((dataset, split))
}

pub fn run_sweep(config: &HypertuneConfig, split: &TrainTestSplit) -> Result<SweepResult, MlError> {
    let sweep = &config.sweep;
    ManualSweep::new(sweep.spec(), sweep.param.clone(), sweep.values.clone())
        .with_base_params(sweep.base_params.clone())
        .with_cv(cross_validation(config))
        .with_scoring(config.scoring)
        .with_seed(config.seed)
        .run(&split.x_train, &split.y_train)
}

pub fn run_grid(config: &HypertuneConfig, split: &TrainTestSplit) -> Result<SearchResult, MlError> {
    let mut search = GridSearch::new(config.grid.spec(), config.grid.params.clone())
        .with_cv(cross_validation(config))
        .with_scoring(config.scoring)
        .with_seed(config.seed);
    search.refit = config.grid.refit;
    search.fit_split(split)
}

pub fn run_random(
    config: &HypertuneConfig,
    split: &TrainTestSplit,
) -> Result<SearchResult, MlError> {
    let random = &config.random;
    let mut search = RandomizedSearch::new(random.spec(), random.params.clone(), random.n_iter)
        .with_cv(cross_validation(config))
        .with_scoring(config.scoring)
        .with_seed(config.seed);
    search.refit = random.refit;
    search.fit_split(split)
}

/// Run every step in order. Relative CSV paths resolve against `workspace`.
pub fn run_tutorial(config: &HypertuneConfig, workspace: &Path) -> Result<TutorialReport, MlError> {
    config.validate()?;
    let (dataset, split) = prepare(config, workspace)?;

    let sweep = run_sweep(config, &split)?;
    let grid = run_grid(config, &split)?;
    let random = run_random(config, &split)?;

    let mut report = TutorialReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        seed: config.seed,
        dataset: dataset.summary(),
        split: split.summary(),
        sweep,
        grid,
        random,
        environment: EnvironmentSnapshot::capture(),
        fingerprint: String::new(),
    };
    report.fingerprint = report.compute_fingerprint()?;
    tracing::info!(fingerprint = %report.fingerprint, "tutorial finished");
    Ok(report)
}

/// Run the tutorial twice and fail unless both runs agree.
pub fn run_verified(config: &HypertuneConfig, workspace: &Path) -> Result<TutorialReport, MlError> {
    let first = run_tutorial(config, workspace)?;
    let second = run_tutorial(config, workspace)?;
    if first.fingerprint != second.fingerprint {
        return Err(MlError::evaluation(format!(
            "runs with seed {} disagree: {} vs {}",
            config.seed, first.fingerprint, second.fingerprint
        )));
    }
    tracing::info!("determinism check passed");
    Ok(second)
}
