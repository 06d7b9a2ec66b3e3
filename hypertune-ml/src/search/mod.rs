//! Manual, grid and randomized hyperparameter search.

pub mod grid;
pub mod manual;
pub mod params;
pub mod random;
pub mod result;

pub use grid::GridSearch;
pub use manual::{ManualSweep, SweepPoint, SweepResult};
pub use params::{
    ParamDistribution, ParamDistributions, ParamGrid, ParamSet, ParamValue, format_params,
    grid_combinations, grid_size,
};
pub use random::RandomizedSearch;
pub use result::{CandidateResult, SearchResult, SearchStrategy, TrialStatus, refit_and_score};
