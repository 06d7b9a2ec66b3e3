//! Configuration for hypertune runs.
//!
//! Configuration is layered: defaults, then the user config file, then the
//! workspace `.hypertune/config.toml`, then an explicit file, then
//! `HYPERTUNE_` environment variables, then command-line overrides.

use crate::data::builtin::diagnostic_cells;
use crate::data::{CsvOptions, Dataset};
use crate::error::MlError;
use crate::eval::{CrossValidation, Scoring};
use crate::models::{ModelFamily, ModelSpec};
use crate::search::params::{
    ParamDistribution, ParamDistributions, ParamGrid, ParamSet, ParamValue,
};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypertuneConfig {
    /// Seed for the split, fold shuffling, sampling and every model.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub scoring: Scoring,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cv: CrossValidation,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub random: RandomConfig,
}

fn default_seed() -> u64 {
    42
}

impl Default for HypertuneConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            scoring: Scoring::default(),
            data: DataConfig::default(),
            cv: CrossValidation::default(),
            sweep: SweepConfig::default(),
            grid: GridConfig::default(),
            random: RandomConfig::default(),
        }
    }
}

/// Where the data comes from and how it is split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Fraction of rows held out for the final test score.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default)]
    pub stratify: bool,
    #[serde(default)]
    pub source: DataSource,
}

fn default_test_size() -> f64 {
    0.2
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            stratify: false,
            source: DataSource::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// The bundled diagnostic-cells table.
    #[default]
    Builtin,
    /// A CSV file with a header row.
    Csv {
        path: PathBuf,
        #[serde(flatten)]
        options: CsvOptions,
    },
}

impl DataSource {
    /// Load the dataset. Relative CSV paths resolve against `base`.
    pub fn load(&self, base: &Path) -> Result<Dataset, MlError> {
        match self {
            Self::Builtin => diagnostic_cells(),
            Self::Csv { path, options } => {
                let path = if path.is_relative() {
                    base.join(path)
                } else {
                    path.clone()
                };
                Dataset::from_csv(&path, options)
            }
        }
    }
}

/// The manual sweep step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_model")]
    pub model: ModelFamily,
    /// Overrides the family's default preprocessing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardize: Option<bool>,
    #[serde(default = "default_sweep_param")]
    pub param: String,
    #[serde(default = "default_sweep_values")]
    pub values: Vec<ParamValue>,
    #[serde(default)]
    pub base_params: ParamSet,
}

fn default_sweep_model() -> ModelFamily {
    ModelFamily::LogisticRegression
}

fn default_sweep_param() -> String {
    "C".to_string()
}

fn default_sweep_values() -> Vec<ParamValue> {
    [0.001, 0.01, 0.1, 1.0, 10.0]
        .into_iter()
        .map(ParamValue::Float)
        .collect()
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            model: default_sweep_model(),
            standardize: None,
            param: default_sweep_param(),
            values: default_sweep_values(),
            base_params: ParamSet::new(),
        }
    }
}

impl SweepConfig {
    pub fn spec(&self) -> ModelSpec {
        model_spec(self.model, self.standardize)
    }
}

/// The grid search step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_model")]
    pub model: ModelFamily,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardize: Option<bool>,
    /// Refit the best candidate and score it on the test split.
    #[serde(default = "default_true")]
    pub refit: bool,
    #[serde(default = "default_grid_params")]
    pub params: ParamGrid,
}

fn default_grid_model() -> ModelFamily {
    ModelFamily::LogisticRegression
}

fn default_true() -> bool {
    true
}

fn default_grid_params() -> ParamGrid {
    let mut grid = ParamGrid::new();
    grid.insert(
        "C".into(),
        vec![ParamValue::Float(0.1), ParamValue::Float(1.0), ParamValue::Float(10.0)],
    );
    grid.insert("penalty".into(), vec!["l1".into(), "l2".into()]);
    grid.insert("solver".into(), vec!["proximal_gradient".into()]);
    grid
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            model: default_grid_model(),
            standardize: None,
            refit: true,
            params: default_grid_params(),
        }
    }
}

impl GridConfig {
    pub fn spec(&self) -> ModelSpec {
        model_spec(self.model, self.standardize)
    }
}

/// The randomized search step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomConfig {
    #[serde(default = "default_random_model")]
    pub model: ModelFamily,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardize: Option<bool>,
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,
    #[serde(default = "default_true")]
    pub refit: bool,
    #[serde(default = "default_random_params")]
    pub params: ParamDistributions,
}

fn default_random_model() -> ModelFamily {
    ModelFamily::RandomForest
}

fn default_n_iter() -> usize {
    10
}

fn default_random_params() -> ParamDistributions {
    let mut params = ParamDistributions::new();
    params.insert(
        "n_estimators".into(),
        ParamDistribution::choice([50i64, 100, 200].map(ParamValue::Int)),
    );
    params.insert(
        "max_depth".into(),
        ParamDistribution::choice([
            ParamValue::from("none"),
            ParamValue::Int(10),
            ParamValue::Int(20),
        ]),
    );
    params.insert(
        "max_features".into(),
        ParamDistribution::choice([ParamValue::from("sqrt"), ParamValue::from("log2")]),
    );
    params
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            model: default_random_model(),
            standardize: None,
            n_iter: default_n_iter(),
            refit: true,
            params: default_random_params(),
        }
    }
}

impl RandomConfig {
    pub fn spec(&self) -> ModelSpec {
        model_spec(self.model, self.standardize)
    }
}

fn model_spec(family: ModelFamily, standardize: Option<bool>) -> ModelSpec {
    let mut spec = ModelSpec::new(family);
    if let Some(standardize) = standardize {
        spec.standardize = standardize;
    }
    spec
}

impl HypertuneConfig {
    /// Check values that deserialize fine but cannot be run.
    pub fn validate(&self) -> Result<(), MlError> {
        let test_size = self.data.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(MlError::config(format!(
                "data.test_size must be in (0, 1), got {test_size}"
            )));
        }
        if self.cv.n_folds < 2 {
            return Err(MlError::config(format!(
                "cv.n_folds must be at least 2, got {}",
                self.cv.n_folds
            )));
        }
        if self.sweep.values.is_empty() {
            return Err(MlError::config("sweep.values must not be empty"));
        }
        if self.random.n_iter == 0 {
            return Err(MlError::config("random.n_iter must be at least 1"));
        }

        let sweep_names = self
            .sweep
            .base_params
            .keys()
            .chain(std::iter::once(&self.sweep.param));
        let checks = [
            ("sweep", self.sweep.spec().check_param_names(sweep_names)),
            ("grid", self.grid.spec().check_param_names(self.grid.params.keys())),
            ("random", self.random.spec().check_param_names(self.random.params.keys())),
        ];
        for (section, check) in checks {
            check.map_err(|e| MlError::config(format!("{section}: {e}")))?;
        }
        for (name, dist) in &self.random.params {
            dist.validate(name)
                .map_err(|e| MlError::config(format!("random: {e}")))?;
        }
        Ok(())
    }

    /// Pretty TOML, as written by `config init`.
    pub fn to_toml(&self) -> Result<String, MlError> {
        toml::to_string_pretty(self).map_err(|e| MlError::config(e.to_string()))
    }
}

/// Values set from the command line; unset fields leave the layered value alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "hypertune", "hypertune")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".hypertune").join("config.toml")
}

/// Parameter tables left out of the default layer. Figment merges tables key
/// by key, so a default entry there could not be removed by a config file;
/// serde fills each one from its field default when no layer sets it.
const PARAM_TABLES: [(&str, &str); 3] = [
    ("sweep", "base_params"),
    ("grid", "params"),
    ("random", "params"),
];

fn default_layer() -> Result<serde_json::Value, Box<figment::Error>> {
    let mut value = serde_json::to_value(HypertuneConfig::default())
        .map_err(|e| Box::new(figment::Error::from(e.to_string())))?;
    for (section, table) in PARAM_TABLES {
        if let Some(section) = value.get_mut(section).and_then(|v| v.as_object_mut()) {
            section.remove(table);
        }
    }
    Ok(value)
}

/// Load configuration from every layer.
///
/// Scalars and sections merge key by key. A parameter table (`sweep.base_params`,
/// `grid.params` or `random.params`) set by a layer replaces the built-in one.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<HypertuneConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(default_layer()?));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }
        figment = figment.merge(Toml::file(path));
    }

    // HYPERTUNE_SEED, HYPERTUNE_CV__N_FOLDS, HYPERTUNE_DATA__TEST_SIZE, ...
    figment = figment.merge(Env::prefixed("HYPERTUNE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Whether a user-level or workspace-level config file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}
