//! Hyperparameter values, grids and sampling distributions.

use crate::error::MlError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Numeric view; ints widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view. Floats with an integral value are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// One hyperparameter combination, keyed by parameter name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Candidate values per parameter for exhaustive search.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Sampling distribution per parameter for randomized search.
pub type ParamDistributions = BTreeMap<String, ParamDistribution>;

/// Render a parameter set as `{C: 1.0, penalty: "l2"}`.
pub fn format_params(params: &ParamSet) -> String {
    let body = params
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

/// Number of combinations in a grid (product of list lengths).
pub fn grid_size(grid: &ParamGrid) -> usize {
    grid.values().map(Vec::len).product()
}

/// Enumerate every combination of a grid.
///
/// Keys are visited in sorted order and the last key varies fastest. An empty
/// grid yields a single empty combination.
pub fn grid_combinations(grid: &ParamGrid) -> Result<Vec<ParamSet>, MlError> {
    if let Some((name, _)) = grid.iter().find(|(_, values)| values.is_empty()) {
        return Err(MlError::invalid_input(format!(
            "parameter '{name}' has no candidate values"
        )));
    }

    let mut configs = vec![ParamSet::new()];
    for (key, values) in grid {
        let mut new_configs = Vec::with_capacity(configs.len() * values.len());
        for config in &configs {
            for value in values {
                let mut c = config.clone();
                c.insert(key.clone(), value.clone());
                new_configs.push(c);
            }
        }
        configs = new_configs;
    }
    Ok(configs)
}

/// Parameter distribution for random search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamDistribution {
    /// Uniform pick from a finite list.
    Choice { values: Vec<ParamValue> },
    /// Continuous uniform on `[min, max]`.
    Uniform { min: f64, max: f64 },
    /// Log-uniform on `[min, max]`, both strictly positive.
    LogUniform { min: f64, max: f64 },
    /// Integers in `[min, max]`, both ends inclusive.
    IntRange { min: i64, max: i64 },
}

impl ParamDistribution {
    pub fn choice(values: impl IntoIterator<Item = ParamValue>) -> Self {
        Self::Choice {
            values: values.into_iter().collect(),
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), MlError> {
        let ok = match self {
            Self::Choice { values } => !values.is_empty(),
            Self::Uniform { min, max } => min.is_finite() && max.is_finite() && min <= max,
            Self::LogUniform { min, max } => {
                min.is_finite() && max.is_finite() && *min > 0.0 && min <= max
            }
            Self::IntRange { min, max } => min <= max,
        };
        if ok {
            Ok(())
        } else {
            Err(MlError::invalid_input(format!(
                "invalid distribution for parameter '{name}': {self:?}"
            )))
        }
    }

    /// Draw one value. Assumes `validate` passed.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamValue {
        match self {
            Self::Choice { values } => values[rng.gen_range(0..values.len())].clone(),
            Self::Uniform { min, max } => {
                let v = min + rng.r#gen::<f64>() * (max - min);
                ParamValue::Float(v.clamp(*min, *max))
            }
            Self::LogUniform { min, max } => {
                let (lo, hi) = (min.ln(), max.ln());
                let v = (lo + rng.r#gen::<f64>() * (hi - lo)).exp();
                ParamValue::Float(v.clamp(*min, *max))
            }
            Self::IntRange { min, max } => ParamValue::Int(rng.gen_range(*min..=*max)),
        }
    }

    /// Whether `value` could have been drawn from this distribution.
    pub fn contains(&self, value: &ParamValue) -> bool {
        match self {
            Self::Choice { values } => values.contains(value),
            Self::Uniform { min, max } | Self::LogUniform { min, max } => value
                .as_f64()
                .is_some_and(|v| v >= *min && v <= *max),
            Self::IntRange { min, max } => value
                .as_i64()
                .is_some_and(|v| v >= *min && v <= *max),
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Choice { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid(entries: &[(&str, Vec<ParamValue>)]) -> ParamGrid {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_grid_yields_one_combination() {
        let combos = grid_combinations(&ParamGrid::new()).unwrap();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn test_grid_order_last_key_fastest() {
        let g = grid(&[
            ("C", vec![0.1.into(), 1.0.into()]),
            ("penalty", vec!["l1".into(), "l2".into()]),
        ]);
        let combos = grid_combinations(&g).unwrap();
        assert_eq!(combos.len(), 4);
        let rendered: Vec<String> = combos.iter().map(format_params).collect();
        assert_eq!(
            rendered,
            vec![
                "{C: 0.1, penalty: \"l1\"}",
                "{C: 0.1, penalty: \"l2\"}",
                "{C: 1.0, penalty: \"l1\"}",
                "{C: 1.0, penalty: \"l2\"}",
            ]
        );
    }

    #[test]
    fn test_grid_rejects_empty_value_list() {
        let g = grid(&[("C", vec![])]);
        assert!(matches!(
            grid_combinations(&g),
            Err(MlError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_param_value_untagged_serde() {
        let json = r#"{"a": 1, "b": 0.5, "c": "sqrt", "d": true}"#;
        let set: ParamSet = serde_json::from_str(json).unwrap();
        assert_eq!(set["a"], ParamValue::Int(1));
        assert_eq!(set["b"], ParamValue::Float(0.5));
        assert_eq!(set["c"], ParamValue::Str("sqrt".into()));
        assert_eq!(set["d"], ParamValue::Bool(true));
    }

    #[test]
    fn test_param_value_views() {
        assert_eq!(ParamValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ParamValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(ParamValue::Float(4.5).as_i64(), None);
        assert_eq!(ParamValue::Str("x".into()).as_f64(), None);
    }

    #[test]
    fn test_distribution_tagged_serde() {
        let json = r#"{"type": "int_range", "min": 1, "max": 5}"#;
        let dist: ParamDistribution = serde_json::from_str(json).unwrap();
        assert_eq!(dist, ParamDistribution::IntRange { min: 1, max: 5 });
    }

    #[test]
    fn test_distribution_samples_stay_in_support() {
        let mut rng = StdRng::seed_from_u64(7);
        let dists = [
            ParamDistribution::choice([ParamValue::from("sqrt"), ParamValue::from("log2")]),
            ParamDistribution::Uniform { min: 0.1, max: 0.9 },
            ParamDistribution::LogUniform { min: 1e-3, max: 10.0 },
            ParamDistribution::IntRange { min: 2, max: 4 },
        ];
        for dist in &dists {
            for _ in 0..200 {
                let v = dist.sample(&mut rng);
                assert!(dist.contains(&v), "{v} outside {dist:?}");
            }
        }
    }

    #[test]
    fn test_distribution_validation() {
        assert!(ParamDistribution::LogUniform { min: 0.0, max: 1.0 }
            .validate("C")
            .is_err());
        assert!(ParamDistribution::IntRange { min: 5, max: 1 }.validate("n").is_err());
        assert!(ParamDistribution::choice(Vec::new()).validate("x").is_err());
        assert!(ParamDistribution::Uniform { min: 0.0, max: 1.0 }.validate("f").is_ok());
    }
}
