//! In-memory labelled tables.

use crate::error::MlError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A numeric feature matrix with one class label per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    feature_names: Vec<String>,
    target_names: Vec<String>,
    features: Array2<f64>,
    targets: Vec<usize>,
}

/// Serializable description of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub target_names: Vec<String>,
    pub class_counts: Vec<usize>,
}

/// Options for `Dataset::from_csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Column holding the class name of each row.
    pub label_column: String,
    /// Columns skipped entirely (ids and the like).
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Explicit class order; when empty, classes are indexed in first-seen order.
    #[serde(default)]
    pub class_order: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl CsvOptions {
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
            drop_columns: Vec::new(),
            class_order: Vec::new(),
            delimiter: default_delimiter(),
        }
    }
}

impl Dataset {
    pub fn new(
        name: impl Into<String>,
        feature_names: Vec<String>,
        target_names: Vec<String>,
        features: Array2<f64>,
        targets: Vec<usize>,
    ) -> Result<Self, MlError> {
        let (rows, cols) = features.dim();
        if rows == 0 || cols == 0 {
            return Err(MlError::dataset("dataset must have at least one sample and one feature"));
        }
        if rows != targets.len() {
            return Err(MlError::dataset(format!(
                "{rows} feature rows but {} labels",
                targets.len()
            )));
        }
        if feature_names.len() != cols {
            return Err(MlError::dataset(format!(
                "{cols} feature columns but {} feature names",
                feature_names.len()
            )));
        }
        if let Some(bad) = targets.iter().find(|&&t| t >= target_names.len()) {
            return Err(MlError::dataset(format!(
                "label {bad} has no target name ({} classes)",
                target_names.len()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(MlError::dataset("features contain NaN or infinite values"));
        }
        Ok(Self {
            name: name.into(),
            feature_names,
            target_names,
            features,
            targets,
        })
    }

    /// Load a table whose header names every column and whose label column
    /// holds class names.
    pub fn from_csv(path: &Path, options: &CsvOptions) -> Result<Self, MlError> {
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "csv".to_string());
        Self::parse_csv(&name, &content, options)
    }

    pub(crate) fn parse_csv(
        name: &str,
        content: &str,
        options: &CsvOptions,
    ) -> Result<Self, MlError> {
        let mut lines = content.lines().enumerate();

        let header: Vec<String> = lines
            .next()
            .ok_or_else(|| MlError::dataset("Empty CSV file"))?
            .1
            .split(options.delimiter)
            .map(|s| s.trim().trim_matches('"').to_string())
            .collect();

        let label_idx = header
            .iter()
            .position(|c| *c == options.label_column)
            .ok_or_else(|| {
                MlError::dataset(format!("label column '{}' not in header", options.label_column))
            })?;
        let feature_cols: Vec<usize> = (0..header.len())
            .filter(|&i| i != label_idx && !options.drop_columns.contains(&header[i]))
            .collect();
        let feature_names: Vec<String> = feature_cols.iter().map(|&i| header[i].clone()).collect();

        let mut target_names = options.class_order.clone();
        let mut class_index: HashMap<String, usize> = target_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        let mut values = Vec::new();
        let mut targets = Vec::new();
        for (line_no, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line
                .split(options.delimiter)
                .map(|s| s.trim().trim_matches('"'))
                .collect();
            if cells.len() != header.len() {
                return Err(MlError::dataset(format!(
                    "line {}: expected {} cells, found {}",
                    line_no + 1,
                    header.len(),
                    cells.len()
                )));
            }

            let label = cells[label_idx];
            let class = match class_index.get(label) {
                Some(&c) => c,
                None if options.class_order.is_empty() => {
                    let c = target_names.len();
                    target_names.push(label.to_string());
                    class_index.insert(label.to_string(), c);
                    c
                }
                None => {
                    return Err(MlError::dataset(format!(
                        "line {}: class '{label}' not in class_order",
                        line_no + 1
                    )));
                }
            };
            targets.push(class);

            for &col in &feature_cols {
                let v: f64 = cells[col].parse().map_err(|_| {
                    MlError::dataset(format!(
                        "line {}: column '{}' is not numeric: '{}'",
                        line_no + 1,
                        header[col],
                        cells[col]
                    ))
                })?;
                values.push(v);
            }
        }

        let features = Array2::from_shape_vec((targets.len(), feature_names.len()), values)
            .map_err(|e| MlError::dataset(format!("shape mismatch: {e}")))?;
        Self::new(name, feature_names, target_names, features, targets)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.target_names.len()
    }

    pub fn class_counts(&self) -> Vec<usize> {
        class_counts(&self.targets, self.n_classes())
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            name: self.name.clone(),
            n_samples: self.n_samples(),
            n_features: self.n_features(),
            target_names: self.target_names.clone(),
            class_counts: self.class_counts(),
        }
    }
}

/// Count labels per class.
pub fn class_counts(targets: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &t in targets {
        if t >= counts.len() {
            counts.resize(t + 1, 0);
        }
        counts[t] += 1;
    }
    counts
}
