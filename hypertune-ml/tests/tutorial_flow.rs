//! End-to-end tests of the tuning walkthrough on the bundled dataset.

use hypertune_ml::config::{DataSource, HypertuneConfig};
use hypertune_ml::data::CsvOptions;
use hypertune_ml::data::builtin::diagnostic_cells;
use hypertune_ml::search::{ParamDistribution, ParamValue};
use hypertune_ml::tutorial::{prepare, run_grid, run_random, run_sweep};
use hypertune_ml::{CrossValidation, run_tutorial, run_verified, train_test_split};
use pretty_assertions::assert_eq;
use std::fmt::Write as _;
use std::path::Path;

/// Default walkthrough with forests small enough for debug builds.
fn small_config() -> HypertuneConfig {
    let mut config = HypertuneConfig::default();
    config.cv = CrossValidation::new(3);
    config.random.n_iter = 3;
    config.random.params.insert(
        "n_estimators".into(),
        ParamDistribution::choice([ParamValue::Int(5), ParamValue::Int(10)]),
    );
    config
}

#[test]
fn test_split_sizes_for_seed_42() {
    let dataset = diagnostic_cells().unwrap();
    assert_eq!(dataset.n_samples(), 569);
    assert_eq!(dataset.class_counts(), vec![212, 357]);

    let split = train_test_split(&dataset, 0.2, 42, false).unwrap();
    assert_eq!(split.x_train.nrows(), 455);
    assert_eq!(split.x_test.nrows(), 114);
    assert_eq!(split.x_train.ncols(), 30);
    assert_eq!(split.y_train.len() + split.y_test.len(), 569);
}

#[test]
fn test_manual_sweep_over_c() {
    let config = small_config();
    let (_, split) = prepare(&config, Path::new(".")).unwrap();
    let sweep = run_sweep(&config, &split).unwrap();

    let expected: Vec<ParamValue> = [0.001, 0.01, 0.1, 1.0, 10.0]
        .into_iter()
        .map(ParamValue::Float)
        .collect();
    let values: Vec<ParamValue> = sweep.points.iter().map(|p| p.value.clone()).collect();
    assert_eq!(values, expected);
    for score in sweep.mean_scores() {
        assert!((0.0..=1.0).contains(&score), "score {score} out of range");
    }
}

#[test]
fn test_grid_search_best_from_declared_grid() {
    let config = small_config();
    let (_, split) = prepare(&config, Path::new(".")).unwrap();
    let result = run_grid(&config, &split).unwrap();

    assert_eq!(result.candidates.len(), 6);
    assert_eq!(result.n_failed(), 0);
    assert!((0.0..=1.0).contains(&result.best_score));
    for (name, value) in &result.best_params {
        assert!(config.grid.params[name].contains(value), "{name} = {value}");
    }
    let test_score = result.test_score.unwrap();
    assert!((0.0..=1.0).contains(&test_score));
    // With this much signal a linear model should do far better than chance.
    assert!(result.best_score > 0.8);
}

#[test]
fn test_bundled_classes_overlap() {
    let config = small_config();
    let (_, split) = prepare(&config, Path::new(".")).unwrap();

    let sweep = run_sweep(&config, &split).unwrap();
    for score in sweep.mean_scores() {
        assert!(score < 0.99, "sweep score {score} saturated");
    }
    let grid = run_grid(&config, &split).unwrap();
    assert!(grid.best_score < 0.99, "grid best {} saturated", grid.best_score);
}

#[test]
fn test_randomized_search_best_from_declared_distributions() {
    let config = small_config();
    let (_, split) = prepare(&config, Path::new(".")).unwrap();
    let result = run_random(&config, &split).unwrap();

    assert_eq!(result.candidates.len(), 3);
    assert!((0.0..=1.0).contains(&result.best_score));
    for (name, value) in &result.best_params {
        assert!(config.random.params[name].contains(value), "{name} = {value}");
    }
    assert!(result.test_score.is_some());
}

#[test]
fn test_same_seed_same_fingerprint() {
    let config = small_config();
    let a = run_tutorial(&config, Path::new(".")).unwrap();
    let b = run_tutorial(&config, Path::new(".")).unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.sweep, b.sweep);
    assert_eq!(a.grid.best_params, b.grid.best_params);
    assert_ne!(a.run_id, b.run_id);

    let mut reseeded = config.clone();
    reseeded.seed = 7;
    let c = run_tutorial(&reseeded, Path::new(".")).unwrap();
    assert_ne!(a.fingerprint, c.fingerprint);
}

#[test]
fn test_verified_run_passes() {
    let mut config = small_config();
    config.sweep.values = vec![ParamValue::Float(1.0)];
    config.random.n_iter = 1;
    let report = run_verified(&config, Path::new(".")).unwrap();
    assert_eq!(report.split.n_train, 455);
    assert_eq!(report.fingerprint.len(), 64);
}

#[test]
fn test_csv_source_matches_builtin() {
    let dataset = diagnostic_cells().unwrap();
    let mut csv = String::from("id,");
    csv.push_str(&dataset.feature_names().join(","));
    csv.push_str(",diagnosis\n");
    for (i, row) in dataset.features().rows().into_iter().enumerate() {
        write!(csv, "{i}").unwrap();
        for value in row {
            // `{:?}` prints the shortest string that parses back to the same f64.
            write!(csv, ",{value:?}").unwrap();
        }
        writeln!(csv, ",{}", dataset.target_names()[dataset.targets()[i]]).unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cells.csv"), csv).unwrap();

    let mut options = CsvOptions::new("diagnosis");
    options.drop_columns = vec!["id".into()];
    options.class_order = vec!["malignant".into(), "benign".into()];
    let mut config = small_config();
    config.data.source = DataSource::Csv {
        path: "cells.csv".into(),
        options,
    };

    let (loaded, split) = prepare(&config, dir.path()).unwrap();
    assert_eq!(loaded.n_samples(), 569);
    assert_eq!(loaded.n_features(), 30);
    assert_eq!(loaded.targets(), dataset.targets());
    assert_eq!(loaded.features(), dataset.features());
    assert_eq!(split.x_test.nrows(), 114);
}
