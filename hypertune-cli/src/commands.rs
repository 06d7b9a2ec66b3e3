//! CLI subcommand handlers.

use crate::render;
use crate::{Commands, ConfigAction, StepArgs};
use hypertune_ml::config::{
    ConfigOverrides, HypertuneConfig, config_exists, load_config, workspace_config_path,
};
use hypertune_ml::data::{CsvOptions, Dataset};
use hypertune_ml::tutorial::{self, run_tutorial, run_verified};
use serde::Serialize;
use std::path::Path;

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run { step, verify } => handle_run(&step, verify, workspace, config_file),
        Commands::Sweep(step) => handle_sweep(&step, workspace, config_file),
        Commands::Grid(step) => handle_grid(&step, workspace, config_file),
        Commands::Random(step) => handle_random(&step, workspace, config_file),
        Commands::Dataset {
            csv,
            label_column,
            drop_columns,
            json,
        } => {
            let dataset = match (csv, label_column) {
                (Some(path), Some(label)) => {
                    let mut options = CsvOptions::new(label);
                    options.drop_columns = drop_columns;
                    Dataset::from_csv(&workspace.join(path), &options)?
                }
                _ => load(workspace, config_file, None)?
                    .data
                    .source
                    .load(workspace)?,
            };
            let summary = dataset.summary();
            emit(json, &summary, || render::dataset(&summary))
        }
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

/// Load and validate the layered configuration.
fn load(
    workspace: &Path,
    config_file: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<HypertuneConfig> {
    let overrides = ConfigOverrides { seed };
    let config = load_config(Some(workspace), config_file, Some(&overrides))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if config_file.is_none() && !config_exists(Some(workspace)) {
        tracing::info!(
            hint = "hypertune config init",
            "No configuration file found, using defaults"
        );
    }
    config.validate()?;
    Ok(config)
}

fn emit<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

fn handle_run(
    step: &StepArgs,
    verify: bool,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load(workspace, config_file, step.seed)?;
    let report = if verify {
        run_verified(&config, workspace)?
    } else {
        run_tutorial(&config, workspace)?
    };
    emit(step.json, &report, || render::tutorial(&report))
}

fn handle_sweep(
    step: &StepArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load(workspace, config_file, step.seed)?;
    let (_, split) = tutorial::prepare(&config, workspace)?;
    let result = tutorial::run_sweep(&config, &split)?;
    emit(step.json, &result, || render::sweep(&result))
}

fn handle_grid(
    step: &StepArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load(workspace, config_file, step.seed)?;
    let (_, split) = tutorial::prepare(&config, workspace)?;
    let result = tutorial::run_grid(&config, &split)?;
    emit(step.json, &result, || render::search("Grid search", &result))
}

fn handle_random(
    step: &StepArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load(workspace, config_file, step.seed)?;
    let (_, split) = tutorial::prepare(&config, workspace)?;
    let result = tutorial::run_random(&config, &split)?;
    emit(step.json, &result, || render::search("Randomized search", &result))
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = HypertuneConfig::default().to_toml()?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file, None)?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
