//! Hypertune CLI: a walkthrough of manual, grid and randomized hyperparameter search.

mod commands;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Hypertune: tune a classifier three ways and compare the results
#[derive(Parser, Debug)]
#[command(name = "hypertune", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the full walkthrough: split, manual sweep, grid search, randomized search
    Run {
        #[command(flatten)]
        step: StepArgs,

        /// Run twice and fail if the results differ
        #[arg(long)]
        verify: bool,
    },
    /// Manual sweep of one hyperparameter
    Sweep(StepArgs),
    /// Exhaustive grid search
    Grid(StepArgs),
    /// Randomized search over parameter distributions
    Random(StepArgs),
    /// Summarise the dataset
    Dataset {
        /// Load a CSV file instead of the configured source
        #[arg(long, requires = "label_column")]
        csv: Option<PathBuf>,

        /// Column holding the class names
        #[arg(long)]
        label_column: Option<String>,

        /// Columns to ignore (repeatable)
        #[arg(long = "drop")]
        drop_columns: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
struct StepArgs {
    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration to the workspace
    Init,
    /// Print the effective configuration
    Show,
}

/// Level for the stderr layer when `RUST_LOG` is unset.
fn stderr_level(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the stderr layer and, unless `quiet`, a daily JSON log under the
/// data dir. The returned guard flushes the file writer on drop.
fn init_tracing(verbose: u8, quiet: bool) -> Option<WorkerGuard> {
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(stderr_level(verbose, quiet)));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let log_dir = (!quiet)
        .then(|| directories::ProjectDirs::from("dev", "hypertune", "hypertune"))
        .flatten()
        .map(|dirs| dirs.data_dir().join("logs"))
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let (json_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "hypertune.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("hypertune=debug,hypertune_ml=debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.quiet);

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref())
}
