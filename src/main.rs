use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use covmetrics::cli::{cmd_evaluate, cmd_summary, read_tree, EvaluateInput, Style};
use covmetrics::config::RecorderConfig;
use covmetrics::gate::BuildResult;

/// covmetrics: coverage statistics, reference deltas and quality gates for metric trees.
#[derive(Parser)]
#[command(name = "covmetrics", version, about)]
struct Cli {
    /// Increase log verbosity (-v, -vv). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute statistics and evaluate the configured quality gates.
    Evaluate {
        /// Metric tree (JSON) of a coverage report. May be repeated.
        #[arg(long = "tree", required = true)]
        trees: Vec<PathBuf>,

        /// Metric tree (JSON) of a test report. May be repeated.
        #[arg(long = "tests")]
        tests: Vec<PathBuf>,

        /// Metric tree (JSON) of the reference build.
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Unified diff between the reference and the current build.
        #[arg(long)]
        diff: Option<PathBuf>,

        /// Recorder configuration (TOML) with the quality gates.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output style.
        #[arg(long, value_enum, default_value_t = Style::Text)]
        style: Style,
    },

    /// Show the aggregated values of a metric tree.
    Summary {
        /// Metric tree (JSON).
        #[arg(long)]
        tree: PathBuf,

        /// Output style.
        #[arg(long, value_enum, default_value_t = Style::Text)]
        style: Style,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();
    debug!("covmetrics started with verbosity level: {}", cli.verbose);

    match cli.command {
        Commands::Evaluate {
            trees,
            tests,
            reference,
            diff,
            config,
            style,
        } => {
            let config = match config {
                Some(path) => RecorderConfig::load(&path)
                    .with_context(|| format!("Failed to load configuration {}", path.display()))?,
                None => RecorderConfig::default(),
            };
            let input = EvaluateInput {
                coverage: trees.iter().map(|path| read_tree(path)).collect::<Result<_>>()?,
                tests: tests.iter().map(|path| read_tree(path)).collect::<Result<_>>()?,
                reference: reference.as_deref().map(read_tree).transpose()?,
                diff: diff
                    .map(|path| {
                        std::fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read diff {}", path.display()))
                    })
                    .transpose()?,
            };
            let output = cmd_evaluate(input, &config, style)?;
            print!("{}", output.text);
            Ok(match output.build_result {
                BuildResult::Success => ExitCode::SUCCESS,
                BuildResult::Unstable => ExitCode::from(2),
                BuildResult::Failure => ExitCode::FAILURE,
            })
        }
        Commands::Summary { tree, style } => {
            let tree = read_tree(&tree)?;
            print!("{}", cmd_summary(&tree, style)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
