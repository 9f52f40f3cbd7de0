//! Command-line parsing for the causal-impact workflow.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! command dispatch (`app`) and from the analysis code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::Granularity;
use crate::engine::SummaryShape;
use crate::io::ingest::{LoadOptions, parse_date};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "impact", version, about = "Before/after causal-impact analysis of aggregated time series")]
pub struct Cli {
    /// Increase log verbosity on stderr (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate the input series and print the aligned, zero-filled dataset.
    Dataset(DatasetArgs),
    /// Print the default analysis window and validate optional overrides.
    Window(WindowCmdArgs),
    /// Full analysis: dataset, window, fit, canonical metrics, translated narrative.
    Run(RunArgs),
    /// Normalize a saved tabular summary text into canonical metrics.
    Normalize(NormalizeArgs),
    /// Translate a saved English narrative report.
    Translate(TranslateArgs),
}

/// Series inputs shared by every dataset-building command.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Treated (response) series CSV.
    #[arg(long, value_name = "CSV")]
    pub treated: PathBuf,

    /// Optional control series CSV (enables the two-arm design).
    #[arg(long, value_name = "CSV")]
    pub control: Option<PathBuf>,

    /// Bucket size used to aggregate observations.
    #[arg(short = 'g', long, value_enum, default_value_t = Granularity::Monthly)]
    pub granularity: Granularity,

    /// Name of the date column (default: date/day/ds).
    #[arg(long)]
    pub date_column: Option<String>,

    /// Name of the value column (default: value/quantity/qty/count/y).
    #[arg(long)]
    pub value_column: Option<String>,

    /// Use the first two columns as date/value when no named columns match.
    #[arg(long)]
    pub positional_columns: bool,
}

impl InputArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            date_column: self.date_column.clone(),
            value_column: self.value_column.clone(),
            positional_columns: self.positional_columns,
        }
    }
}

/// Optional window overrides; each date is snapped to its period.
#[derive(Debug, Args, Clone, Default)]
pub struct WindowArgs {
    #[arg(long, value_parser = parse_cli_date)]
    pub pre_start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_cli_date)]
    pub pre_end: Option<NaiveDate>,
    #[arg(long, value_parser = parse_cli_date)]
    pub post_start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_cli_date)]
    pub post_end: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct DatasetArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write the aligned dataset to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct WindowCmdArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Summary representation requested from the engine.
    #[arg(long, value_enum, default_value_t = SummaryShape::Structured)]
    pub summary_shape: SummaryShape,

    /// Interval coverage in (0, 1) [env: IMPACT_CONFIDENCE, default 0.95].
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Simulated counterfactual paths [env: IMPACT_DRAWS, default 1000].
    #[arg(long)]
    pub draws: Option<usize>,

    /// Random seed [env: IMPACT_SEED, default 42].
    #[arg(long)]
    pub seed: Option<u64>,

    /// Abort the fit after this many seconds [env: IMPACT_FIT_TIMEOUT_SECS].
    #[arg(long)]
    pub fit_timeout_secs: Option<u64>,

    /// Also print the engine's English report.
    #[arg(long)]
    pub show_english: bool,

    /// Render an ASCII plot of actual vs predicted.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export canonical metrics to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_metrics: Option<PathBuf>,

    /// Export per-period detail rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_detail: Option<PathBuf>,

    /// Export the translated narrative (`.json` for a paragraph array, else text).
    #[arg(long, value_name = "PATH")]
    pub export_narrative: Option<PathBuf>,

    /// Export a JSON run summary.
    #[arg(long, value_name = "JSON")]
    pub export_summary: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Tabular summary text file.
    #[arg(long, value_name = "TXT")]
    pub summary: PathBuf,

    /// Confidence level shown in the table header.
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,

    /// Export canonical metrics to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TranslateArgs {
    /// English narrative report file.
    #[arg(long, value_name = "TXT")]
    pub report: PathBuf,

    /// Confidence level substituted into the translated text.
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,

    /// Write the translation (`.json` for a paragraph array, else text).
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

fn parse_cli_date(s: &str) -> Result<NaiveDate, String> {
    parse_date(s)
}
