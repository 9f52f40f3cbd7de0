//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - builds the session dataset and window
//! - runs the engine, normalizer, and translator
//! - prints reports/plots
//! - writes optional exports

use std::sync::Arc;

use clap::Parser;

use crate::cli::{Cli, Command, DatasetArgs, NormalizeArgs, RunArgs, TranslateArgs, WindowCmdArgs};
use crate::config::{Overrides, Settings};
use crate::engine::RegressionEngine;
use crate::error::AppError;
use crate::io::export::{RunSummary, write_dataset_csv, write_detail_csv, write_json, write_metrics_csv, write_narrative};
use crate::report::format::{format_dataset_summary, format_dataset_table, format_metrics, format_report, format_window};
use crate::report::{normalize_text, translate};

pub mod pipeline;
pub mod session;

/// Entry point for the `impact` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Dataset(args) => handle_dataset(args),
        Command::Window(args) => handle_window(args),
        Command::Run(args) => handle_run(args),
        Command::Normalize(args) => handle_normalize(args),
        Command::Translate(args) => handle_translate(args),
    }
}

fn handle_dataset(args: DatasetArgs) -> Result<(), AppError> {
    let session = pipeline::load_session(&args.input)?;
    println!("{}", format_dataset_summary(session.dataset()));
    println!("{}", format_dataset_table(session.dataset()));

    if let Some(path) = &args.export {
        write_dataset_csv(path, session.dataset())?;
    }
    Ok(())
}

fn handle_window(args: WindowCmdArgs) -> Result<(), AppError> {
    let mut session = pipeline::load_session(&args.input)?;
    println!("{}", format_dataset_summary(session.dataset()));
    pipeline::apply_window(&mut session, &args.window)?;
    if let Some(v) = session.window() {
        println!("{}", format_window(&v.window, &v.warnings));
    }
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?.with_overrides(Overrides {
        confidence: args.confidence,
        draws: args.draws,
        seed: args.seed,
        fit_timeout_secs: args.fit_timeout_secs,
    })?;

    let mut session = pipeline::load_session(&args.input)?;
    println!("{}", format_dataset_summary(session.dataset()));
    pipeline::apply_window(&mut session, &args.window)?;
    let warnings = session.window().map(|v| v.warnings.clone()).unwrap_or_default();

    let engine = Arc::new(RegressionEngine);
    let engine_name = crate::engine::ImpactEngine::name(engine.as_ref()).to_string();
    let run = pipeline::run_analysis(&session, engine, &settings, args.summary_shape)?;

    println!("{}", format_window(&run.window, &warnings));
    match &run.metrics {
        Ok(metrics) => println!("{}", format_metrics(metrics)),
        Err(message) => eprintln!("Canonical metrics unavailable: {message}"),
    }
    if args.show_english {
        println!("{}\n", run.fitted.report);
    }
    println!("{}", format_report(&run.narrative));

    if args.plot {
        println!(
            "{}",
            crate::plot::render_impact_plot(&run.detail, run.window.post_start, args.width, args.height)
        );
    }

    // Optional exports.
    if let (Some(path), Ok(metrics)) = (&args.export_metrics, &run.metrics) {
        write_metrics_csv(path, metrics)?;
    }
    if let Some(path) = &args.export_detail {
        write_detail_csv(path, &run.detail, session.dataset().control.is_some())?;
    }
    if let Some(path) = &args.export_narrative {
        write_narrative(path, &run.narrative)?;
    }
    if let Some(path) = &args.export_summary {
        let dataset = session.dataset();
        let summary = RunSummary {
            granularity: dataset.granularity(),
            arm_mode: dataset.arm_mode(),
            periods: dataset.len(),
            range_start: dataset.min_date(),
            range_end: dataset.max_date(),
            zero_filled_periods: session.zero_filled(),
            window: run.window,
            warnings,
            engine: engine_name,
            p_value: run.fitted.p_value,
            metrics: run.metrics.as_ref().ok().cloned(),
            normalization_error: run.metrics.as_ref().err().cloned(),
        };
        write_json(path, &summary)?;
    }
    Ok(())
}

fn handle_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let text = read_text(&args.summary)?;
    let metrics = normalize_text(&text, args.confidence)?;
    println!("{}", format_metrics(&metrics));
    if let Some(path) = &args.export {
        write_metrics_csv(path, &metrics)?;
    }
    Ok(())
}

fn handle_translate(args: TranslateArgs) -> Result<(), AppError> {
    let text = read_text(&args.report)?;
    let report = translate(&text, args.confidence);
    match &args.export {
        Some(path) => write_narrative(path, &report)?,
        None => println!("{}", format_report(&report)),
    }
    Ok(())
}

fn read_text(path: &std::path::Path) -> Result<String, AppError> {
    std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", path.display())))
}
