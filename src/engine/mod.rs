//! Statistical engine seam.
//!
//! The causal-impact fit itself is an external collaborator. This module defines
//! the interface the rest of the crate consumes:
//!
//! - `SeriesTable`: date-indexed treated (+ optional control) columns
//! - `ImpactEngine::fit(table, pre, post, options) -> FittedResult`
//! - `FittedResultShape`: the summary arrives either as a structured table or as
//!   the engine's tabular text report
//!
//! `regression` provides a self-contained reference engine so the binary works
//! end to end; `render` produces the English summary/report text it returns.

pub mod regression;
pub mod render;

pub use regression::RegressionEngine;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{AnalysisWindow, Dataset};
use crate::error::ImpactError;

/// Input table handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    pub dates: Vec<NaiveDate>,
    pub treated: Vec<f64>,
    pub control: Option<Vec<f64>>,
}

impl From<&Dataset> for SeriesTable {
    fn from(ds: &Dataset) -> Self {
        Self {
            dates: ds.range.buckets.iter().map(|b| b.date()).collect(),
            treated: ds.treated.clone(),
            control: ds.control.clone(),
        }
    }
}

impl SeriesTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Row indices whose date lies in `[start, end]`.
    pub fn indices_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<usize> {
        self.dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= start && **d <= end)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Which summary representation the engine should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SummaryShape {
    Structured,
    Textual,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Interval coverage, e.g. `0.95`.
    pub confidence: f64,
    /// Number of simulated counterfactual paths.
    pub draws: usize,
    pub seed: u64,
    pub summary_shape: SummaryShape,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            draws: 1000,
            seed: 42,
            summary_shape: SummaryShape::Structured,
        }
    }
}

impl EngineOptions {
    pub fn alpha(&self) -> f64 {
        1.0 - self.confidence
    }
}

/// One row of a structured summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryCell {
    pub average: f64,
    pub cumulative: f64,
}

/// Structured summary keyed by field name (`actual`, `predicted_lower`, ...).
///
/// Relative-effect fields are fractions (`0.4027` for 40.27%). Field names vary
/// between engine versions; lookups go through [`SummaryTable::lookup`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub fields: BTreeMap<String, SummaryCell>,
}

impl SummaryTable {
    pub fn insert(&mut self, name: &str, average: f64, cumulative: f64) {
        self.fields.insert(name.to_string(), SummaryCell { average, cumulative });
    }

    /// First finite cell among `names`.
    pub fn lookup(&self, names: &[&str]) -> Option<SummaryCell> {
        names
            .iter()
            .filter_map(|n| self.fields.get(*n))
            .find(|c| c.average.is_finite() && c.cumulative.is_finite())
            .copied()
    }
}

/// Summary representation returned by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedResultShape {
    /// Field table, optionally accompanied by the tabular text for fallback.
    Structured { table: SummaryTable, text: Option<String> },
    /// Tabular text report only.
    Textual(String),
}

/// Per-bucket counterfactual estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointEstimate {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedResult {
    /// Free-text narrative report (English).
    pub report: String,
    pub summary: FittedResultShape,
    pub p_value: Option<f64>,
    /// Per-bucket estimates; empty when the engine does not expose them.
    pub points: Vec<PointEstimate>,
}

/// A causal-impact fitting engine.
pub trait ImpactEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(
        &self,
        table: &SeriesTable,
        pre_period: (NaiveDate, NaiveDate),
        post_period: (NaiveDate, NaiveDate),
        options: &EngineOptions,
    ) -> Result<FittedResult, ImpactError>;
}

/// Run `engine` once for `window`, optionally bounded by `timeout`.
///
/// With a timeout the fit runs on a worker thread; on expiry the worker is left
/// to finish in the background and its result is discarded. Failures are
/// returned as-is, never retried.
pub fn fit_with_timeout(
    engine: Arc<dyn ImpactEngine>,
    table: SeriesTable,
    window: AnalysisWindow,
    options: EngineOptions,
    timeout: Option<Duration>,
) -> Result<FittedResult, ImpactError> {
    info!(
        engine = engine.name(),
        rows = table.len(),
        draws = options.draws,
        "fitting"
    );

    let Some(timeout) = timeout else {
        return engine.fit(&table, window.pre_period(), window.post_period(), &options);
    };

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = engine.fit(&table, window.pre_period(), window.post_period(), &options);
        // The receiver may be gone after a timeout.
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(seconds = timeout.as_secs(), "engine timed out");
            Err(ImpactError::EngineTimeout(timeout.as_secs()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ImpactError::engine("engine worker exited without a result")),
    }
}
