//! Result exports (CSV/JSON/text).
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{AnalysisWindow, ArmMode, CanonicalMetrics, Dataset, Granularity, LocalizedReport};
use crate::error::ImpactError;
use crate::report::DetailRow;
use crate::window::InsufficientDataWarning;

/// Machine-readable record of one `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub granularity: Granularity,
    pub arm_mode: ArmMode,
    pub periods: usize,
    pub range_start: Option<NaiveDate>,
    pub range_end: Option<NaiveDate>,
    pub zero_filled_periods: usize,
    pub window: AnalysisWindow,
    pub warnings: Vec<InsufficientDataWarning>,
    pub engine: String,
    pub p_value: Option<f64>,
    pub metrics: Option<CanonicalMetrics>,
    pub normalization_error: Option<String>,
}

/// Write the aligned dataset as `date,treated[,control]`.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), ImpactError> {
    let mut wtr = csv::Writer::from_path(path)?;
    let two_arm = dataset.control.is_some();
    if two_arm {
        wtr.write_record(["date", "treated", "control"])?;
    } else {
        wtr.write_record(["date", "treated"])?;
    }
    for row in dataset.rows() {
        let mut record = vec![row.bucket.to_string(), row.treated.to_string()];
        if let Some(c) = row.control {
            record.push(c.to_string());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write canonical metrics as `indicator,average,cumulative`.
pub fn write_metrics_csv(path: &Path, metrics: &CanonicalMetrics) -> Result<(), ImpactError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["indicator", "average", "cumulative"])?;
    for row in &metrics.rows {
        wtr.write_record([row.indicator.label(), row.average.as_str(), row.cumulative.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_default()
}

/// Write per-bucket detail rows. The `control` column is present only for
/// two-arm datasets.
pub fn write_detail_csv(path: &Path, rows: &[DetailRow], with_control: bool) -> Result<(), ImpactError> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["date", "actual"];
    if with_control {
        header.push("control");
    }
    header.extend([
        "predicted",
        "predicted_lower",
        "predicted_upper",
        "point_effect",
        "point_effect_lower",
        "point_effect_upper",
        "cumulative_actual",
        "cumulative_predicted",
        "cumulative_effect",
    ]);
    wtr.write_record(&header)?;

    for r in rows {
        let mut record = vec![r.date.to_string(), format!("{:.4}", r.actual)];
        if with_control {
            record.push(opt(r.control));
        }
        record.extend([
            opt(r.predicted),
            opt(r.predicted_lower),
            opt(r.predicted_upper),
            opt(r.point_effect),
            opt(r.point_effect_lower),
            opt(r.point_effect_upper),
            opt(r.cumulative_actual),
            opt(r.cumulative_predicted),
            opt(r.cumulative_effect),
        ]);
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the narrative. A `.json` extension yields a JSON array of paragraph
/// strings; anything else plain text.
pub fn write_narrative(path: &Path, report: &LocalizedReport) -> Result<(), ImpactError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let paragraphs: Vec<&str> = report.paragraphs.iter().map(|p| p.text.as_str()).collect();
        write_json(path, &paragraphs)
    } else {
        let mut file = File::create(path)?;
        writeln!(file, "{}", report.to_text())?;
        Ok(())
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ImpactError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}
