//! Formatted terminal output.
//!
//! Formatting lives here so the period/window/engine code stays free of
//! presentation concerns and output changes stay localized.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::domain::{AnalysisWindow, CanonicalMetrics, Dataset, LocalizedReport};
use crate::window::InsufficientDataWarning;

#[derive(Debug, Clone, Tabled)]
struct MetricTableRow {
    #[tabled(rename = "Indicator")]
    indicator: &'static str,
    #[tabled(rename = "Average")]
    average: String,
    #[tabled(rename = "Cumulative")]
    cumulative: String,
}

#[derive(Debug, Clone, Tabled)]
struct DatasetTableRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Treated")]
    treated: String,
    #[tabled(rename = "Control")]
    control: String,
}

/// Dataset overview: coverage per series, common range, zero-filled count.
pub fn format_dataset_summary(dataset: &Dataset) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Granularity: {} | periods={} | {:?}\n",
        dataset.granularity().display_name(),
        dataset.len(),
        dataset.arm_mode()
    ));
    let cov = &dataset.coverage;
    out.push_str(&format!("Treated data: {} .. {}\n", cov.treated.start, cov.treated.end));
    if let Some(c) = &cov.control {
        out.push_str(&format!("Control data: {} .. {}\n", c.start, c.end));
    }
    if let (Some(min), Some(max)) = (dataset.min_date(), dataset.max_date()) {
        out.push_str(&format!("Common range: {min} .. {max}\n"));
    }
    if dataset.zero_filled > 0 {
        out.push_str(&format!(
            "Note: {} period(s) without observations were filled with 0.\n",
            dataset.zero_filled
        ));
    }
    out
}

/// Bucket-by-bucket dataset table.
pub fn format_dataset_table(dataset: &Dataset) -> String {
    let rows: Vec<DatasetTableRow> = dataset
        .rows()
        .map(|r| DatasetTableRow {
            period: r.bucket.to_string(),
            treated: fmt_value(r.treated),
            control: r.control.map(fmt_value).unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    Table::new(rows).with(Style::markdown()).to_string()
}

/// Window dates plus any insufficiency warnings.
pub fn format_window(window: &AnalysisWindow, warnings: &[InsufficientDataWarning]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Pre-period:  {} .. {}\n", window.pre_start, window.pre_end));
    out.push_str(&format!("Post-period: {} .. {}\n", window.post_start, window.post_end));
    for w in warnings {
        out.push_str(&format!("Warning: {w}\n"));
    }
    out
}

/// Canonical metrics as a markdown table.
pub fn format_metrics(metrics: &CanonicalMetrics) -> String {
    let rows: Vec<MetricTableRow> = metrics
        .rows
        .iter()
        .map(|r| MetricTableRow {
            indicator: r.indicator.label(),
            average: r.average.clone(),
            cumulative: r.cumulative.clone(),
        })
        .collect();
    format!(
        "Confidence level: {}%\n{}\n",
        metrics.confidence_level,
        Table::new(rows).with(Style::markdown())
    )
}

pub fn format_report(report: &LocalizedReport) -> String {
    let mut out = report.to_text();
    out.push('\n');
    out
}

fn fmt_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Granularity, Indicator, MetricRow, Observation};
    use crate::period::build;
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, m, day).unwrap()
    }

    #[test]
    fn metrics_table_lists_every_indicator() {
        let metrics = CanonicalMetrics {
            confidence_level: 95,
            rows: Indicator::ORDER
                .iter()
                .map(|&indicator| MetricRow {
                    indicator,
                    average: "1.0".to_string(),
                    cumulative: "2.0".to_string(),
                })
                .collect(),
        };
        let text = format_metrics(&metrics);
        assert!(text.starts_with("Confidence level: 95%"));
        for ind in Indicator::ORDER {
            assert!(text.contains(ind.label()), "missing {}", ind.label());
        }
    }

    #[test]
    fn dataset_summary_mentions_zero_fill() {
        let treated = vec![Observation::new(d(1, 5), 4.0), Observation::new(d(3, 5), 2.5)];
        let ds = build(&treated, None, Granularity::Monthly).unwrap();
        let text = format_dataset_summary(&ds);
        assert!(text.contains("Common range: 2017-01-01 .. 2017-03-01"));
        assert!(text.contains("1 period(s) without observations"));

        let table = format_dataset_table(&ds);
        assert!(table.contains("2017-02-01"));
        assert!(table.contains("2.50"));
    }
}
