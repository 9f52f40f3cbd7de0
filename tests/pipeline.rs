use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use impact_scope::app::pipeline::{apply_window, load_session, run_analysis};
use impact_scope::cli::{InputArgs, WindowArgs};
use impact_scope::config::Settings;
use impact_scope::domain::{AnalysisWindow, Granularity, Indicator, Observation};
use impact_scope::engine::{RegressionEngine, SummaryShape};
use impact_scope::error::{ImpactError, WindowViolation};
use impact_scope::io::export::{write_detail_csv, write_metrics_csv, write_narrative};
use impact_scope::period::{aggregate, build, resolve_observations};
use impact_scope::report::translate_text;
use impact_scope::window::validate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn monthly(from: u32, to: u32) -> Vec<Observation> {
    (from..=to).map(|m| Observation::new(d(2017, m, 12), 10.0)).collect()
}

#[test]
fn monthly_aggregation_example() {
    let obs = vec![
        Observation::new(d(2017, 4, 3), 29.0),
        Observation::new(d(2017, 4, 25), 24.0),
        Observation::new(d(2017, 5, 23), 24.0),
    ];
    let series = aggregate(&obs, Granularity::Monthly);
    let pairs: Vec<(NaiveDate, f64)> = series.buckets.iter().map(|b| (b.bucket.date(), b.total)).collect();
    assert_eq!(pairs, vec![(d(2017, 4, 1), 53.0), (d(2017, 5, 1), 24.0)]);
}

#[test]
fn overlapping_series_share_four_months() {
    let range = resolve_observations(&monthly(1, 6), Some(&monthly(3, 8)), Granularity::Monthly);
    let dates: Vec<NaiveDate> = range.buckets.iter().map(|b| b.date()).collect();
    assert_eq!(dates, vec![d(2017, 3, 1), d(2017, 4, 1), d(2017, 5, 1), d(2017, 6, 1)]);
}

#[test]
fn disjoint_series_are_a_range_error() {
    let err = build(&monthly(1, 3), Some(&monthly(6, 8)), Granularity::Monthly).unwrap_err();
    assert!(matches!(err, ImpactError::NoCommonPeriod { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn window_starting_inside_pre_period_is_rejected() {
    let ds = build(&monthly(1, 3), Some(&monthly(1, 3)), Granularity::Monthly).unwrap();
    let window = AnalysisWindow {
        pre_start: d(2017, 1, 1),
        pre_end: d(2017, 1, 31),
        post_start: d(2017, 1, 15),
        post_end: d(2017, 2, 28),
    };
    let err = validate(&window, &ds).unwrap_err();
    assert!(matches!(err, ImpactError::Window(WindowViolation::Overlap { .. })));
}

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[(NaiveDate, f64)]) -> PathBuf {
    let path = dir.join(name);
    let mut text = format!("{header}\n");
    for (date, value) in rows {
        text.push_str(&format!("{},{value}\n", date.format("%Y%m%d")));
    }
    std::fs::write(&path, text).unwrap();
    path
}

/// Daily rows: control grows steadily, treated follows it and jumps from October.
fn daily_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let mut treated = Vec::new();
    let mut control = Vec::new();
    let mut date = d(2018, 1, 1);
    while date <= d(2018, 12, 31) {
        let month = chrono::Datelike::month(&date) as f64;
        let day = chrono::Datelike::day(&date) as f64;
        let c = 20.0 + month + (day % 3.0);
        let lift = if month >= 10.0 { 8.0 } else { 0.0 };
        control.push((date, c));
        treated.push((date, 1.5 * c + lift));
        date = date.succ_opt().unwrap();
    }
    (
        write_csv(dir, "treated.csv", "date,quantity", &treated),
        write_csv(dir, "control.csv", "Day,Value", &control),
    )
}

#[test]
fn csv_to_exports_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (treated, control) = daily_inputs(dir.path());
    let input = InputArgs {
        treated,
        control: Some(control),
        granularity: Granularity::Monthly,
        date_column: None,
        value_column: None,
        positional_columns: false,
    };

    let mut session = load_session(&input).unwrap();
    assert_eq!(session.dataset().len(), 12);
    assert_eq!(session.zero_filled(), 0);

    let window = WindowArgs {
        pre_start: None,
        pre_end: Some(d(2018, 9, 30)),
        post_start: Some(d(2018, 10, 2)),
        post_end: None,
    };
    apply_window(&mut session, &window).unwrap();
    assert!(session.window().unwrap().warnings.is_empty());

    let run = run_analysis(
        &session,
        Arc::new(RegressionEngine),
        &Settings::default(),
        SummaryShape::Textual,
    )
    .unwrap();

    let metrics = run.metrics.as_ref().unwrap();
    let p = metrics.get(Indicator::PValue).unwrap();
    assert_eq!(p.average, p.cumulative);
    let rel = metrics.get(Indicator::RelativeEffect).unwrap();
    assert!(rel.average.ends_with('%'));
    assert_eq!(rel.average, rel.cumulative);

    let metrics_path = dir.path().join("metrics.csv");
    write_metrics_csv(&metrics_path, metrics).unwrap();
    let metrics_csv = std::fs::read_to_string(&metrics_path).unwrap();
    assert_eq!(metrics_csv.lines().count(), 9);
    assert!(metrics_csv.starts_with("indicator,average,cumulative\nactual,"));

    let detail_path = dir.path().join("detail.csv");
    write_detail_csv(&detail_path, &run.detail, true).unwrap();
    let detail_csv = std::fs::read_to_string(&detail_path).unwrap();
    let lines: Vec<&str> = detail_csv.lines().collect();
    assert!(lines[0].starts_with("date,actual,control,predicted"));
    // January: pre-period, no cumulative cells.
    assert!(lines[1].ends_with(",,,"));
    // December: last post-period row carries running totals.
    assert!(!lines[12].ends_with(','));

    let narrative_path = dir.path().join("narrative.txt");
    write_narrative(&narrative_path, &run.narrative).unwrap();
    let narrative = std::fs::read_to_string(&narrative_path).unwrap();
    assert!(narrative.contains("分析レポート"));
    assert!(!narrative.contains("\n\n\n"));
}

#[test]
fn translating_engine_report_twice_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let (treated, control) = daily_inputs(dir.path());
    let input = InputArgs {
        treated,
        control: Some(control),
        granularity: Granularity::Monthly,
        date_column: None,
        value_column: None,
        positional_columns: false,
    };
    let mut session = load_session(&input).unwrap();
    apply_window(&mut session, &WindowArgs::default()).unwrap();
    let run = run_analysis(
        &session,
        Arc::new(RegressionEngine),
        &Settings::default(),
        SummaryShape::Structured,
    )
    .unwrap();

    let once = translate_text(&run.fitted.report, 0.95);
    assert_eq!(translate_text(&once, 0.95), once);
}
