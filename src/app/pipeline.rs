//! Shared analysis pipeline used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> dataset -> window -> fit -> normalize -> translate -> detail rows
//!
//! The command handlers can then focus on presentation (printing vs exports).

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::session::SessionContext;
use crate::cli::{InputArgs, WindowArgs};
use crate::config::Settings;
use crate::domain::{AnalysisWindow, CanonicalMetrics, LocalizedReport, Observation};
use crate::engine::{FittedResult, ImpactEngine, SeriesTable, SummaryShape, fit_with_timeout};
use crate::error::ImpactError;
use crate::io::ingest::{LoadOptions, RowError, load_observations};
use crate::report::{DetailRow, detail_rows, normalize, translate};
use crate::window::window_from_overrides;

/// All computed outputs of a single `impact run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub window: AnalysisWindow,
    pub fitted: FittedResult,
    /// `Err` carries the normalization failure message; the run still succeeds.
    pub metrics: Result<CanonicalMetrics, String>,
    pub narrative: LocalizedReport,
    pub detail: Vec<DetailRow>,
}

/// Load one series, logging row-level problems.
pub fn load_series(path: &Path, options: &LoadOptions) -> Result<Vec<Observation>, ImpactError> {
    let loaded = load_observations(path, options)?;
    report_row_errors(path, &loaded.row_errors);
    Ok(loaded.observations)
}

fn report_row_errors(path: &Path, errors: &[RowError]) {
    for e in errors.iter().take(10) {
        warn!(path = %path.display(), line = e.line, "skipped row: {}", e.message);
    }
    if errors.len() > 10 {
        warn!(path = %path.display(), "{} more rows skipped", errors.len() - 10);
    }
}

/// Load inputs and build the session dataset.
pub fn load_session(input: &InputArgs) -> Result<SessionContext, ImpactError> {
    let options = input.load_options();
    let treated = load_series(&input.treated, &options)?;
    let control = input
        .control
        .as_deref()
        .map(|p| load_series(p, &options))
        .transpose()?;
    SessionContext::new(treated, control, input.granularity)
}

/// Resolve and validate the window (defaults filled in for missing fields).
pub fn apply_window(session: &mut SessionContext, args: &WindowArgs) -> Result<(), ImpactError> {
    let window = window_from_overrides(
        session.dataset(),
        args.pre_start,
        args.pre_end,
        args.post_start,
        args.post_end,
    )?;
    session.set_window(window)?;
    Ok(())
}

/// Fit, normalize, translate, and build detail rows for a validated session.
pub fn run_analysis(
    session: &SessionContext,
    engine: Arc<dyn ImpactEngine>,
    settings: &Settings,
    summary_shape: SummaryShape,
) -> Result<RunOutput, ImpactError> {
    let window = session
        .window()
        .map(|w| w.window)
        .ok_or_else(|| ImpactError::data("no validated analysis window"))?;
    let dataset = session.dataset();

    let fitted = fit_with_timeout(
        engine,
        SeriesTable::from(dataset),
        window,
        settings.engine_options(summary_shape),
        settings.fit_timeout(),
    )?;
    info!(p_value = ?fitted.p_value, points = fitted.points.len(), "fit finished");

    let metrics = normalize(&fitted, settings.confidence).map_err(|e| {
        warn!(error = %e, "canonical metrics unavailable");
        e.to_string()
    });
    let narrative = translate(&fitted.report, settings.confidence);
    let detail = detail_rows(dataset, &window, &fitted.points);

    Ok(RunOutput {
        window,
        fitted,
        metrics,
        narrative,
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Granularity, Indicator};
    use crate::engine::{FittedResultShape, RegressionEngine};
    use chrono::NaiveDate;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, m, 10).unwrap()
    }

    fn session() -> SessionContext {
        let control: Vec<Observation> = (1..=12).map(|m| Observation::new(d(m), 50.0 + 2.0 * m as f64)).collect();
        let treated: Vec<Observation> = control
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let wiggle = if i % 2 == 0 { 0.5 } else { -0.5 };
                let lift = if i >= 8 { 30.0 } else { 0.0 };
                Observation::new(o.date, o.value + 10.0 + wiggle + lift)
            })
            .collect();
        SessionContext::new(treated, Some(control), Granularity::Monthly).unwrap()
    }

    #[test]
    fn run_requires_validated_window() {
        let err = run_analysis(
            &session(),
            Arc::new(RegressionEngine),
            &Settings::default(),
            SummaryShape::Structured,
        )
        .unwrap_err();
        assert!(matches!(err, ImpactError::Data(_)));
    }

    #[test]
    fn structured_and_textual_runs_agree() {
        let mut s = session();
        let args = WindowArgs {
            post_start: Some(NaiveDate::from_ymd_opt(2019, 9, 20).unwrap()),
            ..WindowArgs::default()
        };
        apply_window(&mut s, &args).unwrap();
        assert_eq!(s.window().unwrap().window.post_start, NaiveDate::from_ymd_opt(2019, 9, 1).unwrap());

        let settings = Settings::default();
        let a = run_analysis(&s, Arc::new(RegressionEngine), &settings, SummaryShape::Structured).unwrap();
        let b = run_analysis(&s, Arc::new(RegressionEngine), &settings, SummaryShape::Textual).unwrap();
        assert!(matches!(a.fitted.summary, FittedResultShape::Structured { .. }));

        let (ma, mb) = (a.metrics.unwrap(), b.metrics.unwrap());
        assert_eq!(ma, mb);
        let rel = ma.get(Indicator::RelativeEffect).unwrap();
        assert_eq!(rel.average, rel.cumulative);

        assert!(a.narrative.translated_count() >= 5);
        assert_eq!(a.detail.len(), 12);
        assert!(a.detail[11].cumulative_effect.unwrap() > 0.0);
        assert!(a.detail[0].cumulative_effect.is_none());
    }
}
