//! Per-bucket detail table.
//!
//! One row per dataset bucket. Counterfactual columns are filled wherever the
//! engine returned a point estimate; running totals (`cumulative_*`) only
//! inside the post-period and blank everywhere else.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{AnalysisWindow, Dataset};
use crate::engine::PointEstimate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub date: NaiveDate,
    pub actual: f64,
    pub control: Option<f64>,
    pub predicted: Option<f64>,
    pub predicted_lower: Option<f64>,
    pub predicted_upper: Option<f64>,
    pub point_effect: Option<f64>,
    pub point_effect_lower: Option<f64>,
    pub point_effect_upper: Option<f64>,
    pub cumulative_actual: Option<f64>,
    pub cumulative_predicted: Option<f64>,
    pub cumulative_effect: Option<f64>,
}

/// Build detail rows for `dataset` from the engine's point estimates.
pub fn detail_rows(dataset: &Dataset, window: &AnalysisWindow, points: &[PointEstimate]) -> Vec<DetailRow> {
    let mut cum_actual = 0.0;
    let mut cum_predicted = 0.0;

    dataset
        .rows()
        .map(|row| {
            let date = row.bucket.date();
            let point = points.iter().find(|p| p.date == date);
            let mut out = DetailRow {
                date,
                actual: row.treated,
                control: row.control,
                predicted: point.map(|p| p.predicted),
                predicted_lower: point.map(|p| p.lower),
                predicted_upper: point.map(|p| p.upper),
                point_effect: point.map(|p| row.treated - p.predicted),
                point_effect_lower: point.map(|p| row.treated - p.upper),
                point_effect_upper: point.map(|p| row.treated - p.lower),
                cumulative_actual: None,
                cumulative_predicted: None,
                cumulative_effect: None,
            };
            if window.in_post(date) {
                if let Some(p) = point {
                    cum_actual += row.treated;
                    cum_predicted += p.predicted;
                    out.cumulative_actual = Some(cum_actual);
                    out.cumulative_predicted = Some(cum_predicted);
                    out.cumulative_effect = Some(cum_actual - cum_predicted);
                }
            }
            out
        })
        .collect()
}
