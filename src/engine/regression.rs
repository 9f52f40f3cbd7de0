//! Reference engine: regression counterfactual with simulated intervals.
//!
//! Workflow:
//! 1. Regress the treated series on `[1, control]` (two-arm) or `[1, t]`
//!    (single-arm trend) over the pre-period.
//! 2. Predict the post-period counterfactual from the fitted coefficients.
//! 3. Simulate `draws` noisy counterfactual paths (`N(0, σ)` around the point
//!    prediction, σ from pre-period residuals) to get intervals and the
//!    one-sided tail probability.
//!
//! Each draw uses its own seeded RNG so results are identical regardless of how
//! rayon schedules the work.

use chrono::NaiveDate;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rayon::prelude::*;
use tracing::debug;

use crate::engine::render::{self, ImpactNumbers};
use crate::engine::{
    EngineOptions, FittedResult, FittedResultShape, ImpactEngine, PointEstimate, SeriesTable, SummaryCell, SummaryShape,
};
use crate::error::ImpactError;
use crate::math::{fit_rows, interval, predict_row, std_dev};

/// Minimum number of simulated paths.
const MIN_DRAWS: usize = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionEngine;

impl ImpactEngine for RegressionEngine {
    fn name(&self) -> &'static str {
        "regression"
    }

    fn fit(
        &self,
        table: &SeriesTable,
        pre_period: (NaiveDate, NaiveDate),
        post_period: (NaiveDate, NaiveDate),
        options: &EngineOptions,
    ) -> Result<FittedResult, ImpactError> {
        if !(options.confidence > 0.0 && options.confidence < 1.0) {
            return Err(ImpactError::engine(format!(
                "confidence must be in (0, 1), got {}",
                options.confidence
            )));
        }

        let pre = table.indices_between(pre_period.0, pre_period.1);
        let post = table.indices_between(post_period.0, post_period.1);
        if post.is_empty() {
            return Err(ImpactError::engine("post-period contains no rows"));
        }

        let design = |i: usize| -> Vec<f64> {
            match &table.control {
                Some(control) => vec![1.0, control[i]],
                None => vec![1.0, i as f64],
            }
        };
        let p = 2;
        if pre.len() < p + 1 {
            return Err(ImpactError::engine(format!(
                "pre-period needs at least {} rows, got {}",
                p + 1,
                pre.len()
            )));
        }

        let rows: Vec<Vec<f64>> = pre.iter().map(|&i| design(i)).collect();
        let y_pre: Vec<f64> = pre.iter().map(|&i| table.treated[i]).collect();
        let (beta, sse) =
            fit_rows(&rows, &y_pre).ok_or_else(|| ImpactError::engine("pre-period regression is singular"))?;
        let sigma = (sse / (pre.len() - p) as f64).sqrt();
        if !sigma.is_finite() {
            return Err(ImpactError::engine("residual scale is not finite"));
        }
        debug!(?beta, sigma, "pre-period fit");

        let predicted: Vec<f64> = post.iter().map(|&i| predict_row(&design(i), &beta)).collect();
        let actual: Vec<f64> = post.iter().map(|&i| table.treated[i]).collect();

        let paths = simulate_paths(&predicted, sigma, options.draws.max(MIN_DRAWS), options.seed)?;
        let numbers = summarize(&actual, &predicted, &paths, options.confidence);

        let alpha = options.alpha();
        let points = post
            .iter()
            .enumerate()
            .map(|(k, &i)| {
                let column: Vec<f64> = paths.iter().map(|path| path[k]).collect();
                let (lower, upper) =
                    interval(&column, alpha / 2.0, 1.0 - alpha / 2.0).unwrap_or((predicted[k], predicted[k]));
                PointEstimate {
                    date: table.dates[i],
                    actual: actual[k],
                    predicted: predicted[k],
                    lower,
                    upper,
                }
            })
            .collect();

        let text = render::summary_text(&numbers);
        let summary = match options.summary_shape {
            SummaryShape::Structured => FittedResultShape::Structured {
                table: render::summary_table(&numbers),
                text: Some(text),
            },
            SummaryShape::Textual => FittedResultShape::Textual(text),
        };

        Ok(FittedResult {
            report: render::report_text(&numbers),
            summary,
            p_value: Some(numbers.p_value),
            points,
        })
    }
}

fn simulate_paths(predicted: &[f64], sigma: f64, draws: usize, seed: u64) -> Result<Vec<Vec<f64>>, ImpactError> {
    let noise = Normal::new(0.0, sigma).map_err(|e| ImpactError::engine(format!("noise distribution error: {e}")))?;
    Ok((0..draws)
        .into_par_iter()
        .map(|d| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(d as u64));
            predicted.iter().map(|&m| m + noise.sample(&mut rng)).collect()
        })
        .collect())
}

fn summarize(actual: &[f64], predicted: &[f64], paths: &[Vec<f64>], confidence: f64) -> ImpactNumbers {
    let m = actual.len() as f64;
    let alpha = 1.0 - confidence;
    let (q_lo, q_hi) = (alpha / 2.0, 1.0 - alpha / 2.0);

    let actual_sum: f64 = actual.iter().sum();
    let pred_sum: f64 = predicted.iter().sum();
    let sim_sums: Vec<f64> = paths.iter().map(|p| p.iter().sum()).collect();

    let (sum_lo, sum_hi) = interval(&sim_sums, q_lo, q_hi).unwrap_or((pred_sum, pred_sum));
    let sum_sd = std_dev(&sim_sums);

    let both = |cumulative: f64| SummaryCell {
        average: cumulative / m,
        cumulative,
    };
    let same = |v: f64| SummaryCell {
        average: v,
        cumulative: v,
    };

    let abs_sum = actual_sum - pred_sum;
    // Relative effects are identical for averages and sums.
    let rel = abs_sum / pred_sum;
    let rel_lo = (actual_sum - sum_hi) / pred_sum;
    let rel_hi = (actual_sum - sum_lo) / pred_sum;
    let rel_sd = sum_sd / pred_sum.abs();

    let above = sim_sums.iter().filter(|&&s| s >= actual_sum).count();
    let below = sim_sums.iter().filter(|&&s| s <= actual_sum).count();
    let p_value = (above.min(below) + 1) as f64 / (sim_sums.len() + 1) as f64;

    ImpactNumbers {
        confidence,
        actual: both(actual_sum),
        predicted: both(pred_sum),
        predicted_sd: both(sum_sd),
        predicted_lower: both(sum_lo),
        predicted_upper: both(sum_hi),
        abs_effect: both(abs_sum),
        abs_effect_sd: both(sum_sd),
        abs_effect_lower: both(actual_sum - sum_hi),
        abs_effect_upper: both(actual_sum - sum_lo),
        rel_effect: same(rel),
        rel_effect_sd: same(rel_sd),
        rel_effect_lower: same(rel_lo),
        rel_effect_upper: same(rel_hi),
        p_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, 1).unwrap()
    }

    /// Treated tracks control (+ small wiggle) until month 9, then jumps by 50.
    fn two_arm_table() -> SeriesTable {
        let control: Vec<f64> = (0..12).map(|i| 100.0 + 3.0 * i as f64).collect();
        let treated: Vec<f64> = control
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let wiggle = if i % 2 == 0 { 1.0 } else { -1.0 };
                let lift = if i >= 8 { 50.0 } else { 0.0 };
                2.0 * c + wiggle + lift
            })
            .collect();
        SeriesTable {
            dates: (1..=12).map(d).collect(),
            treated,
            control: Some(control),
        }
    }

    #[test]
    fn detects_lift_against_control() {
        let result = RegressionEngine
            .fit(&two_arm_table(), (d(1), d(8)), (d(9), d(12)), &EngineOptions::default())
            .unwrap();

        let p = result.p_value.unwrap();
        assert!(p < 0.05, "p = {p}");
        assert_eq!(result.points.len(), 4);
        for pt in &result.points {
            assert!(pt.lower <= pt.predicted && pt.predicted <= pt.upper);
            assert!(pt.actual - pt.predicted > 40.0);
        }
        let FittedResultShape::Structured { table, text } = &result.summary else {
            panic!("expected structured summary");
        };
        let abs = table.lookup(&["abs_effect"]).unwrap();
        assert!((abs.average - 50.0).abs() < 2.0);
        assert!(text.as_deref().unwrap().contains("Posterior tail-area probability p:"));
        assert!(result.report.contains("statistically"));
    }

    #[test]
    fn same_seed_gives_same_result() {
        let opts = EngineOptions {
            summary_shape: SummaryShape::Textual,
            ..EngineOptions::default()
        };
        let a = RegressionEngine.fit(&two_arm_table(), (d(1), d(8)), (d(9), d(12)), &opts).unwrap();
        let b = RegressionEngine.fit(&two_arm_table(), (d(1), d(8)), (d(9), d(12)), &opts).unwrap();
        assert_eq!(a, b);
        assert!(matches!(a.summary, FittedResultShape::Textual(_)));
    }

    #[test]
    fn single_arm_uses_trend() {
        let table = SeriesTable {
            dates: (1..=10).map(d).collect(),
            treated: (0..10).map(|i| 10.0 + i as f64 + if i % 2 == 0 { 0.5 } else { -0.5 }).collect(),
            control: None,
        };
        let result = RegressionEngine
            .fit(&table, (d(1), d(7)), (d(8), d(10)), &EngineOptions::default())
            .unwrap();
        let p = result.p_value.unwrap();
        assert!(p > 0.05, "no effect expected, p = {p}");
    }

    #[test]
    fn short_pre_period_is_engine_error() {
        let err = RegressionEngine
            .fit(&two_arm_table(), (d(1), d(2)), (d(3), d(12)), &EngineOptions::default())
            .unwrap_err();
        assert!(matches!(err, ImpactError::Engine(_)));
    }
}
