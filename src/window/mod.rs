//! Analysis window defaults and validation.
//!
//! - `default_window` splits the dataset at the midpoint (two-arm) or at 70% of
//!   the buckets (single-arm, so the pre-period dominates)
//! - `validate` rejects out-of-bounds or overlapping windows and collects
//!   non-blocking warnings about thin pre-periods

pub mod validate;

pub use validate::*;

use chrono::NaiveDate;

use crate::domain::{AnalysisWindow, ArmMode, Dataset};
use crate::error::ImpactError;
use crate::period::bucket_key;

/// Share of buckets placed in the pre-period by the single-arm default.
pub const SINGLE_ARM_PRE_SHARE: f64 = 0.7;

/// Default pre/post split for a dataset.
pub fn default_window(dataset: &Dataset) -> Result<AnalysisWindow, ImpactError> {
    let n = dataset.len();
    if n < 2 {
        return Err(ImpactError::data(format!(
            "need at least 2 periods to split into pre/post, dataset has {n}"
        )));
    }

    let split = match dataset.arm_mode() {
        ArmMode::TwoArm => n / 2,
        ArmMode::SingleArm => suggest_intervention_index(n),
    };

    let at = |i: usize| dataset.range.buckets[i].date();
    Ok(AnalysisWindow {
        pre_start: at(0),
        pre_end: at(split - 1),
        post_start: at(split),
        post_end: at(n - 1),
    })
}

/// Index of the first post-period bucket for a single-arm design.
///
/// Always leaves at least one bucket on each side.
pub fn suggest_intervention_index(n: usize) -> usize {
    let idx = (n as f64 * SINGLE_ARM_PRE_SHARE).floor() as usize;
    idx.clamp(1, n.saturating_sub(1).max(1))
}

/// Build a window from user-supplied dates, snapping each date to its bucket and
/// filling unspecified fields from the default window.
pub fn window_from_overrides(
    dataset: &Dataset,
    pre_start: Option<NaiveDate>,
    pre_end: Option<NaiveDate>,
    post_start: Option<NaiveDate>,
    post_end: Option<NaiveDate>,
) -> Result<AnalysisWindow, ImpactError> {
    let defaults = default_window(dataset)?;
    let snap = |d: NaiveDate| bucket_key(d, dataset.granularity()).date();
    Ok(AnalysisWindow {
        pre_start: pre_start.map(snap).unwrap_or(defaults.pre_start),
        pre_end: pre_end.map(snap).unwrap_or(defaults.pre_end),
        post_start: post_start.map(snap).unwrap_or(defaults.post_start),
        post_end: post_end.map(snap).unwrap_or(defaults.post_end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Granularity, Observation};
    use crate::period::build;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly(months: u32, with_control: bool) -> Dataset {
        let treated: Vec<Observation> = (1..=months).map(|m| Observation::new(d(2020, m, 5), 1.0)).collect();
        let control = treated.clone();
        build(&treated, with_control.then_some(&control[..]), Granularity::Monthly).unwrap()
    }

    #[test]
    fn two_arm_default_splits_at_midpoint() {
        let ds = monthly(10, true);
        let w = default_window(&ds).unwrap();
        assert_eq!(w.pre_start, d(2020, 1, 1));
        assert_eq!(w.pre_end, d(2020, 5, 1));
        assert_eq!(w.post_start, d(2020, 6, 1));
        assert_eq!(w.post_end, d(2020, 10, 1));
    }

    #[test]
    fn single_arm_default_uses_seventy_percent() {
        let ds = monthly(10, false);
        let w = default_window(&ds).unwrap();
        assert_eq!(w.pre_end, d(2020, 7, 1));
        assert_eq!(w.post_start, d(2020, 8, 1));
    }

    #[test]
    fn tiny_datasets_keep_one_bucket_per_side() {
        assert_eq!(suggest_intervention_index(2), 1);
        assert_eq!(suggest_intervention_index(3), 2);
        let ds = monthly(2, false);
        let w = default_window(&ds).unwrap();
        assert_eq!(w.pre_end, d(2020, 1, 1));
        assert_eq!(w.post_start, d(2020, 2, 1));
    }

    #[test]
    fn single_bucket_cannot_be_split() {
        let ds = monthly(1, true);
        assert!(matches!(default_window(&ds), Err(ImpactError::Data(_))));
    }

    #[test]
    fn overrides_snap_to_buckets() {
        let ds = monthly(6, true);
        let w = window_from_overrides(&ds, None, Some(d(2020, 2, 17)), Some(d(2020, 3, 2)), None).unwrap();
        assert_eq!(w.pre_end, d(2020, 2, 1));
        assert_eq!(w.post_start, d(2020, 3, 1));
        assert_eq!(w.post_end, d(2020, 6, 1));
    }
}
