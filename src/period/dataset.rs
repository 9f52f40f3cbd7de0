//! Aligned dataset construction.
//!
//! Buckets inside the common range that a series has no observations for are
//! filled with `0.0`. This is a modeling choice (no activity = zero), not a
//! missing-data marker, and is surfaced to users in the dataset printout.

use tracing::info;

use crate::domain::{AggregatedSeries, CommonRange, Coverage, Dataset, Granularity, Observation, PeriodCoverage};
use crate::error::ImpactError;
use crate::period::{aggregate, resolve};

/// Raw date span of a series.
pub fn coverage(observations: &[Observation]) -> Option<Coverage> {
    let start = observations.iter().map(|o| o.date).min()?;
    let end = observations.iter().map(|o| o.date).max()?;
    Some(Coverage { start, end })
}

/// Build the aligned, zero-filled dataset for one or two series.
pub fn build(
    treated: &[Observation],
    control: Option<&[Observation]>,
    granularity: Granularity,
) -> Result<Dataset, ImpactError> {
    let treated_cov =
        coverage(treated).ok_or_else(|| ImpactError::data("treated series has no observations"))?;
    let control_cov = match control {
        Some(c) => Some(coverage(c).ok_or_else(|| ImpactError::data("control series has no observations"))?),
        None => None,
    };

    let treated_agg = aggregate(treated, granularity);
    let control_agg = control.map(|c| aggregate(c, granularity));

    let range = resolve(&treated_agg, control_agg.as_ref());
    if range.is_empty() {
        // Both inputs are non-empty here, so an empty range means no overlap.
        return Err(match control_cov {
            Some(c) => ImpactError::NoCommonPeriod {
                treated_start: treated_cov.start,
                treated_end: treated_cov.end,
                control_start: c.start,
                control_end: c.end,
            },
            None => ImpactError::data("treated series produced no buckets"),
        });
    }

    let treated_values: Vec<f64> = range
        .buckets
        .iter()
        .map(|&b| treated_agg.get(b).unwrap_or(0.0))
        .collect();
    let control_values = control_agg.as_ref().map(|agg| {
        range
            .buckets
            .iter()
            .map(|&b| agg.get(b).unwrap_or(0.0))
            .collect::<Vec<f64>>()
    });

    let zero_filled = count_unobserved(&range, &treated_agg, control_agg.as_ref());
    info!(
        granularity = granularity.display_name(),
        buckets = range.len(),
        zero_filled,
        two_arm = control.is_some(),
        "dataset built"
    );

    Ok(Dataset {
        range,
        treated: treated_values,
        control: control_values,
        coverage: PeriodCoverage {
            treated: treated_cov,
            control: control_cov,
        },
        zero_filled,
    })
}

fn count_unobserved(range: &CommonRange, treated: &AggregatedSeries, control: Option<&AggregatedSeries>) -> usize {
    range
        .buckets
        .iter()
        .filter(|&&b| treated.get(b).is_none() || control.is_some_and(|c| c.get(b).is_none()))
        .count()
}
