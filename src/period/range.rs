//! Common bucket range of one or two series.
//!
//! The range runs from the latest first bucket to the earliest last bucket of the
//! participating series and contains every bucket in between, whether or not any
//! series has data there. Disjoint series produce an empty range; the dataset
//! builder turns that into `ImpactError::NoCommonPeriod`.

use chrono::NaiveDate;

use crate::domain::{AggregatedSeries, BucketKey, CommonRange, Granularity, Observation};
use crate::period::{aggregate, month_buckets, month_starts};

/// First and last bucket of a non-empty series.
pub fn series_bounds(series: &AggregatedSeries) -> Option<(NaiveDate, NaiveDate)> {
    let first = series.buckets.first()?;
    let last = series.buckets.last()?;
    Some((first.bucket.date(), last.bucket.date()))
}

/// Resolve the shared grid of already aggregated series.
///
/// An empty treated series (or an empty control series when one is given) yields
/// an empty range.
pub fn resolve(treated: &AggregatedSeries, control: Option<&AggregatedSeries>) -> CommonRange {
    let granularity = treated.granularity;
    let empty = CommonRange {
        granularity,
        buckets: Vec::new(),
    };

    let Some((mut start, mut end)) = series_bounds(treated) else {
        return empty;
    };
    if let Some(control) = control {
        let Some((c_start, c_end)) = series_bounds(control) else {
            return empty;
        };
        start = start.max(c_start);
        end = end.min(c_end);
    }
    if start > end {
        return empty;
    }

    CommonRange {
        granularity,
        buckets: enumerate_buckets(start, end, granularity),
    }
}

/// Aggregate raw observations and resolve their common grid.
pub fn resolve_observations(
    treated: &[Observation],
    control: Option<&[Observation]>,
    granularity: Granularity,
) -> CommonRange {
    let treated = aggregate(treated, granularity);
    let control = control.map(|c| aggregate(c, granularity));
    resolve(&treated, control.as_ref())
}

/// Every bucket key between `start` and `end` inclusive.
///
/// Enumerates month starts first, then expands each month into its buckets and
/// keeps those inside the bounds.
pub fn enumerate_buckets(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> Vec<BucketKey> {
    month_starts(start, end)
        .into_iter()
        .flat_map(|month| month_buckets(month, granularity))
        .filter(|key| key.date() >= start && key.date() <= end)
        .collect()
}
