//! Per-bucket summation of raw observations.

use std::collections::BTreeMap;

use crate::domain::{AggregatedSeries, BucketTotal, Granularity, Observation};
use crate::period::bucket_key;

/// Sum observations per bucket.
///
/// Output is sorted by bucket. Empty input yields an empty series; callers decide
/// whether that is an error.
pub fn aggregate(observations: &[Observation], granularity: Granularity) -> AggregatedSeries {
    let mut totals = BTreeMap::new();
    for obs in observations {
        *totals.entry(bucket_key(obs.date, granularity)).or_insert(0.0) += obs.value;
    }

    AggregatedSeries {
        granularity,
        buckets: totals
            .into_iter()
            .map(|(bucket, total)| BucketTotal { bucket, total })
            .collect(),
    }
}
