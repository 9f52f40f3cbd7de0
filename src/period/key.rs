//! Date → bucket key mapping.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::domain::{BucketKey, Granularity};

/// Map a date to the first day of its bucket.
///
/// - monthly: day 1 of the month
/// - ten-day: day 1 for days 1-10, day 11 for 11-20, day 21 for the rest
pub fn bucket_key(date: NaiveDate, granularity: Granularity) -> BucketKey {
    let start_day = match granularity {
        Granularity::Monthly => 1,
        Granularity::TenDay => ten_day_start(date.day()),
    };
    // Moving back inside the same month never leaves the calendar.
    BucketKey(date - Days::new(u64::from(date.day() - start_day)))
}

fn ten_day_start(day: u32) -> u32 {
    match day {
        1..=10 => 1,
        11..=20 => 11,
        _ => 21,
    }
}

/// Every bucket key of a month, in order.
pub fn month_buckets(month_start: NaiveDate, granularity: Granularity) -> Vec<BucketKey> {
    let first = bucket_key(month_start, Granularity::Monthly).date();
    match granularity {
        Granularity::Monthly => vec![BucketKey(first)],
        Granularity::TenDay => [0u64, 10, 20]
            .iter()
            .map(|&offset| BucketKey(first + Days::new(offset)))
            .collect(),
    }
}

/// Month starts from `start`'s month through `end`'s month, inclusive.
pub fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut cur = bucket_key(start, Granularity::Monthly).date();
    let last = bucket_key(end, Granularity::Monthly).date();
    while cur <= last {
        out.push(cur);
        match cur.checked_add_months(Months::new(1)) {
            Some(next) => cur = next,
            None => break,
        }
    }
    out
}
