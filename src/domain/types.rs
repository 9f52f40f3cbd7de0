//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages without conversion
//! - exported to JSON/CSV
//! - rebuilt deterministically from the same raw observations

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One raw input row: a calendar date and a finite quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Bucket size used to aggregate daily observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// One bucket per calendar month, keyed by day 1.
    Monthly,
    /// Three buckets per month, keyed by day 1, 11 and 21.
    TenDay,
}

impl Granularity {
    pub fn display_name(self) -> &'static str {
        match self {
            Granularity::Monthly => "monthly",
            Granularity::TenDay => "ten-day",
        }
    }
}

/// Canonical first day of a bucket.
///
/// Only constructed through [`crate::period::bucket_key`], so a value is always
/// day 1 of a month (monthly) or day 1/11/21 (ten-day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(pub(crate) NaiveDate);

impl BucketKey {
    pub fn date(self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketTotal {
    pub bucket: BucketKey,
    pub total: f64,
}

/// Per-bucket sums of one series, sorted by bucket with unique keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    pub granularity: Granularity,
    pub buckets: Vec<BucketTotal>,
}

impl AggregatedSeries {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total for `bucket`, if any observation fell into it.
    pub fn get(&self, bucket: BucketKey) -> Option<f64> {
        self.buckets
            .binary_search_by(|b| b.bucket.cmp(&bucket))
            .ok()
            .map(|idx| self.buckets[idx].total)
    }
}

/// Gap-free bucket grid shared by the participating series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonRange {
    pub granularity: Granularity,
    pub buckets: Vec<BucketKey>,
}

impl CommonRange {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn first(&self) -> Option<BucketKey> {
        self.buckets.first().copied()
    }

    pub fn last(&self) -> Option<BucketKey> {
        self.buckets.last().copied()
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.buckets.binary_search_by(|b| b.date().cmp(&date)).ok()
    }
}

/// Single-arm (treated only) or two-arm (treated + control) analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArmMode {
    SingleArm,
    TwoArm,
}

/// First and last raw observation date of one input series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCoverage {
    pub treated: Coverage,
    pub control: Option<Coverage>,
}

/// Aligned dataset: one value per bucket per series, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub range: CommonRange,
    pub treated: Vec<f64>,
    pub control: Option<Vec<f64>>,
    pub coverage: PeriodCoverage,
    /// Buckets without an observation in at least one series.
    pub zero_filled: usize,
}

impl Dataset {
    pub fn granularity(&self) -> Granularity {
        self.range.granularity
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn arm_mode(&self) -> ArmMode {
        if self.control.is_some() {
            ArmMode::TwoArm
        } else {
            ArmMode::SingleArm
        }
    }

    /// First bucket date. `None` only for an empty dataset.
    pub fn min_date(&self) -> Option<NaiveDate> {
        self.range.first().map(BucketKey::date)
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.range.last().map(BucketKey::date)
    }

    pub fn rows(&self) -> impl Iterator<Item = DatasetRow> + '_ {
        self.range
            .buckets
            .iter()
            .enumerate()
            .map(move |(i, &bucket)| DatasetRow {
                bucket,
                treated: self.treated[i],
                control: self.control.as_ref().map(|c| c[i]),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetRow {
    pub bucket: BucketKey,
    pub treated: f64,
    pub control: Option<f64>,
}

/// Pre-/post-intervention periods (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub pre_start: NaiveDate,
    pub pre_end: NaiveDate,
    pub post_start: NaiveDate,
    pub post_end: NaiveDate,
}

impl AnalysisWindow {
    pub fn pre_period(&self) -> (NaiveDate, NaiveDate) {
        (self.pre_start, self.pre_end)
    }

    pub fn post_period(&self) -> (NaiveDate, NaiveDate) {
        (self.post_start, self.post_end)
    }

    pub fn in_post(&self, date: NaiveDate) -> bool {
        date >= self.post_start && date <= self.post_end
    }
}

/// The fixed indicator set of the canonical metrics table, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Indicator {
    Actual,
    Predicted,
    PredictedCi,
    AbsoluteEffect,
    AbsoluteEffectCi,
    RelativeEffect,
    RelativeEffectCi,
    PValue,
}

impl Indicator {
    pub const ORDER: [Indicator; 8] = [
        Indicator::Actual,
        Indicator::Predicted,
        Indicator::PredictedCi,
        Indicator::AbsoluteEffect,
        Indicator::AbsoluteEffectCi,
        Indicator::RelativeEffect,
        Indicator::RelativeEffectCi,
        Indicator::PValue,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Indicator::Actual => "actual",
            Indicator::Predicted => "predicted",
            Indicator::PredictedCi => "predicted-ci",
            Indicator::AbsoluteEffect => "absolute-effect",
            Indicator::AbsoluteEffectCi => "absolute-effect-ci",
            Indicator::RelativeEffect => "relative-effect",
            Indicator::RelativeEffectCi => "relative-effect-ci",
            Indicator::PValue => "p-value",
        }
    }

    /// Rows whose cumulative column repeats the average.
    pub fn is_non_cumulative(self) -> bool {
        matches!(
            self,
            Indicator::RelativeEffect | Indicator::RelativeEffectCi | Indicator::PValue
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRow {
    pub indicator: Indicator,
    pub average: String,
    pub cumulative: String,
}

/// Shape-independent effect statistics, one row per [`Indicator`] in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetrics {
    pub confidence_level: u32,
    pub rows: Vec<MetricRow>,
}

impl CanonicalMetrics {
    pub fn get(&self, indicator: Indicator) -> Option<&MetricRow> {
        self.rows.iter().find(|r| r.indicator == indicator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ParagraphSource {
    /// Copied unchanged from the source report.
    Verbatim,
    /// Rewritten by the named rule.
    Translated { rule: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    pub source: ParagraphSource,
}

/// Narrative report in the target language, paragraph by paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedReport {
    pub paragraphs: Vec<Paragraph>,
}

impl LocalizedReport {
    /// Paragraphs joined by exactly one blank line.
    pub fn to_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn translated_count(&self) -> usize {
        self.paragraphs
            .iter()
            .filter(|p| matches!(p.source, ParagraphSource::Translated { .. }))
            .count()
    }
}
