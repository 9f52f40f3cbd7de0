//! Window validation.
//!
//! Checks run in a fixed order and stop at the first rejection:
//!
//! 1. every field lies within `[dataset.min, dataset.max]`
//! 2. `post_start > pre_end`
//! 3. each period is non-empty (`start <= end`)
//!
//! Warnings never block; they are returned alongside `Ok`.

use serde::Serialize;
use tracing::warn;

use crate::domain::{AnalysisWindow, ArmMode, Dataset};
use crate::error::{ImpactError, WindowViolation};

/// Minimum pre-period share recommended for single-arm designs.
pub const MIN_SINGLE_ARM_PRE_RATIO: f64 = 0.6;
/// Fewer pre-period buckets than this rarely supports a stable fit.
pub const RECOMMENDED_MIN_PRE_BUCKETS: usize = 3;
/// Fewer buckets overall than this is flagged as thin data.
pub const RECOMMENDED_MIN_BUCKETS: usize = 8;

/// Non-blocking data sufficiency findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InsufficientDataWarning {
    /// Single-arm pre-period share below [`MIN_SINGLE_ARM_PRE_RATIO`].
    PreRatio { pre_buckets: usize, total_buckets: usize, ratio: f64 },
    /// Pre-period shorter than [`RECOMMENDED_MIN_PRE_BUCKETS`].
    ShortPrePeriod { pre_buckets: usize },
    /// Dataset shorter than [`RECOMMENDED_MIN_BUCKETS`].
    FewBuckets { total_buckets: usize },
}

impl std::fmt::Display for InsufficientDataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsufficientDataWarning::PreRatio {
                pre_buckets,
                total_buckets,
                ratio,
            } => write!(
                f,
                "pre-period covers {pre_buckets}/{total_buckets} periods ({:.0}%); at least {:.0}% is recommended without a control series",
                ratio * 100.0,
                MIN_SINGLE_ARM_PRE_RATIO * 100.0
            ),
            InsufficientDataWarning::ShortPrePeriod { pre_buckets } => write!(
                f,
                "pre-period has only {pre_buckets} period(s); {RECOMMENDED_MIN_PRE_BUCKETS} or more are recommended"
            ),
            InsufficientDataWarning::FewBuckets { total_buckets } => write!(
                f,
                "dataset has only {total_buckets} period(s); {RECOMMENDED_MIN_BUCKETS} or more are recommended"
            ),
        }
    }
}

/// Validate a window against a dataset.
///
/// Returns the non-blocking warnings on success.
pub fn validate(window: &AnalysisWindow, dataset: &Dataset) -> Result<Vec<InsufficientDataWarning>, ImpactError> {
    let (Some(min), Some(max)) = (dataset.min_date(), dataset.max_date()) else {
        return Err(ImpactError::data("dataset is empty"));
    };

    if window.pre_start < min {
        return Err(ImpactError::Window(WindowViolation::BeforeStart {
            field: "pre_start",
            value: window.pre_start,
            min,
        }));
    }
    let fields = [
        ("pre_start", window.pre_start),
        ("pre_end", window.pre_end),
        ("post_start", window.post_start),
        ("post_end", window.post_end),
    ];
    for (field, value) in fields {
        if value > max {
            return Err(ImpactError::Window(WindowViolation::AfterEnd { field, value, max }));
        }
    }

    if window.post_start <= window.pre_end {
        return Err(ImpactError::Window(WindowViolation::Overlap {
            pre_end: window.pre_end,
            post_start: window.post_start,
        }));
    }
    if window.pre_start > window.pre_end {
        return Err(ImpactError::Window(WindowViolation::Reversed {
            period: "pre",
            start: window.pre_start,
            end: window.pre_end,
        }));
    }
    if window.post_start > window.post_end {
        return Err(ImpactError::Window(WindowViolation::Reversed {
            period: "post",
            start: window.post_start,
            end: window.post_end,
        }));
    }

    let warnings = sufficiency_warnings(window, dataset);
    for w in &warnings {
        warn!(warning = %w, "insufficient data");
    }
    Ok(warnings)
}

fn sufficiency_warnings(window: &AnalysisWindow, dataset: &Dataset) -> Vec<InsufficientDataWarning> {
    let total = dataset.len();
    let pre = dataset
        .range
        .buckets
        .iter()
        .filter(|b| b.date() >= window.pre_start && b.date() <= window.pre_end)
        .count();

    let mut out = Vec::new();
    if dataset.arm_mode() == ArmMode::SingleArm && total > 0 {
        let ratio = pre as f64 / total as f64;
        if ratio < MIN_SINGLE_ARM_PRE_RATIO {
            out.push(InsufficientDataWarning::PreRatio {
                pre_buckets: pre,
                total_buckets: total,
                ratio,
            });
        }
    }
    if pre < RECOMMENDED_MIN_PRE_BUCKETS {
        out.push(InsufficientDataWarning::ShortPrePeriod { pre_buckets: pre });
    }
    if total < RECOMMENDED_MIN_BUCKETS {
        out.push(InsufficientDataWarning::FewBuckets { total_buckets: total });
    }
    out
}
