//! Canonical metrics from either engine summary shape.
//!
//! Extraction order per field:
//!
//! 1. structured table lookup (field-name aliases cover engine versions)
//! 2. tabular text: non-empty lines split on runs of 2+ whitespace into
//!    `(indicator, average, cumulative)`
//!
//! The p-value comes from the engine scalar, else from the
//! `... probability p: <number>` line of the text.
//!
//! Formatting is shared by both paths so the same fit always renders to the same
//! strings: counts/effects with 1 decimal, relative values ×100 with `%`, p-value
//! with 4 decimals. Relative rows repeat the average in the cumulative column.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::{CanonicalMetrics, Indicator, MetricRow};
use crate::engine::{FittedResult, FittedResultShape, SummaryTable};
use crate::error::ImpactError;

const NUM: &str = r"[-+]?(?:\d[\d,]*(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?";

static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(NUM).unwrap());
static RE_COLUMNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static RE_P_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)probability\s+p\s*[:=]\s*({NUM})")).unwrap());

/// Average/cumulative pair. Relative fields are in percent units.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pair {
    average: f64,
    cumulative: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    lower: Pair,
    upper: Pair,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RawMetrics {
    actual: Option<Pair>,
    predicted: Option<Pair>,
    predicted_ci: Option<Bounds>,
    abs_effect: Option<Pair>,
    abs_effect_ci: Option<Bounds>,
    rel_effect: Option<Pair>,
    rel_effect_ci: Option<Bounds>,
    p_value: Option<f64>,
}

impl RawMetrics {
    /// Fill every missing field from `other`.
    fn or(self, other: RawMetrics) -> RawMetrics {
        RawMetrics {
            actual: self.actual.or(other.actual),
            predicted: self.predicted.or(other.predicted),
            predicted_ci: self.predicted_ci.or(other.predicted_ci),
            abs_effect: self.abs_effect.or(other.abs_effect),
            abs_effect_ci: self.abs_effect_ci.or(other.abs_effect_ci),
            rel_effect: self.rel_effect.or(other.rel_effect),
            rel_effect_ci: self.rel_effect_ci.or(other.rel_effect_ci),
            p_value: self.p_value.or(other.p_value),
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.actual.is_none() {
            out.push("actual");
        }
        if self.predicted.is_none() {
            out.push("predicted");
        }
        if self.predicted_ci.is_none() {
            out.push("predicted-ci");
        }
        if self.abs_effect.is_none() {
            out.push("absolute-effect");
        }
        if self.abs_effect_ci.is_none() {
            out.push("absolute-effect-ci");
        }
        if self.rel_effect.is_none() {
            out.push("relative-effect");
        }
        if self.rel_effect_ci.is_none() {
            out.push("relative-effect-ci");
        }
        if self.p_value.is_none() {
            out.push("p-value");
        }
        out
    }
}

/// Normalize an engine result into the canonical metrics table.
pub fn normalize(result: &FittedResult, confidence_level: f64) -> Result<CanonicalMetrics, ImpactError> {
    let raw = match &result.summary {
        FittedResultShape::Structured { table, text } => {
            let structured = from_structured(table, result.p_value);
            let missing = structured.missing_fields();
            match text {
                Some(text) if !missing.is_empty() => {
                    warn!(?missing, "structured summary incomplete, falling back to text");
                    structured.or(from_text(text))
                }
                _ => structured,
            }
        }
        FittedResultShape::Textual(text) => {
            let parsed = from_text(text);
            RawMetrics {
                p_value: result.p_value.or(parsed.p_value),
                ..parsed
            }
        }
    };
    render(&raw, confidence_level)
}

/// Normalize a standalone tabular text summary.
pub fn normalize_text(text: &str, confidence_level: f64) -> Result<CanonicalMetrics, ImpactError> {
    render(&from_text(text), confidence_level)
}

fn from_structured(table: &SummaryTable, p_value: Option<f64>) -> RawMetrics {
    let pair = |names: &[&str]| {
        table.lookup(names).map(|c| Pair {
            average: c.average,
            cumulative: c.cumulative,
        })
    };
    let pct = |names: &[&str]| {
        pair(names).map(|p| Pair {
            average: p.average * 100.0,
            cumulative: p.cumulative * 100.0,
        })
    };
    let bounds = |lo: Option<Pair>, hi: Option<Pair>| Some(Bounds { lower: lo?, upper: hi? });

    RawMetrics {
        actual: pair(&["actual"]),
        predicted: pair(&["predicted", "prediction"]),
        predicted_ci: bounds(
            pair(&["predicted_lower", "prediction_lower"]),
            pair(&["predicted_upper", "prediction_upper"]),
        ),
        abs_effect: pair(&["abs_effect", "absolute_effect"]),
        abs_effect_ci: bounds(
            pair(&["abs_effect_lower", "absolute_effect_lower"]),
            pair(&["abs_effect_upper", "absolute_effect_upper"]),
        ),
        rel_effect: pct(&["rel_effect", "relative_effect"]),
        rel_effect_ci: bounds(
            pct(&["rel_effect_lower", "relative_effect_lower"]),
            pct(&["rel_effect_upper", "relative_effect_upper"]),
        ),
        p_value: p_value.filter(|p| p.is_finite()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Actual,
    Predicted,
    Absolute,
    Relative,
    Interval,
}

fn classify(label: &str) -> Option<RowKind> {
    let l = label.to_ascii_lowercase();
    if l.starts_with("actual") {
        Some(RowKind::Actual)
    } else if l.starts_with("predict") {
        Some(RowKind::Predicted)
    } else if l.starts_with("absolute") || l.starts_with("abs") {
        Some(RowKind::Absolute)
    } else if l.contains("relative") || l.starts_with("rel") {
        Some(RowKind::Relative)
    } else if l.ends_with("ci") || l.contains("interval") {
        Some(RowKind::Interval)
    } else {
        None
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn numbers(cell: &str) -> Vec<f64> {
    RE_NUMBER
        .find_iter(cell)
        .filter_map(|m| parse_number(m.as_str()))
        .collect()
}

fn from_text(text: &str) -> RawMetrics {
    let mut raw = RawMetrics::default();
    let mut last: Option<RowKind> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if raw.p_value.is_none() {
            if let Some(caps) = RE_P_VALUE.captures(line) {
                raw.p_value = parse_number(&caps[1]);
                continue;
            }
        }

        let cols: Vec<&str> = RE_COLUMNS.split(line).collect();
        let [label, average, cumulative] = cols[..] else {
            continue;
        };
        let Some(kind) = classify(label) else {
            continue;
        };

        // Relative rows are not cumulative-sum-able: the cumulative column
        // repeats the average.
        let relative_type = label.to_ascii_lowercase().contains("relative")
            || (average.contains('%') && cumulative.contains('%'));
        let cumulative = if relative_type { average } else { cumulative };

        let (avg_nums, cum_nums) = (numbers(average), numbers(cumulative));
        match kind {
            RowKind::Interval => {
                let (Some(&alo), Some(&ahi), Some(&clo), Some(&chi)) =
                    (avg_nums.first(), avg_nums.get(1), cum_nums.first(), cum_nums.get(1))
                else {
                    continue;
                };
                let bounds = Some(Bounds {
                    lower: Pair { average: alo, cumulative: clo },
                    upper: Pair { average: ahi, cumulative: chi },
                });
                match last {
                    Some(RowKind::Predicted) => raw.predicted_ci = raw.predicted_ci.or(bounds),
                    Some(RowKind::Absolute) => raw.abs_effect_ci = raw.abs_effect_ci.or(bounds),
                    Some(RowKind::Relative) => raw.rel_effect_ci = raw.rel_effect_ci.or(bounds),
                    _ => debug!(line, "interval row without a preceding metric"),
                }
            }
            _ => {
                let (Some(&average), Some(&cumulative)) = (avg_nums.first(), cum_nums.first()) else {
                    continue;
                };
                let pair = Some(Pair { average, cumulative });
                match kind {
                    RowKind::Actual => raw.actual = raw.actual.or(pair),
                    RowKind::Predicted => raw.predicted = raw.predicted.or(pair),
                    RowKind::Absolute => raw.abs_effect = raw.abs_effect.or(pair),
                    RowKind::Relative => raw.rel_effect = raw.rel_effect.or(pair),
                    RowKind::Interval => {}
                }
                last = Some(kind);
            }
        }
    }
    raw
}

fn fixed(v: f64, decimals: usize) -> String {
    let s = format!("{v:.decimals$}");
    // Avoid "-0.0" for values that round to zero.
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

fn pct(v: f64) -> String {
    format!("{}%", fixed(v, 1))
}

fn render(raw: &RawMetrics, confidence_level: f64) -> Result<CanonicalMetrics, ImpactError> {
    let (Some(actual), Some(predicted)) = (raw.actual, raw.predicted) else {
        return Err(ImpactError::Normalization(
            "no actual/predicted values in structured or textual summary".to_string(),
        ));
    };

    const MISSING: &str = "-";
    let plain = |p: Pair| (fixed(p.average, 1), fixed(p.cumulative, 1));
    let plain_ci = |b: Bounds| {
        (
            format!("[{}, {}]", fixed(b.lower.average, 1), fixed(b.upper.average, 1)),
            format!("[{}, {}]", fixed(b.lower.cumulative, 1), fixed(b.upper.cumulative, 1)),
        )
    };
    let missing = || (MISSING.to_string(), MISSING.to_string());
    let same = |s: String| (s.clone(), s);

    let cells = |indicator: Indicator| -> (String, String) {
        match indicator {
            Indicator::Actual => plain(actual),
            Indicator::Predicted => plain(predicted),
            Indicator::PredictedCi => raw.predicted_ci.map(plain_ci).unwrap_or_else(missing),
            Indicator::AbsoluteEffect => raw.abs_effect.map(plain).unwrap_or_else(missing),
            Indicator::AbsoluteEffectCi => raw.abs_effect_ci.map(plain_ci).unwrap_or_else(missing),
            Indicator::RelativeEffect => raw.rel_effect.map(|p| same(pct(p.average))).unwrap_or_else(missing),
            Indicator::RelativeEffectCi => raw
                .rel_effect_ci
                .map(|b| same(format!("[{}, {}]", pct(b.lower.average), pct(b.upper.average))))
                .unwrap_or_else(missing),
            Indicator::PValue => raw.p_value.map(|p| same(fixed(p, 4))).unwrap_or_else(missing),
        }
    };

    let rows = Indicator::ORDER
        .iter()
        .map(|&indicator| {
            let (average, cumulative) = cells(indicator);
            let cumulative = if indicator.is_non_cumulative() {
                average.clone()
            } else {
                cumulative
            };
            MetricRow {
                indicator,
                average,
                cumulative,
            }
        })
        .collect();

    Ok(CanonicalMetrics {
        confidence_level: (confidence_level * 100.0).round() as u32,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::render::tests::{cell, sample_numbers};
    use crate::engine::render::{summary_table, summary_text};

    fn structured(p: f64) -> FittedResult {
        let n = sample_numbers(p, true);
        FittedResult {
            report: String::new(),
            summary: FittedResultShape::Structured {
                table: summary_table(&n),
                text: None,
            },
            p_value: Some(p),
            points: Vec::new(),
        }
    }

    fn textual(p: f64) -> FittedResult {
        FittedResult {
            report: String::new(),
            summary: FittedResultShape::Textual(summary_text(&sample_numbers(p, true))),
            p_value: None,
            points: Vec::new(),
        }
    }

    #[test]
    fn both_shapes_normalize_identically() {
        let a = normalize(&structured(0.0123), 0.95).unwrap();
        let b = normalize(&textual(0.0123), 0.95).unwrap();
        assert_eq!(a, b);

        let rel = a.get(Indicator::RelativeEffect).unwrap();
        assert_eq!(rel.average, "40.7%");
        assert_eq!(rel.cumulative, rel.average);
        let p = a.get(Indicator::PValue).unwrap();
        assert_eq!(p.average, "0.0123");
        assert_eq!(p.cumulative, "0.0123");
    }

    #[test]
    fn shapes_agree_at_rounding_boundaries() {
        let mut n = sample_numbers(0.0123, true);
        n.actual = cell(4.649, 139.449);
        n.predicted_lower = cell(4.35, 130.75);
        n.abs_effect = cell(1.849, 56.65);
        n.rel_effect = cell(0.40649, 0.40649);
        n.rel_effect_upper = cell(0.46649, 0.46649);

        let shaped = |summary: FittedResultShape| FittedResult {
            report: String::new(),
            summary,
            p_value: Some(n.p_value),
            points: Vec::new(),
        };
        let s = normalize(
            &shaped(FittedResultShape::Structured {
                table: summary_table(&n),
                text: None,
            }),
            0.95,
        )
        .unwrap();
        let t = normalize(&shaped(FittedResultShape::Textual(summary_text(&n))), 0.95).unwrap();
        assert_eq!(s, t);

        let actual = t.get(Indicator::Actual).unwrap();
        assert_eq!((actual.average.as_str(), actual.cumulative.as_str()), ("4.6", "139.4"));
        assert_eq!(t.get(Indicator::RelativeEffect).unwrap().average, "40.6%");
    }

    #[test]
    fn rows_follow_fixed_order_and_formats() {
        let m = normalize(&structured(0.2), 0.95).unwrap();
        let labels: Vec<Indicator> = m.rows.iter().map(|r| r.indicator).collect();
        assert_eq!(labels, Indicator::ORDER.to_vec());

        let predicted = m.get(Indicator::Predicted).unwrap();
        assert_eq!((predicted.average.as_str(), predicted.cumulative.as_str()), ("4.6", "139.0"));
        let ci = m.get(Indicator::PredictedCi).unwrap();
        assert_eq!(ci.average, "[4.4, 4.9]");
        assert_eq!(ci.cumulative, "[130.8, 147.6]");
        let rel_ci = m.get(Indicator::RelativeEffectCi).unwrap();
        assert_eq!(rel_ci.average, "[34.5%, 46.6%]");
        assert_eq!(rel_ci.cumulative, rel_ci.average);
        assert_eq!(m.confidence_level, 95);
    }

    #[test]
    fn textual_relative_cumulative_is_forced_to_average() {
        let text = "\
Posterior Inference {Causal Impact}
                          Average            Cumulative
Actual                    10.0               40.0
Prediction (s.d.)         8.0 (0.5)          32.0 (2.0)
95% CI                    [7.0, 9.0]         [28.0, 36.0]

Absolute effect (s.d.)    2.0 (0.5)          8.0 (2.0)
95% CI                    [1.0, 3.0]         [4.0, 12.0]

Relative effect (s.d.)    25.0% (6.3%)       99.0% (6.3%)
95% CI                    [12.5%, 37.5%]     [50.0%, 80.0%]

Posterior tail-area probability p: 0.002
";
        let m = normalize_text(text, 0.95).unwrap();
        let rel = m.get(Indicator::RelativeEffect).unwrap();
        assert_eq!((rel.average.as_str(), rel.cumulative.as_str()), ("25.0%", "25.0%"));
        let rel_ci = m.get(Indicator::RelativeEffectCi).unwrap();
        assert_eq!(rel_ci.cumulative, "[12.5%, 37.5%]");
        assert_eq!(m.get(Indicator::AbsoluteEffectCi).unwrap().cumulative, "[4.0, 12.0]");
        assert_eq!(m.get(Indicator::PValue).unwrap().average, "0.0020");
    }

    #[test]
    fn structured_gaps_fall_back_to_text() {
        let n = sample_numbers(0.0123, true);
        let mut table = summary_table(&n);
        table.fields.remove("abs_effect");
        table.fields.remove("rel_effect_lower");
        let result = FittedResult {
            report: String::new(),
            summary: FittedResultShape::Structured {
                table,
                text: Some(summary_text(&n)),
            },
            p_value: None,
            points: Vec::new(),
        };
        let m = normalize(&result, 0.95).unwrap();
        assert_eq!(m, normalize(&structured(0.0123), 0.95).unwrap());
    }

    #[test]
    fn missing_actual_is_normalization_error() {
        let result = FittedResult {
            report: String::new(),
            summary: FittedResultShape::Textual("nothing useful here".to_string()),
            p_value: Some(0.5),
            points: Vec::new(),
        };
        let err = normalize(&result, 0.95).unwrap_err();
        assert!(matches!(err, ImpactError::Normalization(_)));
    }

    #[test]
    fn negative_zero_is_not_rendered() {
        assert_eq!(fixed(-0.04, 1), "0.0");
        assert_eq!(fixed(-0.06, 1), "-0.1");
        assert_eq!(pct(12.345), "12.3%");
    }
}
