//! English summary and narrative rendering.
//!
//! Produces the two text artifacts a causal-impact engine conventionally returns:
//!
//! - the tabular "Posterior Inference" summary (columns separated by 2+ spaces,
//!   values at full precision)
//! - the multi-paragraph analysis report
//!
//! The wording follows the established CausalImpact phrasing so that the
//! report translator's patterns apply to this engine and to external ones alike.

use crate::engine::{SummaryCell, SummaryTable};

const WRAP_WIDTH: usize = 72;

/// Numeric outcome of one fit. Relative values are fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactNumbers {
    pub confidence: f64,
    pub actual: SummaryCell,
    pub predicted: SummaryCell,
    pub predicted_sd: SummaryCell,
    pub predicted_lower: SummaryCell,
    pub predicted_upper: SummaryCell,
    pub abs_effect: SummaryCell,
    pub abs_effect_sd: SummaryCell,
    pub abs_effect_lower: SummaryCell,
    pub abs_effect_upper: SummaryCell,
    pub rel_effect: SummaryCell,
    pub rel_effect_sd: SummaryCell,
    pub rel_effect_lower: SummaryCell,
    pub rel_effect_upper: SummaryCell,
    pub p_value: f64,
}

impl ImpactNumbers {
    pub fn confidence_pct(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }

    pub fn is_significant(&self) -> bool {
        self.p_value < 1.0 - self.confidence
    }
}

pub fn summary_table(n: &ImpactNumbers) -> SummaryTable {
    let mut t = SummaryTable::default();
    let mut put = |name: &str, c: SummaryCell| t.insert(name, c.average, c.cumulative);
    put("actual", n.actual);
    put("predicted", n.predicted);
    put("predicted_lower", n.predicted_lower);
    put("predicted_upper", n.predicted_upper);
    put("predicted_sd", n.predicted_sd);
    put("abs_effect", n.abs_effect);
    put("abs_effect_lower", n.abs_effect_lower);
    put("abs_effect_upper", n.abs_effect_upper);
    put("abs_effect_sd", n.abs_effect_sd);
    put("rel_effect", n.rel_effect);
    put("rel_effect_lower", n.rel_effect_lower);
    put("rel_effect_upper", n.rel_effect_upper);
    put("rel_effect_sd", n.rel_effect_sd);
    t
}

fn row(label: &str, average: &str, cumulative: &str) -> String {
    format!("{label:<24}  {average:<17}  {cumulative}")
}

// Summary cells use the shortest repr that parses back to the same f64.

fn with_sd(v: f64, sd: f64) -> String {
    format!("{v} ({sd})")
}

fn pct_with_sd(v: f64, sd: f64) -> String {
    format!("{}% ({}%)", v * 100.0, sd * 100.0)
}

fn ci(lo: f64, hi: f64) -> String {
    format!("[{lo}, {hi}]")
}

fn pct_ci(lo: f64, hi: f64) -> String {
    format!("[{}%, {}%]", lo * 100.0, hi * 100.0)
}

/// Tabular summary text.
pub fn summary_text(n: &ImpactNumbers) -> String {
    let ci_label = format!("{}% CI", n.confidence_pct());
    let lines = [
        "Posterior Inference {Causal Impact}".to_string(),
        row("", "Average", "Cumulative"),
        row("Actual", &n.actual.average.to_string(), &n.actual.cumulative.to_string()),
        row(
            "Prediction (s.d.)",
            &with_sd(n.predicted.average, n.predicted_sd.average),
            &with_sd(n.predicted.cumulative, n.predicted_sd.cumulative),
        ),
        row(
            &ci_label,
            &ci(n.predicted_lower.average, n.predicted_upper.average),
            &ci(n.predicted_lower.cumulative, n.predicted_upper.cumulative),
        ),
        String::new(),
        row(
            "Absolute effect (s.d.)",
            &with_sd(n.abs_effect.average, n.abs_effect_sd.average),
            &with_sd(n.abs_effect.cumulative, n.abs_effect_sd.cumulative),
        ),
        row(
            &ci_label,
            &ci(n.abs_effect_lower.average, n.abs_effect_upper.average),
            &ci(n.abs_effect_lower.cumulative, n.abs_effect_upper.cumulative),
        ),
        String::new(),
        row(
            "Relative effect (s.d.)",
            &pct_with_sd(n.rel_effect.average, n.rel_effect_sd.average),
            &pct_with_sd(n.rel_effect.cumulative, n.rel_effect_sd.cumulative),
        ),
        row(
            &ci_label,
            &pct_ci(n.rel_effect_lower.average, n.rel_effect_upper.average),
            &pct_ci(n.rel_effect_lower.cumulative, n.rel_effect_upper.cumulative),
        ),
        String::new(),
        format!("Posterior tail-area probability p: {:.4}", n.p_value),
        format!("Posterior prob. of a causal effect: {:.2}%", (1.0 - n.p_value) * 100.0),
    ];
    lines
        .iter()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-paragraph narrative report.
pub fn report_text(n: &ImpactNumbers) -> String {
    let c = n.confidence_pct();
    let positive = n.abs_effect.average >= 0.0;

    let mut paragraphs = vec![
        "Analysis report {CausalImpact}".to_string(),
        format!(
            "During the post-intervention period, the response variable had an average value of approx. {:.2}. \
             By contrast, in the absence of an intervention, we would have expected an average response of {:.2}. \
             The {c}% interval of this counterfactual prediction is [{:.2}, {:.2}]. \
             Subtracting this prediction from the observed response yields an estimate of the causal effect \
             the intervention had on the response variable. This effect is {:.2} with a {c}% interval of [{:.2}, {:.2}]. \
             For a discussion of the significance of this effect, see below.",
            n.actual.average,
            n.predicted.average,
            n.predicted_lower.average,
            n.predicted_upper.average,
            n.abs_effect.average,
            n.abs_effect_lower.average,
            n.abs_effect_upper.average,
        ),
        format!(
            "Summing up the individual data points during the post-intervention period \
             (which can only sometimes be meaningfully interpreted), the response variable had an overall value of {:.2}. \
             By contrast, had the intervention not taken place, we would have expected a sum of {:.2}. \
             The {c}% interval of this prediction is [{:.2}, {:.2}].",
            n.actual.cumulative,
            n.predicted.cumulative,
            n.predicted_lower.cumulative,
            n.predicted_upper.cumulative,
        ),
        format!(
            "The above results are given in terms of absolute numbers. In relative terms, \
             the response variable showed {} of {:+.2}%. The {c}% interval of this percentage is [{:.2}%, {:.2}%].",
            if positive { "an increase" } else { "a decrease" },
            n.rel_effect.average * 100.0,
            n.rel_effect_lower.average * 100.0,
            n.rel_effect_upper.average * 100.0,
        ),
    ];

    paragraphs.push(match (n.is_significant(), positive) {
        (true, true) => format!(
            "This means that the positive effect observed during the intervention period is statistically \
             significant and unlikely to be due to random fluctuations. It should be noted, however, that the \
             question of whether this increase also bears substantive significance can only be answered by \
             comparing the absolute effect ({:.2}) to the original goal of the underlying intervention.",
            n.abs_effect.average
        ),
        (true, false) => "This means that the negative effect observed during the intervention period is \
             statistically significant. If the experimenter had expected a positive effect, it is recommended to \
             double-check whether anomalies in the control variables may have caused an overly optimistic \
             expectation of what should have happened in the response variable in the absence of the intervention."
            .to_string(),
        (false, true) => "This means that, although the intervention appears to have caused a positive effect, \
             this effect is not statistically significant when considering the entire post-intervention period as \
             a whole. Individual days or shorter stretches within the intervention period may of course still have \
             had a significant effect, as indicated whenever the lower limit of the impact time series (lower plot) \
             was above zero."
            .to_string(),
        (false, false) => "This means that, although it may look as though the intervention has exerted a negative \
             effect on the response variable when considering the intervention period as a whole, this effect is \
             not statistically significant and so cannot be meaningfully interpreted."
            .to_string(),
    });

    paragraphs.push(if n.is_significant() {
        format!(
            "The probability of obtaining this effect by chance is very small \
             (Bayesian one-sided tail-area probability p = {:.3}). \
             This means the causal effect can be considered statistically significant.",
            n.p_value
        )
    } else {
        format!(
            "The probability of obtaining this effect by chance is p = {:.1}%. \
             This means the effect may be spurious and would generally not be considered statistically significant.",
            n.p_value * 100.0
        )
    });

    paragraphs
        .iter()
        .map(|p| wrap(p, WRAP_WIDTH))
        .collect::<Vec<_>>()
        .join("\n\n\n")
}

/// Greedy word wrap.
fn wrap(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0usize;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        if line_len > 0 && line_len + 1 + len > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(word);
        line_len += len;
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn cell(average: f64, cumulative: f64) -> SummaryCell {
        SummaryCell { average, cumulative }
    }

    pub(crate) fn sample_numbers(p_value: f64, positive: bool) -> ImpactNumbers {
        let sign = if positive { 1.0 } else { -1.0 };
        let actual = if positive { cell(6.52, 195.62) } else { cell(3.12, 93.62) };
        ImpactNumbers {
            confidence: 0.95,
            actual,
            predicted: cell(4.63, 139.02),
            predicted_sd: cell(0.15, 4.42),
            predicted_lower: cell(4.36, 130.76),
            predicted_upper: cell(4.92, 147.61),
            abs_effect: cell(sign * 1.89, sign * 56.62),
            abs_effect_sd: cell(0.15, 4.42),
            abs_effect_lower: cell(sign * 1.61, sign * 47.91),
            abs_effect_upper: cell(sign * 2.16, sign * 64.81),
            rel_effect: cell(sign * 0.4072, sign * 0.4072),
            rel_effect_sd: cell(0.0318, 0.0318),
            rel_effect_lower: cell(sign * 0.3446, sign * 0.3446),
            rel_effect_upper: cell(sign * 0.4662, sign * 0.4662),
            p_value,
        }
    }

    #[test]
    fn summary_columns_are_separated_by_two_spaces() {
        let text = summary_text(&sample_numbers(0.0123, true));
        for line in text.lines().filter(|l| l.starts_with("Prediction") || l.starts_with("95% CI")) {
            let parts: Vec<&str> = line.trim().split("  ").filter(|s| !s.trim().is_empty()).collect();
            assert_eq!(parts.len(), 3, "line: {line}");
        }
        assert!(text.contains("Posterior tail-area probability p: 0.0123"));
    }

    #[test]
    fn report_picks_variants_by_sign_and_significance() {
        let flat = |t: String| t.split_whitespace().collect::<Vec<_>>().join(" ");

        let sig_pos = flat(report_text(&sample_numbers(0.001, true)));
        assert!(sig_pos.contains("the positive effect observed"));
        assert!(sig_pos.contains("very small"));
        assert!(sig_pos.contains("absolute effect (1.89)"));

        let insig_neg = flat(report_text(&sample_numbers(0.3, false)));
        assert!(insig_neg.contains("exerted a negative effect"));
        assert!(insig_neg.contains("p = 30.0%"));
        assert!(insig_neg.contains("a decrease of -40.72%"));
    }

    #[test]
    fn summary_cells_keep_full_precision() {
        let mut n = sample_numbers(0.0123, true);
        n.actual = cell(4.649, 139.449);
        n.rel_effect = cell(0.40649, 0.40649);
        let text = summary_text(&n);
        let actual = text.lines().find(|l| l.starts_with("Actual")).unwrap();
        assert!(actual.contains("4.649") && actual.contains("139.449"), "{actual}");
        assert!(text.contains(&format!("{}%", 0.40649 * 100.0)));
    }

    #[test]
    fn wrap_respects_width() {
        let text = wrap(&"word ".repeat(40), 20);
        assert!(text.lines().all(|l| l.chars().count() <= 20));
    }
}
