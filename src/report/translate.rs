//! English → Japanese narrative report translation.
//!
//! The report is split into paragraphs on blank lines. Each paragraph is matched
//! (whitespace-collapsed) against an ordered rule list; the first matching rule
//! re-emits a Japanese template carrying the captured numerals verbatim.
//! Unmatched paragraphs pass through unchanged, so translation never fails.
//!
//! Patterns are keyed on English tokens, so running the translator over its own
//! output leaves every paragraph as is.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::domain::{LocalizedReport, Paragraph, ParagraphSource};

const NUM: &str = r"[-+]?[0-9][0-9,]*(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?";

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());

struct Rule {
    name: &'static str,
    pattern: Regex,
    render: fn(&Captures<'_>, u32) -> String,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, render: fn(&Captures<'_>, u32) -> String) -> Self {
        let pattern = format!("^{}$", pattern.replace("{N}", &format!("({NUM})")));
        Self {
            name,
            // Patterns are compile-time constants covered by the tests below.
            pattern: Regex::new(&pattern).unwrap(),
            render,
        }
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new("header", r"Analysis report \{CausalImpact\}", |_, _| {
            "分析レポート {CausalImpact}".to_string()
        }),
        Rule::new(
            "opening",
            r"During the post-intervention period, the response variable had an average value of approx\. {N}\. By contrast, in the absence of an intervention, we would have expected an average response of {N}\. The {N}% interval of this counterfactual prediction is \[{N}, {N}\]\. Subtracting this prediction from the observed response yields an estimate of the causal effect the intervention had on the response variable\. This effect is {N} with a {N}% interval of \[{N}, {N}\]\. For a discussion of the significance of this effect, see below\.",
            |c, conf| {
                format!(
                    "介入後の期間において、応答変数の平均値は約{}でした。一方、介入がなかった場合に予測される平均値は{}でした。\
                     この反事実予測の{conf}%区間は[{}, {}]です。観測値からこの予測値を差し引くことで、介入が応答変数に与えた因果効果を推定できます。\
                     この効果は{}で、{conf}%区間は[{}, {}]です。この効果の有意性については以下を参照してください。",
                    &c[1], &c[2], &c[4], &c[5], &c[6], &c[8], &c[9]
                )
            },
        ),
        Rule::new(
            "cumulative",
            r"Summing up the individual data points during the post-intervention period \(which can only sometimes be meaningfully interpreted\), the response variable had an overall value of {N}\. By contrast, had the intervention not taken place, we would have expected a sum of {N}\. The {N}% interval of this prediction is \[{N}, {N}\]\.",
            |c, conf| {
                format!(
                    "介入後の期間の各データ点を合計すると（この値が意味を持つのは限られた場合のみです）、応答変数の合計値は{}でした。\
                     一方、介入がなかった場合に予測される合計値は{}でした。この予測の{conf}%区間は[{}, {}]です。",
                    &c[1], &c[2], &c[4], &c[5]
                )
            },
        ),
        Rule::new(
            "percentage",
            r"The above results are given in terms of absolute numbers\. In relative terms, the response variable showed (an increase|a decrease) of {N}%\. The {N}% interval of this percentage is \[{N}%, {N}%\]\.",
            |c, conf| {
                let direction = if &c[1] == "an increase" { "増加" } else { "減少" };
                format!(
                    "以上の結果は絶対値で示したものです。相対値で見ると、応答変数は{}%の{direction}を示しました。\
                     この割合の{conf}%区間は[{}%, {}%]です。",
                    &c[2], &c[4], &c[5]
                )
            },
        ),
        Rule::new(
            "significant-positive",
            r"This means that the positive effect observed during the intervention period is statistically significant and unlikely to be due to random fluctuations\. .*comparing the absolute effect \({N}\) to the original goal of the underlying intervention\.",
            |c, _| {
                format!(
                    "これは、介入期間中に観測された正の効果が統計的に有意であり、偶然の変動によるものである可能性は低いことを意味します。\
                     ただし、この増加が実質的にも意味を持つかどうかは、絶対効果（{}）を介入の本来の目標と比較することでのみ判断できます。",
                    &c[1]
                )
            },
        ),
        Rule::new(
            "significant-negative",
            r"This means that the negative effect observed during the intervention period is statistically significant\. .*in the absence of the intervention\.",
            |_, _| {
                "これは、介入期間中に観測された負の効果が統計的に有意であることを意味します。\
                 正の効果を期待していた場合は、コントロール変数の異常によって、介入がなかった場合の応答変数の予測が\
                 過度に楽観的になっていないかを再確認することを推奨します。"
                    .to_string()
            },
        ),
        Rule::new(
            "insignificant-positive",
            r"This means that, although the intervention appears to have caused a positive effect, this effect is not statistically significant when considering the entire post-intervention period as a whole\..*",
            |_, _| {
                "これは、介入が正の効果をもたらしたように見えるものの、介入後の期間全体で見るとこの効果は統計的に有意ではないことを意味します。\
                 ただし、介入期間内の個々の日やより短い期間では、効果の下限がゼロを上回っている箇所で有意な効果があった可能性があります。"
                    .to_string()
            },
        ),
        Rule::new(
            "insignificant-negative",
            r"This means that, although it may look as though the intervention has exerted a negative effect on the response variable when considering the intervention period as a whole, this effect is not statistically significant and so cannot be meaningfully interpreted\.",
            |_, _| {
                "これは、介入期間全体で見ると介入が応答変数に負の効果を及ぼしたように見えるものの、\
                 この効果は統計的に有意ではなく、意味のある解釈はできないことを意味します。"
                    .to_string()
            },
        ),
        Rule::new(
            "closing-significant",
            r"The probability of obtaining this effect by chance is very small \(Bayesian one-sided tail-area probability p = {N}\)\. This means the causal effect can be considered statistically significant\.",
            |c, _| {
                format!(
                    "この効果が偶然によって得られる確率は非常に小さい値です（ベイズ片側裾確率 p = {}）。\
                     したがって、この因果効果は統計的に有意であるとみなせます。",
                    &c[1]
                )
            },
        ),
        Rule::new(
            "closing-insignificant",
            r"The probability of obtaining this effect by chance is p = {N}%\. This means the effect may be spurious and would generally not be considered statistically significant\.",
            |c, _| {
                format!(
                    "この効果が偶然によって得られる確率は p = {}% です。\
                     したがって、この効果は見せかけのものである可能性があり、一般には統計的に有意とはみなされません。",
                    &c[1]
                )
            },
        ),
    ]
});

fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn confidence_pct(confidence_level: f64) -> u32 {
    (confidence_level * 100.0).round() as u32
}

fn translate_paragraph(paragraph: &str, confidence: u32) -> Paragraph {
    let flat = collapse_whitespace(paragraph);
    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(&flat) {
            debug!(rule = rule.name, "paragraph translated");
            return Paragraph {
                text: (rule.render)(&caps, confidence),
                source: ParagraphSource::Translated {
                    rule: rule.name.to_string(),
                },
            };
        }
    }
    Paragraph {
        text: paragraph.to_string(),
        source: ParagraphSource::Verbatim,
    }
}

/// Translate a narrative report paragraph by paragraph.
pub fn translate(report_text: &str, confidence_level: f64) -> LocalizedReport {
    let confidence = confidence_pct(confidence_level);
    let normalized = report_text.replace("\r\n", "\n");
    let paragraphs = RE_PARAGRAPH_BREAK
        .split(&normalized)
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.trim().is_empty())
        .map(|p| translate_paragraph(p, confidence))
        .collect();
    LocalizedReport { paragraphs }
}

/// Translate and render as text with single blank lines between paragraphs.
pub fn translate_text(report_text: &str, confidence_level: f64) -> String {
    collapse_blank_lines(&translate(report_text, confidence_level).to_text())
}

/// Collapse runs of 2+ blank lines into one.
pub fn collapse_blank_lines(text: &str) -> String {
    RE_EXCESS_BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::render::report_text;
    use crate::engine::render::tests::sample_numbers;

    fn rules_hit(report: &LocalizedReport) -> Vec<String> {
        report
            .paragraphs
            .iter()
            .filter_map(|p| match &p.source {
                ParagraphSource::Translated { rule } => Some(rule.clone()),
                ParagraphSource::Verbatim => None,
            })
            .collect()
    }

    #[test]
    fn every_rule_pattern_compiles() {
        assert_eq!(RULES.len(), 10);
    }

    #[test]
    fn significant_positive_report_is_fully_translated() {
        let report = translate(&report_text(&sample_numbers(0.001, true)), 0.95);
        assert_eq!(
            rules_hit(&report),
            vec![
                "header",
                "opening",
                "cumulative",
                "percentage",
                "significant-positive",
                "closing-significant"
            ]
        );
        let text = report.to_text();
        assert!(text.contains("応答変数の平均値は約6.52でした"));
        assert!(text.contains("95%区間は[4.36, 4.92]"));
        assert!(text.contains("+40.72%の増加"));
        assert!(text.contains("絶対効果（1.89）"));
        assert!(text.contains("p = 0.001）"));
    }

    #[test]
    fn insignificant_negative_report_picks_matching_variants() {
        let report = translate(&report_text(&sample_numbers(0.3, false)), 0.95);
        let hits = rules_hit(&report);
        assert!(hits.contains(&"insignificant-negative".to_string()));
        assert!(hits.contains(&"closing-insignificant".to_string()));
        let text = report.to_text();
        assert!(text.contains("-40.72%の減少"));
        assert!(text.contains("p = 30.0% です"));
    }

    #[test]
    fn confidence_level_is_substituted() {
        let english = report_text(&sample_numbers(0.001, true));
        let text = translate_text(&english, 0.9);
        assert!(text.contains("90%区間"));
        assert!(!text.contains("95%区間"));
    }

    #[test]
    fn translation_is_idempotent() {
        let once = translate_text(&report_text(&sample_numbers(0.02, true)), 0.95);
        let twice = translate_text(&once, 0.95);
        assert_eq!(once, twice);
        assert_eq!(translate(&once, 0.95).translated_count(), 0);
    }

    #[test]
    fn unknown_paragraphs_pass_through() {
        let text = "First line\nstill first.\n\n\n\n\nSecond paragraph.";
        let report = translate(text, 0.95);
        assert_eq!(report.paragraphs.len(), 2);
        assert_eq!(report.paragraphs[0].text, "First line\nstill first.");
        assert_eq!(report.paragraphs[0].source, ParagraphSource::Verbatim);
        assert_eq!(
            translate_text(text, 0.95),
            "First line\nstill first.\n\nSecond paragraph."
        );
    }

    #[test]
    fn blank_line_runs_collapse() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb\n \n\t\nc"), "a\n\nb\n\nc");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }
}
