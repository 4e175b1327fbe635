//! Admission-average parsing and grade-fit scoring.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::text::fold;
use crate::config::ScoringConfig;
use crate::data::taxonomy::Taxonomy;

/// Parsed estimate when nothing in the text is recognized.
const DEFAULT_ESTIMATE: f64 = 75.0;
/// Estimates at or above this mark a program as competitive.
const COMPETITIVE_AVERAGE: f64 = 85.0;
/// Amount subtracted from "below N" / "under N" bounds.
const BELOW_OFFSET: f64 = 5.0;

static BELOW_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)\b(?:below|under|less than)\s*(\d{1,3}(?:\.\d+)?)").unwrap()
});

static RANGE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%?\s*(?:-|–|—|to)\s*(\d{1,3}(?:\.\d+)?)").unwrap()
});

static PERCENT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").unwrap());

/// Numeric reading of a free-text admission average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdmissionEstimate {
    pub average: f64,
    pub competitive: bool,
}

/// How a student's average compares to a program's estimated cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeAssessment {
    Safe,
    Good,
    Target,
    Reach,
    #[serde(rename = "Long Shot")]
    LongShot,
    Unknown,
}

impl GradeAssessment {
    /// Label for a student-minus-estimate delta.
    pub fn from_delta(delta: f64) -> Self {
        if delta >= 10.0 {
            Self::Safe
        } else if delta >= 5.0 {
            Self::Good
        } else if delta >= 0.0 {
            Self::Target
        } else if delta >= -5.0 {
            Self::Reach
        } else {
            Self::LongShot
        }
    }
}

impl fmt::Display for GradeAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Safe => "Safe",
            Self::Good => "Good",
            Self::Target => "Target",
            Self::Reach => "Reach",
            Self::LongShot => "Long Shot",
            Self::Unknown => "Unknown",
        })
    }
}

fn number(caps: &regex::Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?.as_str().parse().ok()
}

/// Parse a free-text admission average. First matching rule wins:
///
/// 1. `below N` / `under N` → `N - 5`, not competitive
/// 2. `N-M` → midpoint, competitive when `M >= 85`
/// 3. `N%` → `N`, competitive when `N >= 85`
/// 4. taxonomy phrase table ("highly competitive", "mid 80s", ...)
/// 5. 75, not competitive
pub fn parse_admission_average(taxonomy: &Taxonomy, text: &str) -> AdmissionEstimate {
    if let Some(bound) = BELOW_RE.captures(text).and_then(|c| number(&c, 1)) {
        return AdmissionEstimate {
            average: bound - BELOW_OFFSET,
            competitive: false,
        };
    }

    if let Some(caps) = RANGE_RE.captures(text)
        && let (Some(low), Some(high)) = (number(&caps, 1), number(&caps, 2))
    {
        return AdmissionEstimate {
            average: (low + high) / 2.0,
            competitive: high >= COMPETITIVE_AVERAGE,
        };
    }

    if let Some(value) = PERCENT_RE.captures(text).and_then(|c| number(&c, 1)) {
        return AdmissionEstimate {
            average: value,
            competitive: value >= COMPETITIVE_AVERAGE,
        };
    }

    let folded = fold(text);
    if let Some(phrase) = taxonomy
        .admission_phrases
        .iter()
        .find(|p| folded.contains(p.phrase.as_str()))
    {
        return AdmissionEstimate {
            average: phrase.estimate,
            competitive: phrase.competitive,
        };
    }

    AdmissionEstimate {
        average: DEFAULT_ESTIMATE,
        competitive: false,
    }
}

/// Logistic curve; saturates cleanly instead of overflowing.
fn sigmoid(delta: f64, k: f64) -> f64 {
    let exponent = -k * delta;
    if exponent > 700.0 {
        0.0
    } else if exponent < -700.0 {
        1.0
    } else {
        1.0 / (1.0 + exponent.exp())
    }
}

/// Grade-fit score and label for a student average against a program.
///
/// An average of zero or below means "unknown" and yields a neutral score
/// without looking at the program text.
pub fn score_grade_fit(
    taxonomy: &Taxonomy,
    config: &ScoringConfig,
    student_average: f64,
    admission_text: &str,
) -> (f64, GradeAssessment) {
    if !student_average.is_finite() || student_average <= 0.0 {
        return (0.5, GradeAssessment::Unknown);
    }

    let estimate = parse_admission_average(taxonomy, admission_text);
    let delta = student_average - estimate.average;

    let mut score = sigmoid(delta, config.sigmoid_k);
    if estimate.competitive && delta >= 0.0 {
        score = (score * config.competitive_boost).min(1.0);
    }
    if delta > config.overqualified_delta {
        score *= config.overqualified_discount;
    }

    (score.clamp(0.0, 1.0), GradeAssessment::from_delta(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> Taxonomy {
        Taxonomy::builtin().unwrap()
    }

    fn parse(text: &str) -> AdmissionEstimate {
        parse_admission_average(&taxonomy(), text)
    }

    #[test]
    fn parses_below_bound() {
        assert_eq!(
            parse("Below 75%"),
            AdmissionEstimate {
                average: 70.0,
                competitive: false
            }
        );
        assert_eq!(parse("under 80").average, 75.0);
    }

    #[test]
    fn parses_range_midpoint() {
        assert_eq!(
            parse("85-90%"),
            AdmissionEstimate {
                average: 87.5,
                competitive: true
            }
        );
        assert_eq!(
            parse("78% to 84%"),
            AdmissionEstimate {
                average: 81.0,
                competitive: false
            }
        );
        assert_eq!(parse("80 – 85").average, 82.5);
    }

    #[test]
    fn parses_single_percentage() {
        assert_eq!(
            parse("75%"),
            AdmissionEstimate {
                average: 75.0,
                competitive: false
            }
        );
        assert!(parse("Approximately 88 %").competitive);
    }

    #[test]
    fn parses_phrases() {
        assert_eq!(
            parse("Competitive"),
            AdmissionEstimate {
                average: 90.0,
                competitive: true
            }
        );
        assert_eq!(parse("Highly competitive").average, 92.0);
        assert_eq!(
            parse("Mid-80s"),
            AdmissionEstimate {
                average: 85.0,
                competitive: true
            }
        );
        assert_eq!(
            parse("Low 70s"),
            AdmissionEstimate {
                average: 72.0,
                competitive: false
            }
        );
    }

    #[test]
    fn unknown_text_defaults() {
        assert_eq!(
            parse("Contact the registrar"),
            AdmissionEstimate {
                average: 75.0,
                competitive: false
            }
        );
        assert_eq!(parse("").average, 75.0);
    }

    #[test]
    fn zero_average_is_neutral() {
        let t = taxonomy();
        let cfg = ScoringConfig::default();
        assert_eq!(
            score_grade_fit(&t, &cfg, 0.0, "90%"),
            (0.5, GradeAssessment::Unknown)
        );
        assert_eq!(
            score_grade_fit(&t, &cfg, -3.0, "garbage"),
            (0.5, GradeAssessment::Unknown)
        );
    }

    #[test]
    fn score_is_monotonic_in_average() {
        let t = taxonomy();
        let cfg = ScoringConfig::default();
        let mut previous = 0.0;
        for average in [60.0, 70.0, 75.0, 79.0, 80.0, 84.0, 90.0, 95.0] {
            let (score, _) = score_grade_fit(&t, &cfg, average, "80%");
            assert!(
                score > previous,
                "score at {average} ({score}) should exceed {previous}"
            );
            previous = score;
        }
    }

    #[test]
    fn competitive_boost_applies_at_or_above_estimate() {
        let t = taxonomy();
        let cfg = ScoringConfig::default();
        let (score, label) = score_grade_fit(&t, &cfg, 88.0, "85-90%");
        let expected = (sigmoid(0.5, 0.25) * 1.1).min(1.0);
        assert!((score - expected).abs() < 1e-12);
        assert_eq!(label, GradeAssessment::Target);
    }

    #[test]
    fn overqualification_discount() {
        let t = taxonomy();
        let cfg = ScoringConfig::default();
        let (score, label) = score_grade_fit(&t, &cfg, 98.0, "70%");
        assert!((score - sigmoid(28.0, 0.25) * 0.95).abs() < 1e-12);
        assert_eq!(label, GradeAssessment::Safe);
    }

    #[test]
    fn sigmoid_saturates() {
        assert_eq!(sigmoid(-1e6, 0.25), 0.0);
        assert_eq!(sigmoid(1e6, 0.25), 1.0);
        assert_eq!(sigmoid(0.0, 0.25), 0.5);
    }

    #[test]
    fn assessment_thresholds() {
        assert_eq!(GradeAssessment::from_delta(10.0), GradeAssessment::Safe);
        assert_eq!(GradeAssessment::from_delta(5.0), GradeAssessment::Good);
        assert_eq!(GradeAssessment::from_delta(0.0), GradeAssessment::Target);
        assert_eq!(GradeAssessment::from_delta(-5.0), GradeAssessment::Reach);
        assert_eq!(GradeAssessment::from_delta(-5.1), GradeAssessment::LongShot);
        assert_eq!(GradeAssessment::LongShot.to_string(), "Long Shot");
    }
}
