//! Weighted combination of the five factor scores, and ranking.
//!
//! Weights are proportions. Per request, the location weight moves to
//! relevance and embedding when the student gave no location, and the
//! prerequisite weight moves likewise when they listed no subjects. The
//! adjusted weights are renormalized to sum to 1.0. After the weighted sum,
//! programs below the low-relevance cutoff are multiplied by their relevance
//! a second time, so strong grade or location fit can't rescue an unrelated
//! program.

use std::cmp::Ordering;

use serde::Serialize;

use super::admission::GradeAssessment;
use crate::config::{ScoringConfig, ScoringWeights};

/// Share of a removed location weight given to relevance; the rest goes to embedding.
const LOCATION_TO_RELEVANCE: f64 = 0.6;
/// Share of a removed prerequisite weight given to relevance; the rest goes to embedding.
const PREREQ_TO_RELEVANCE: f64 = 0.5;

/// Raw factor scores for one (program, profile) pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FactorScores {
    pub relevance: f64,
    pub embedding: f64,
    pub grade: f64,
    pub prereq: f64,
    /// `None` when the student gave no location.
    pub location: Option<f64>,
}

/// Full explanation of a program's combined score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub relevance: f64,
    pub embedding: f64,
    pub grade: f64,
    pub prereq: f64,
    /// `null` means the student did not specify a location.
    pub location: Option<f64>,
    pub grade_assessment: GradeAssessment,
    pub missing_prereqs: Vec<String>,
    pub penalties: Vec<String>,
    pub bonuses: Vec<String>,
    /// Weights actually used for this request, after adjustment.
    pub weights: ScoringWeights,
    pub final_score: f64,
    /// `round(final_score * 100)`.
    pub match_percent: u8,
}

/// Per-request weights: redistribute absent factors, then renormalize.
pub fn adjust_weights(
    base: &ScoringWeights,
    has_location: bool,
    has_subjects: bool,
) -> ScoringWeights {
    let mut w = *base;

    if !has_location {
        w.relevance += w.location * LOCATION_TO_RELEVANCE;
        w.embedding += w.location * (1.0 - LOCATION_TO_RELEVANCE);
        w.location = 0.0;
    }
    if !has_subjects {
        w.relevance += w.prereq * PREREQ_TO_RELEVANCE;
        w.embedding += w.prereq * (1.0 - PREREQ_TO_RELEVANCE);
        w.prereq = 0.0;
    }

    let sum = w.sum();
    if sum <= 0.0 || !sum.is_finite() {
        return ScoringWeights {
            relevance: 1.0,
            embedding: 0.0,
            grade: 0.0,
            prereq: 0.0,
            location: 0.0,
        };
    }
    ScoringWeights {
        relevance: w.relevance / sum,
        embedding: w.embedding / sum,
        grade: w.grade / sum,
        prereq: w.prereq / sum,
        location: w.location / sum,
    }
}

/// Weighted sum with the low-relevance multiplier, clamped to `[0, 1]`.
pub fn combine(weights: &ScoringWeights, scores: &FactorScores, low_relevance_cutoff: f64) -> f64 {
    let mut total = weights.relevance * scores.relevance
        + weights.embedding * scores.embedding
        + weights.grade * scores.grade
        + weights.prereq * scores.prereq
        + weights.location * scores.location.unwrap_or(0.0);

    if scores.relevance < low_relevance_cutoff {
        total *= scores.relevance;
    }
    if total.is_finite() { total.clamp(0.0, 1.0) } else { 0.0 }
}

pub fn match_percent(final_score: f64) -> u8 {
    (final_score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// A scored catalogue entry before ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the catalogue.
    pub index: usize,
    pub breakdown: ScoreBreakdown,
}

/// Candidates after sorting, filtering, and truncation.
#[derive(Debug, Clone)]
pub struct Ranking {
    pub candidates: Vec<Candidate>,
    /// Every candidate fell below the relevance floor; results are unfiltered.
    pub low_confidence: bool,
    /// Candidates removed by the relevance floor.
    pub filtered_out: usize,
}

/// Highest final score first; ties keep catalogue order.
fn by_score(a: &Candidate, b: &Candidate) -> Ordering {
    b.breakdown
        .final_score
        .total_cmp(&a.breakdown.final_score)
        .then(a.index.cmp(&b.index))
}

/// Sort, drop candidates below `min_relevance`, and keep the top `top_k`.
///
/// If the relevance floor would remove everything, the unfiltered ordering is
/// returned instead and flagged as low confidence.
pub fn rank(mut candidates: Vec<Candidate>, config: &ScoringConfig, top_k: usize) -> Ranking {
    candidates.sort_by(by_score);

    let total = candidates.len();
    let relevant: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.breakdown.relevance >= config.min_relevance)
        .cloned()
        .collect();
    let filtered_out = total - relevant.len();

    let (mut kept, low_confidence) = if relevant.is_empty() && total > 0 {
        (candidates, true)
    } else {
        (relevant, false)
    };
    kept.truncate(top_k.max(1));

    Ranking {
        candidates: kept,
        low_confidence,
        filtered_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn breakdown(relevance: f64, final_score: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            relevance,
            embedding: 0.0,
            grade: 0.5,
            prereq: 0.8,
            location: None,
            grade_assessment: GradeAssessment::Unknown,
            missing_prereqs: vec![],
            penalties: vec![],
            bonuses: vec![],
            weights: ScoringWeights::default(),
            final_score,
            match_percent: match_percent(final_score),
        }
    }

    fn candidate(index: usize, relevance: f64, final_score: f64) -> Candidate {
        Candidate {
            index,
            breakdown: breakdown(relevance, final_score),
        }
    }

    fn indices(ranking: &Ranking) -> Vec<usize> {
        ranking.candidates.iter().map(|c| c.index).collect()
    }

    #[test]
    fn adjusted_weights_always_sum_to_one() {
        let base = ScoringWeights::default();
        for has_location in [true, false] {
            for has_subjects in [true, false] {
                let w = adjust_weights(&base, has_location, has_subjects);
                assert!(
                    (w.sum() - 1.0).abs() < EPS,
                    "location={has_location} subjects={has_subjects} sum={}",
                    w.sum()
                );
            }
        }

        let skewed = ScoringWeights {
            relevance: 3.0,
            embedding: 0.0,
            grade: 1.0,
            prereq: 2.0,
            location: 4.0,
        };
        assert!((adjust_weights(&skewed, false, true).sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn missing_location_redistributes_at_default_weights() {
        let w = adjust_weights(&ScoringWeights::default(), false, true);
        assert_eq!(w.location, 0.0);
        assert!((w.relevance - 0.38).abs() < EPS);
        assert!((w.embedding - 0.27).abs() < EPS);
        assert!((w.grade - 0.20).abs() < EPS);
        assert!((w.prereq - 0.15).abs() < EPS);
    }

    #[test]
    fn missing_subjects_split_prereq_weight() {
        let w = adjust_weights(&ScoringWeights::default(), true, false);
        assert_eq!(w.prereq, 0.0);
        assert!((w.relevance - 0.425).abs() < EPS);
        assert!((w.embedding - 0.325).abs() < EPS);
    }

    #[test]
    fn combine_is_weighted_sum() {
        let w = ScoringWeights::default();
        let scores = FactorScores {
            relevance: 1.0,
            embedding: 0.5,
            grade: 0.5,
            prereq: 1.0,
            location: Some(1.0),
        };
        let expected = 0.35 + 0.125 + 0.1 + 0.15 + 0.05;
        assert!((combine(&w, &scores, 0.3) - expected).abs() < EPS);
    }

    #[test]
    fn low_relevance_is_penalized_twice() {
        let w = ScoringWeights::default();
        let scores = FactorScores {
            relevance: 0.2,
            embedding: 1.0,
            grade: 1.0,
            prereq: 1.0,
            location: Some(1.0),
        };
        let weighted = 0.35 * 0.2 + 0.25 + 0.2 + 0.15 + 0.05;
        assert!((combine(&w, &scores, 0.3) - weighted * 0.2).abs() < EPS);
    }

    #[test]
    fn combined_score_is_bounded() {
        let w = ScoringWeights::default();
        let all_ones = FactorScores {
            relevance: 1.0,
            embedding: 1.0,
            grade: 1.0,
            prereq: 1.0,
            location: Some(1.0),
        };
        assert!(combine(&w, &all_ones, 0.3) <= 1.0);
        assert_eq!(combine(&w, &FactorScores::default(), 0.3), 0.0);
    }

    #[test]
    fn match_percent_rounds() {
        assert_eq!(match_percent(0.666), 67);
        assert_eq!(match_percent(0.0), 0);
        assert_eq!(match_percent(1.0), 100);
        assert_eq!(match_percent(0.125), 13);
    }

    #[test]
    fn rank_sorts_filters_and_truncates() {
        let config = ScoringConfig::default();
        let ranking = rank(
            vec![
                candidate(0, 0.5, 0.4),
                candidate(1, 0.05, 0.9),
                candidate(2, 0.9, 0.8),
                candidate(3, 0.7, 0.4),
            ],
            &config,
            2,
        );
        assert_eq!(indices(&ranking), vec![2, 0]);
        assert!(!ranking.low_confidence);
        assert_eq!(ranking.filtered_out, 1);
    }

    #[test]
    fn rank_falls_back_when_nothing_is_relevant() {
        let config = ScoringConfig::default();
        let ranking = rank(
            vec![candidate(0, 0.0, 0.1), candidate(1, 0.05, 0.2)],
            &config,
            10,
        );
        assert_eq!(indices(&ranking), vec![1, 0]);
        assert!(ranking.low_confidence);
    }

    #[test]
    fn rank_of_nothing_is_empty_not_low_confidence() {
        let ranking = rank(vec![], &ScoringConfig::default(), 10);
        assert!(ranking.candidates.is_empty());
        assert!(!ranking.low_confidence);
    }
}
