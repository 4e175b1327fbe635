//! Prerequisite coverage against the course-code catalogue.

use super::text::{contains_keyword, fold};
use crate::config::ScoringConfig;
use crate::data::taxonomy::Taxonomy;

/// Score when the prerequisite text names no known course.
const NO_REQUIREMENTS_SCORE: f64 = 0.8;
/// Score when the student listed no subjects.
const NO_SUBJECTS_SCORE: f64 = 0.5;

/// Fraction of required courses the student has taken, plus the codes they lack.
///
/// A student with no subjects gets the neutral score before requirements are
/// looked at. Missing codes come back in catalogue order.
pub fn score_prerequisites(
    taxonomy: &Taxonomy,
    config: &ScoringConfig,
    subjects: &[String],
    prerequisites: &str,
) -> (f64, Vec<String>) {
    let taken = fold(&subjects.join(" "));
    if taken.is_empty() {
        return (NO_SUBJECTS_SCORE, Vec::new());
    }

    let required: Vec<(&String, &Vec<String>)> = {
        let text = fold(prerequisites);
        taxonomy
            .courses
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| contains_keyword(&text, kw)))
            .collect()
    };

    if required.is_empty() {
        return (NO_REQUIREMENTS_SCORE, Vec::new());
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|(_, keywords)| !keywords.iter().any(|kw| contains_keyword(&taken, kw)))
        .map(|(code, _)| (*code).clone())
        .collect();

    let total = required.len() as f64;
    let mut score = (total - missing.len() as f64) / total;
    if missing.is_empty() {
        score = (score * config.prereq_complete_bonus).min(1.0);
    }
    (score.clamp(0.0, 1.0), missing)
}
