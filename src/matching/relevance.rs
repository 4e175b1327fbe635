//! Literal relevance of a program to the student's detected fields.
//!
//! Relevance dominates the ranking: a semantically close but literally
//! unrelated program ("Sport Management" for a robotics student) must not
//! rank. Field keyword hits are checked in priority order (exact name →
//! fuzzy name → prerequisites), then bonuses are added, the total is
//! normalized by the number of fields, and irrelevance penalties multiply
//! the normalized result.

use super::fields::DetectedFields;
use super::text::{best_window_similarity, contains_keyword, fold, similarity, tokens};
use crate::config::ScoringConfig;
use crate::data::programs::Program;
use crate::data::taxonomy::Taxonomy;

/// Interest words shorter than this never earn name bonuses.
const MIN_INTEREST_WORD_CHARS: usize = 4;

/// Per-request inputs shared by every program scored in a search.
#[derive(Debug, Clone)]
pub struct RelevanceContext<'a> {
    pub taxonomy: &'a Taxonomy,
    pub config: &'a ScoringConfig,
    pub detected: &'a DetectedFields,
    /// Distinct interest words (folded, longer than three characters, no stop words).
    pub interest_words: Vec<String>,
    /// Whether the student asked for technical programs despite non-STEM interests.
    pub wants_technical: bool,
}

impl<'a> RelevanceContext<'a> {
    pub fn new(
        taxonomy: &'a Taxonomy,
        config: &'a ScoringConfig,
        detected: &'a DetectedFields,
        preferences: &[String],
    ) -> Self {
        let mut interest_words: Vec<String> = Vec::new();
        for token in tokens(&detected.corrected) {
            if token.chars().count() >= MIN_INTEREST_WORD_CHARS
                && !taxonomy.is_stop_word(token)
                && !interest_words.iter().any(|w| w == token)
            {
                interest_words.push(token.to_string());
            }
        }

        let mut signals = detected.corrected.clone();
        for preference in preferences {
            signals.push(' ');
            signals.push_str(&fold(preference));
        }
        let wants_technical = taxonomy
            .technical_terms
            .iter()
            .any(|term| contains_keyword(&signals, term));

        Self {
            taxonomy,
            config,
            detected,
            interest_words,
            wants_technical,
        }
    }
}

/// Relevance score with the adjustments that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelevanceScore {
    /// Final relevance in `[0, 1]`.
    pub score: f64,
    /// Relevance before irrelevance penalties, also in `[0, 1]`.
    pub unpenalized: f64,
    pub penalties: Vec<String>,
    pub bonuses: Vec<String>,
}

/// Credit one field earns against a program, checked in priority order.
fn field_credit(
    ctx: &RelevanceContext<'_>,
    keywords: &[String],
    name: &str,
    prerequisites: &str,
) -> f64 {
    let cfg = ctx.config;
    if keywords.iter().any(|kw| contains_keyword(name, kw)) {
        cfg.keyword_hit
    } else if keywords
        .iter()
        .any(|kw| best_window_similarity(kw, name) >= cfg.keyword_fuzzy)
    {
        cfg.fuzzy_keyword_hit
    } else if !prerequisites.is_empty()
        && keywords.iter().any(|kw| contains_keyword(prerequisites, kw))
    {
        cfg.prereq_keyword_hit
    } else {
        0.0
    }
}

pub fn score_relevance(ctx: &RelevanceContext<'_>, program: &Program) -> RelevanceScore {
    let cfg = ctx.config;
    let name = fold(&program.name);
    let prerequisites = fold(&program.prerequisites);

    let mut score = 0.0;
    let mut max_score = 0.0;
    let mut penalties = Vec::new();
    let mut bonuses = Vec::new();

    if ctx.detected.is_empty() {
        // Nothing recognized: fall back to resemblance with the program name.
        max_score = 1.0;
        for word in &ctx.interest_words {
            if best_window_similarity(word, &name) >= cfg.name_fuzzy {
                score += cfg.name_fuzzy_hit;
            }
        }
    } else {
        for field in &ctx.detected.fields {
            max_score += 1.0;
            if let Some(keywords) = ctx.taxonomy.fields.get(field) {
                score += field_credit(ctx, keywords, &name, &prerequisites);
            }
        }
    }

    let mut verbatim: Vec<&str> = Vec::new();
    for word in &ctx.interest_words {
        if contains_keyword(&name, word) {
            score += cfg.verbatim_word_bonus;
            verbatim.push(word);
            bonuses.push(format!(
                "'{word}' appears in the program name (+{})",
                cfg.verbatim_word_bonus
            ));
        }
    }

    if ctx.detected.is_stem && program.co_op {
        score += cfg.co_op_bonus;
        bonuses.push(format!("Co-op available (+{})", cfg.co_op_bonus));
    }

    // Awarded once per program, for the first interest word with a close match.
    let strong = ctx
        .interest_words
        .iter()
        .filter(|word| !verbatim.contains(&word.as_str()))
        .find_map(|word| {
            tokens(&name)
                .find(|name_word| similarity(word, name_word) >= cfg.strong_word_fuzzy)
                .map(|name_word| (word.as_str(), name_word))
        });
    if let Some((word, name_word)) = strong {
        score += cfg.strong_word_bonus;
        bonuses.push(format!(
            "'{word}' closely matches '{name_word}' (+{})",
            cfg.strong_word_bonus
        ));
    }

    let unpenalized = (score / f64::max(max_score, 1.0)).clamp(0.0, 1.0);
    let mut relevance = unpenalized;

    if ctx.detected.is_stem
        && let Some(phrase) = ctx
            .taxonomy
            .stem_irrelevant
            .iter()
            .find(|phrase| contains_keyword(&name, phrase))
    {
        relevance *= cfg.stem_irrelevant_penalty;
        penalties.push(format!(
            "'{phrase}' is unrelated to STEM interests (x{})",
            cfg.stem_irrelevant_penalty
        ));
    }

    if !ctx.detected.is_stem
        && !ctx.wants_technical
        && let Some(phrase) = ctx
            .taxonomy
            .non_stem_irrelevant
            .iter()
            .find(|phrase| contains_keyword(&name, phrase))
    {
        relevance *= cfg.non_stem_irrelevant_penalty;
        penalties.push(format!(
            "'{phrase}' is a technical program outside the stated interests (x{})",
            cfg.non_stem_irrelevant_penalty
        ));
    }

    RelevanceScore {
        score: relevance,
        unpenalized,
        penalties,
        bonuses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::fields::detect_fields;

    fn program(name: &str, prerequisites: &str, co_op: bool) -> Program {
        Program {
            name: name.into(),
            university: "Test University".into(),
            url: String::new(),
            admission_average: String::new(),
            prerequisites: prerequisites.into(),
            co_op,
            location: String::new(),
            embedding: None,
        }
    }

    fn score(interests: &str, preferences: &[String], program: &Program) -> RelevanceScore {
        let taxonomy = Taxonomy::builtin().unwrap();
        let config = ScoringConfig::default();
        let detected = detect_fields(&taxonomy, interests, config.field_fuzzy);
        let ctx = RelevanceContext::new(&taxonomy, &config, &detected, preferences);
        score_relevance(&ctx, program)
    }

    #[test]
    fn exact_keyword_in_name_is_full_credit() {
        let result = score("robotics and AI", &[], &program("Mechatronics Engineering", "", false));
        assert_eq!(result.score, 1.0);
        assert!(result.penalties.is_empty());
    }

    #[test]
    fn stem_student_penalized_for_sport_management() {
        let result = score("robotics", &[], &program("Sport Management", "", false));
        assert!(result.score <= 0.05 * result.unpenalized + 1e-12);
        assert!(result.score <= 0.1);
        assert_eq!(result.penalties.len(), 1);
    }

    #[test]
    fn stem_penalty_scales_prepenalty_relevance() {
        // Co-op bonus lifts the unpenalized score above zero so the multiplier is visible.
        let result = score("robotics", &[], &program("Sport Management", "", true));
        assert!(result.unpenalized > 0.0);
        assert!((result.score - 0.05 * result.unpenalized).abs() < 1e-12);
    }

    #[test]
    fn prerequisite_keyword_earns_partial_credit() {
        let result = score(
            "chemistry",
            &[],
            &program("Forensic Science", "SCH4U chemistry, SBI4U", false),
        );
        assert!((result.score - 0.3).abs() < 1e-9, "got {}", result.score);
    }

    #[test]
    fn fuzzy_keyword_in_name_earns_partial_credit() {
        // "psychology" vs "psychologie" is one edit apart.
        let result = score("psychology", &[], &program("Psychologie", "", false));
        let cfg = ScoringConfig::default();
        // Fuzzy hit plus the strong single-word bonus.
        let expected = (cfg.fuzzy_keyword_hit + cfg.strong_word_bonus).min(1.0);
        assert!((result.score - expected).abs() < 1e-9, "got {}", result.score);
    }

    #[test]
    fn verbatim_interest_word_earns_bonus() {
        let result = score(
            "engineering",
            &[],
            &program("Mechanical Engineering", "", false),
        );
        assert_eq!(result.score, 1.0);
        assert_eq!(result.bonuses.len(), 1);
    }

    #[test]
    fn multiple_fields_normalize_by_field_count() {
        let result = score("history and biology", &[], &program("History", "", false));
        // history: 1.0, biology: 0.0, plus verbatim bonus 0.5 → 1.5 / 2
        assert!((result.score - 0.75).abs() < 1e-9, "got {}", result.score);
    }

    #[test]
    fn non_stem_student_penalized_for_mechatronics() {
        let result = score("painting", &[], &program("Mechatronics", "", false));
        assert!(result.penalties.iter().any(|p| p.contains("mechatronics")));
    }

    #[test]
    fn technical_preference_lifts_non_stem_penalty() {
        let prefs = vec!["open to technology programs".to_string()];
        let result = score("painting", &prefs, &program("Mechatronics", "", false));
        assert!(result.penalties.is_empty());
    }

    #[test]
    fn strong_word_bonus_counts_once() {
        let result = score("pottry weavng", &[], &program("Pottery Weaving", "", false));
        let strong = result
            .bonuses
            .iter()
            .filter(|b| b.contains("closely matches"))
            .count();
        assert_eq!(strong, 1, "bonuses: {:?}", result.bonuses);
    }

    #[test]
    fn science_in_interests_is_not_a_technical_request() {
        let result = score(
            "history and political science",
            &[],
            &program("Mechatronics Engineering", "", false),
        );
        assert!(
            result.penalties.iter().any(|p| p.contains("mechatronics")),
            "penalties: {:?}",
            result.penalties
        );
    }

    #[test]
    fn no_fields_falls_back_to_name_resemblance() {
        let result = score("skateboarding", &[], &program("Skateboard Design", "", false));
        // "skateboarding" vs "skateboard" clears the name threshold but not the strong-word one.
        assert!((result.score - 0.5).abs() < 1e-9, "got {}", result.score);
        assert!(result.bonuses.is_empty());

        let unrelated = score("skateboarding", &[], &program("Nursing", "", false));
        assert_eq!(unrelated.score, 0.0);
    }

    #[test]
    fn co_op_bonus_only_for_stem() {
        let stem = score("physics", &[], &program("Astronomy", "", true));
        assert!(stem.bonuses.iter().any(|b| b.starts_with("Co-op")));
        let non_stem = score("history", &[], &program("Classics", "", true));
        assert!(non_stem.bonuses.is_empty());
    }
}
