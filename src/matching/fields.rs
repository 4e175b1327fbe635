//! Interest text → canonical academic fields.
//!
//! Typo correction runs first, then keyword containment per field, then a
//! fuzzy pass over the tokens no detected field already explains.

use indexmap::IndexSet;
use tracing::trace;

use super::text::{contains_keyword, fold, similarity, tokens};
use crate::data::taxonomy::Taxonomy;

/// Tokens shorter than this are never fuzzy-matched.
const MIN_FUZZY_TOKEN_CHARS: usize = 3;

/// Fields detected in a student's interests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedFields {
    /// Canonical field names, in taxonomy order for keyword hits followed by
    /// fuzzy hits in token order.
    pub fields: IndexSet<String>,
    pub is_stem: bool,
    /// Folded, typo-corrected interest text.
    pub corrected: String,
}

impl DetectedFields {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A fuzzy field hint for a single token.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldHint {
    pub field: String,
    pub similarity: f64,
}

/// Replace known misspellings token by token. Output is folded.
pub fn correct_typos(taxonomy: &Taxonomy, raw: &str) -> String {
    let folded = fold(raw);
    tokens(&folded)
        .map(|token| {
            taxonomy
                .typos
                .get(token)
                .map(String::as_str)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best field whose name or keywords resemble `token` at or above `threshold`.
///
/// Ties keep the earlier field in taxonomy order.
pub fn fuzzy_field(taxonomy: &Taxonomy, token: &str, threshold: f64) -> Option<FieldHint> {
    if token.chars().count() < MIN_FUZZY_TOKEN_CHARS {
        return None;
    }

    let mut best: Option<FieldHint> = None;
    for (field, keywords) in &taxonomy.fields {
        let score = std::iter::once(field)
            .chain(keywords)
            .map(|candidate| similarity(token, candidate))
            .fold(0.0, f64::max);
        if score >= threshold && best.as_ref().is_none_or(|b| score > b.similarity) {
            best = Some(FieldHint {
                field: field.clone(),
                similarity: score,
            });
        }
    }
    best
}

/// Whether a detected field's keywords already account for `token`.
fn is_covered(taxonomy: &Taxonomy, fields: &IndexSet<String>, token: &str) -> bool {
    fields.iter().any(|field| {
        field.contains(token)
            || taxonomy.fields.get(field).is_some_and(|keywords| {
                keywords
                    .iter()
                    .any(|kw| kw.contains(token) || token.contains(kw.as_str()))
            })
    })
}

/// Detect canonical fields in raw interest text.
pub fn detect_fields(taxonomy: &Taxonomy, raw: &str, fuzzy_threshold: f64) -> DetectedFields {
    let corrected = correct_typos(taxonomy, raw);

    let mut fields: IndexSet<String> = taxonomy
        .fields
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| contains_keyword(&corrected, kw)))
        .map(|(field, _)| field.clone())
        .collect();

    for token in tokens(&corrected) {
        if token.chars().count() < MIN_FUZZY_TOKEN_CHARS
            || taxonomy.is_stop_word(token)
            || token.chars().all(|c| c.is_ascii_digit())
            || is_covered(taxonomy, &fields, token)
        {
            continue;
        }
        if let Some(hint) = fuzzy_field(taxonomy, token, fuzzy_threshold) {
            trace!(
                token,
                field = %hint.field,
                similarity = hint.similarity,
                "fuzzy field hint"
            );
            fields.insert(hint.field);
        }
    }

    let is_stem = fields.iter().any(|f| taxonomy.is_stem_field(f));
    DetectedFields {
        fields,
        is_stem,
        corrected,
    }
}
