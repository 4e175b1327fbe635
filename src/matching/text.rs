//! Text folding, tokenization, and similarity primitives shared by the matchers.

use unicode_normalization::UnicodeNormalization;

/// Fold free text for matching.
///
/// Pipeline: lowercase -> NFD decompose -> strip combining marks -> map every
/// non-alphanumeric character to a space -> collapse whitespace -> trim.
///
/// Digits are kept so course codes like `MCV4U` survive as `mcv4u`.
pub fn fold(s: &str) -> String {
    let mapped: String = s
        .to_lowercase()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&mapped)
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split already-folded text into word tokens.
pub fn tokens(folded: &str) -> impl Iterator<Item = &str> {
    folded.split_whitespace()
}

/// Whether `phrase` occurs in `haystack` on word boundaries.
///
/// Both sides must already be folded. Used where plain substring containment
/// is too loose (`"on"` inside `"toronto"`, `"milton"` inside `"hamilton"`).
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}

/// Keyword containment used by field detection and relevance.
///
/// Short keywords (`"ai"`, `"art"`, `"law"`) must match on word boundaries;
/// longer ones match as plain substrings so `"robot"` still hits `"robotics"`.
pub fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if keyword.chars().count() <= SHORT_KEYWORD_CHARS {
        contains_phrase(haystack, keyword)
    } else {
        haystack.contains(keyword)
    }
}

const SHORT_KEYWORD_CHARS: usize = 4;

/// String similarity ratio in `[0, 1]`; `1.0` means identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Best similarity between `phrase` and any run of consecutive words in `text`
/// with the same word count as `phrase`.
///
/// A single-word phrase is compared against each word; `"machine learning"`
/// is compared against every two-word window.
pub fn best_window_similarity(phrase: &str, text: &str) -> f64 {
    let words: Vec<&str> = tokens(text).collect();
    let width = tokens(phrase).count().max(1);
    if words.is_empty() {
        return 0.0;
    }
    if words.len() <= width {
        return similarity(phrase, text);
    }

    words
        .windows(width)
        .map(|window| similarity(phrase, &window.join(" ")))
        .fold(0.0, f64::max)
}
