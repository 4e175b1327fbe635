//! Matching taxonomy: field keywords, typo corrections, course codes, and
//! the lookup tables the scorers consult.
//!
//! Everything here is data. The built-in table ships in `data/taxonomy.json`
//! and can be replaced wholesale with `TAXONOMY_PATH`; the scorers never
//! branch on specific field names.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::matching::text::fold;

const BUILTIN: &str = include_str!("../../data/taxonomy.json");

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse taxonomy at `{path}`: {message}")]
    Parse { path: String, message: String },
    #[error("invalid taxonomy: {0}")]
    Invalid(String),
}

/// A fixed admission-average phrase ("mid 80s", "highly competitive").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmissionPhrase {
    pub phrase: String,
    pub estimate: f64,
    pub competitive: bool,
}

/// Raw on-disk shape. Converted into [`Taxonomy`] by folding every entry.
#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    fields: IndexMap<String, Vec<String>>,
    #[serde(default)]
    typos: HashMap<String, String>,
    stem_fields: Vec<String>,
    #[serde(default)]
    stem_irrelevant: Vec<String>,
    #[serde(default)]
    non_stem_irrelevant: Vec<String>,
    #[serde(default)]
    technical_terms: Vec<String>,
    #[serde(default)]
    stop_words: Vec<String>,
    courses: IndexMap<String, Vec<String>>,
    #[serde(default)]
    gta_cities: Vec<String>,
    #[serde(default)]
    regions: IndexMap<String, Vec<String>>,
    #[serde(default)]
    admission_phrases: Vec<AdmissionPhrase>,
}

/// Validated, folded lookup tables.
///
/// All keys and keywords are stored folded (see [`fold`]) so the matchers can
/// compare against folded input directly. Course codes keep their display
/// case since they are reported back to callers.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    /// canonical field → keywords, in declaration order
    pub fields: IndexMap<String, Vec<String>>,
    /// misspelled token → correction (may be several words)
    pub typos: HashMap<String, String>,
    pub stem_fields: HashSet<String>,
    pub stem_irrelevant: Vec<String>,
    pub non_stem_irrelevant: Vec<String>,
    /// Words signalling a non-STEM student still wants technical programs.
    pub technical_terms: Vec<String>,
    pub stop_words: HashSet<String>,
    /// course code → keywords that name it
    pub courses: IndexMap<String, Vec<String>>,
    pub gta_cities: Vec<String>,
    /// region name → member cities
    pub regions: IndexMap<String, Vec<String>>,
    pub admission_phrases: Vec<AdmissionPhrase>,
}

impl Taxonomy {
    /// The table compiled into the binary.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_json("<builtin>", BUILTIN)
    }

    /// Load and validate a taxonomy file.
    pub fn from_path(path: &Path) -> Result<Self, TaxonomyError> {
        let shown = path.display().to_string();
        let data = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: shown.clone(),
            source,
        })?;
        let taxonomy = Self::from_json(&shown, &data)?;
        info!(
            path = %shown,
            fields = taxonomy.fields.len(),
            courses = taxonomy.courses.len(),
            "Loaded taxonomy"
        );
        Ok(taxonomy)
    }

    /// Either the file at `path` or the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, TaxonomyError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    fn from_json(origin: &str, data: &str) -> Result<Self, TaxonomyError> {
        let de = &mut serde_json::Deserializer::from_str(data);
        let raw: TaxonomyFile =
            serde_path_to_error::deserialize(de).map_err(|e| TaxonomyError::Parse {
                path: format!("{origin}: {}", e.path()),
                message: e.inner().to_string(),
            })?;
        let taxonomy = Self::from_raw(raw);
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    fn from_raw(raw: TaxonomyFile) -> Self {
        let fold_all = |items: Vec<String>| -> Vec<String> {
            items
                .iter()
                .map(|s| fold(s))
                .filter(|s| !s.is_empty())
                .collect()
        };

        Self {
            fields: raw
                .fields
                .into_iter()
                .map(|(name, keywords)| (fold(&name), fold_all(keywords)))
                .collect(),
            typos: raw
                .typos
                .into_iter()
                .map(|(typo, fix)| (fold(&typo), fold(&fix)))
                .collect(),
            stem_fields: raw.stem_fields.iter().map(|s| fold(s)).collect(),
            stem_irrelevant: fold_all(raw.stem_irrelevant),
            non_stem_irrelevant: fold_all(raw.non_stem_irrelevant),
            technical_terms: fold_all(raw.technical_terms),
            stop_words: raw.stop_words.iter().map(|s| fold(s)).collect(),
            courses: raw
                .courses
                .into_iter()
                .map(|(code, keywords)| (code.trim().to_uppercase(), fold_all(keywords)))
                .collect(),
            gta_cities: fold_all(raw.gta_cities),
            regions: raw
                .regions
                .into_iter()
                .map(|(name, cities)| (fold(&name), fold_all(cities)))
                .collect(),
            admission_phrases: raw
                .admission_phrases
                .into_iter()
                .map(|p| AdmissionPhrase {
                    phrase: fold(&p.phrase),
                    ..p
                })
                .collect(),
        }
    }

    fn validate(&self) -> Result<(), TaxonomyError> {
        if self.fields.is_empty() {
            return Err(TaxonomyError::Invalid("no fields defined".into()));
        }
        if let Some((name, _)) = self.fields.iter().find(|(_, kw)| kw.is_empty()) {
            return Err(TaxonomyError::Invalid(format!(
                "field '{name}' has no keywords"
            )));
        }
        if let Some(unknown) = self
            .stem_fields
            .iter()
            .find(|f| !self.fields.contains_key(*f))
        {
            return Err(TaxonomyError::Invalid(format!(
                "STEM field '{unknown}' is not a defined field"
            )));
        }
        if let Some((code, _)) = self.courses.iter().find(|(_, kw)| kw.is_empty()) {
            return Err(TaxonomyError::Invalid(format!(
                "course '{code}' has no keywords"
            )));
        }
        if let Some(bad) = self
            .admission_phrases
            .iter()
            .find(|p| p.phrase.is_empty() || !(0.0..=100.0).contains(&p.estimate))
        {
            return Err(TaxonomyError::Invalid(format!(
                "admission phrase '{}' has estimate {} outside 0-100",
                bad.phrase, bad.estimate
            )));
        }
        Ok(())
    }

    /// Whether a canonical field belongs to the STEM set.
    pub fn is_stem_field(&self, field: &str) -> bool {
        self.stem_fields.contains(field)
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }
}
