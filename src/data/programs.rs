//! University program records and the static catalogue they are loaded from.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::matching::text::collapse_whitespace;

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("failed to read catalogue {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("catalogue {path} is not a JSON array of program records")]
    NotAnArray {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A university program, normalized once at load time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub name: String,
    pub university: String,
    #[serde(default)]
    pub url: String,
    /// Free-text admission average ("85-90%", "Below 75%", "Competitive").
    #[serde(default)]
    pub admission_average: String,
    /// Cleaned prerequisite text.
    #[serde(default)]
    pub prerequisites: String,
    #[serde(default)]
    pub co_op: bool,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl Program {
    /// Location text for proximity scoring; falls back to the university name.
    pub fn location_or_university(&self) -> &str {
        if self.location.trim().is_empty() {
            &self.university
        } else {
            &self.location
        }
    }
}

/// On-disk record. Scrapers have used several key spellings over time.
#[derive(Debug, Deserialize)]
struct ProgramRecord {
    #[serde(alias = "program_name", alias = "program")]
    name: String,
    #[serde(alias = "university_name", alias = "institution")]
    university: String,
    #[serde(default, alias = "program_url")]
    url: Option<String>,
    #[serde(default, alias = "average", alias = "admission_avg")]
    admission_average: Option<String>,
    #[serde(default, alias = "prereqs", alias = "requirements")]
    prerequisites: Option<String>,
    #[serde(default, alias = "coop", alias = "co_op_available")]
    co_op: Option<bool>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Strings scrapers emit in place of real prerequisite text.
const GARBAGE_PREREQS: &[&str] = &[
    "n/a",
    "na",
    "none",
    "nil",
    "tbd",
    "to be determined",
    "not available",
    "not specified",
    "unknown",
    "-",
];

static TAG_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"<[^>]*>").unwrap());

static BOILERPLATE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)(click here( for (more )?(details|information))?|(please )?(see|visit|check) (the )?(program |university )?website( for (more )?(details|information))?|prerequisites?\s*:|requirements?\s*:)",
    )
    .unwrap()
});

/// Normalize scraped prerequisite text.
///
/// Strips HTML tags and entities, removes boilerplate phrases, collapses
/// whitespace, and maps placeholder values ("N/A", "None") to an empty string.
pub fn clean_prerequisites(raw: &str) -> String {
    let decoded = if raw.contains('&') {
        htmlize::unescape(raw).to_string()
    } else {
        raw.to_string()
    };
    let no_tags = TAG_RE.replace_all(&decoded, " ");
    let no_boilerplate = BOILERPLATE_RE.replace_all(&no_tags, " ");
    let collapsed = collapse_whitespace(&no_boilerplate);
    let trimmed = collapsed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | ':'))
        .to_string();

    if GARBAGE_PREREQS.contains(&trimmed.to_lowercase().as_str()) {
        String::new()
    } else {
        trimmed
    }
}

fn clean_text(raw: Option<String>) -> String {
    raw.map(|s| collapse_whitespace(&s)).unwrap_or_default()
}

impl ProgramRecord {
    fn into_program(self) -> Option<Program> {
        let name = collapse_whitespace(&self.name);
        let university = collapse_whitespace(&self.university);
        if name.is_empty() || university.is_empty() {
            return None;
        }

        Some(Program {
            name,
            university,
            url: self.url.unwrap_or_default().trim().to_string(),
            admission_average: clean_text(self.admission_average),
            prerequisites: self
                .prerequisites
                .as_deref()
                .map(clean_prerequisites)
                .unwrap_or_default(),
            co_op: self.co_op.unwrap_or(false),
            location: clean_text(self.location),
            embedding: self
                .embedding
                .filter(|v| !v.is_empty() && v.iter().all(|x| x.is_finite())),
        })
    }
}

/// The immutable program catalogue.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    programs: Vec<Arc<Program>>,
    /// Embedding width shared by every program that has one.
    embedding_dim: Option<usize>,
}

impl Catalogue {
    /// Build a catalogue from already-normalized programs.
    ///
    /// Embeddings whose width differs from the first one seen are dropped.
    pub fn new(programs: Vec<Program>) -> Self {
        let mut embedding_dim: Option<usize> = None;
        let mut dropped_embeddings = 0usize;

        let programs = programs
            .into_iter()
            .map(|mut program| {
                if let Some(embedding) = &program.embedding {
                    match embedding_dim {
                        None => embedding_dim = Some(embedding.len()),
                        Some(dim) if dim != embedding.len() => {
                            debug!(
                                program = %program.name,
                                expected = dim,
                                actual = embedding.len(),
                                "Dropping embedding with mismatched dimension"
                            );
                            program.embedding = None;
                            dropped_embeddings += 1;
                        }
                        Some(_) => {}
                    }
                }
                Arc::new(program)
            })
            .collect();

        if dropped_embeddings > 0 {
            warn!(
                count = dropped_embeddings,
                "Programs with mismatched embedding dimension"
            );
        }

        Self {
            programs,
            embedding_dim,
        }
    }

    /// Parse a JSON array of program records, skipping malformed entries.
    pub fn from_json(origin: &str, data: &str) -> Result<Self, CatalogueError> {
        let records: Vec<serde_json::Value> =
            serde_json::from_str(data).map_err(|source| CatalogueError::NotAnArray {
                path: origin.to_string(),
                source,
            })?;

        let total = records.len();
        let mut programs = Vec::with_capacity(total);
        let mut skipped = 0usize;

        for (index, value) in records.into_iter().enumerate() {
            let parsed: Result<ProgramRecord, _> = serde_path_to_error::deserialize(value);
            match parsed {
                Ok(record) => match record.into_program() {
                    Some(program) => programs.push(program),
                    None => {
                        skipped += 1;
                        warn!(index, "Skipping program record with empty name or university");
                    }
                },
                Err(e) => {
                    skipped += 1;
                    warn!(
                        index,
                        path = %e.path(),
                        error = %e.inner(),
                        "Skipping malformed program record"
                    );
                }
            }
        }

        let catalogue = Self::new(programs);
        info!(
            source = origin,
            loaded = catalogue.len(),
            skipped,
            with_embeddings = catalogue.embedded_count(),
            "Loaded program catalogue"
        );
        Ok(catalogue)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogueError> {
        let display = path.display().to_string();
        let data = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&display, &data)
    }

    pub fn programs(&self) -> &[Arc<Program>] {
        &self.programs
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Program>> {
        self.programs.get(index)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.embedding_dim
    }

    fn embedded_count(&self) -> usize {
        self.programs
            .iter()
            .filter(|p| p.embedding.is_some())
            .count()
    }
}
