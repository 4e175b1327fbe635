//! The program-ranking engine.
//!
//! A [`Recommender`] owns the immutable catalogue, taxonomy, and embedding
//! matrix, plus the shared query-embedding cache. Each search detects the
//! student's fields once, scores every program on five factors, combines
//! them, and ranks the result.

pub mod admission;
pub mod combiner;
pub mod fields;
pub mod location;
pub mod prereqs;
pub mod relevance;
pub mod text;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::{ScoringConfig, ScoringWeights};
use crate::data::profile::StudentProfile;
use crate::data::programs::{Catalogue, Program};
use crate::data::taxonomy::Taxonomy;
use crate::embedding::{EmbeddingIndex, QueryEmbedder};
use crate::utils::{fmt_duration, log_if_slow};

use self::combiner::{Candidate, FactorScores, ScoreBreakdown};
use self::fields::{DetectedFields, detect_fields};
use self::relevance::{RelevanceContext, score_relevance};

/// Searches slower than this are logged at `warn`.
const SLOW_SEARCH: Duration = Duration::from_millis(250);

/// One program in a ranking.
#[derive(Debug, Clone, Serialize)]
pub struct RankedProgram {
    /// Position in the catalogue, usable with the single-program score endpoint.
    pub index: usize,
    pub program: Arc<Program>,
    pub final_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Result of [`Recommender::search`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<RankedProgram>,
    /// No program cleared the relevance floor; `results` is the unfiltered top of the list.
    pub low_confidence: bool,
    pub note: Option<String>,
    pub embedding_available: bool,
    pub detected_fields: Vec<String>,
    pub is_stem: bool,
}

/// Everything about a profile that is shared across programs in one search.
struct ProfileSignals {
    detected: DetectedFields,
    weights: ScoringWeights,
}

pub struct Recommender {
    taxonomy: Arc<Taxonomy>,
    config: ScoringConfig,
    catalogue: Arc<Catalogue>,
    index: EmbeddingIndex,
    embedder: QueryEmbedder,
}

impl Recommender {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        config: ScoringConfig,
        catalogue: Arc<Catalogue>,
        embedder: QueryEmbedder,
    ) -> Self {
        let index = EmbeddingIndex::from_catalogue(&catalogue);
        Self {
            taxonomy,
            config,
            catalogue,
            index,
            embedder,
        }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn embedder(&self) -> &QueryEmbedder {
        &self.embedder
    }

    fn signals(&self, profile: &StudentProfile) -> ProfileSignals {
        ProfileSignals {
            detected: detect_fields(&self.taxonomy, &profile.interests, self.config.field_fuzzy),
            weights: combiner::adjust_weights(
                &self.config.weights,
                profile.has_location(),
                profile.has_subjects(),
            ),
        }
    }

    /// Relative semantic similarity of every catalogue program, or `None`
    /// when no query embedding could be obtained.
    async fn catalogue_similarities(&self, profile: &StudentProfile) -> Option<Vec<f64>> {
        if self.index.dim().is_none() || !self.embedder.is_enabled() {
            return None;
        }
        let query = self.embedder.embed_query(&profile.query_text()).await?;
        let similarities = self.index.similarities(&query);
        if similarities.is_none() {
            debug!(
                query_dim = query.len(),
                catalogue_dim = ?self.index.dim(),
                "Query embedding does not match catalogue dimension"
            );
        }
        similarities
    }

    fn score_program(
        &self,
        signals: &ProfileSignals,
        ctx: &RelevanceContext<'_>,
        profile: &StudentProfile,
        program: &Program,
        embedding: f64,
    ) -> ScoreBreakdown {
        let relevance = score_relevance(ctx, program);
        let (grade, grade_assessment) = admission::score_grade_fit(
            &self.taxonomy,
            &self.config,
            profile.average,
            &program.admission_average,
        );
        let (prereq, missing_prereqs) = prereqs::score_prerequisites(
            &self.taxonomy,
            &self.config,
            &profile.subjects,
            &program.prerequisites,
        );
        let location = location::score_location(
            &self.taxonomy,
            &profile.location,
            program.location_or_university(),
        );

        let scores = FactorScores {
            relevance: relevance.score,
            embedding: embedding.clamp(0.0, 1.0),
            grade,
            prereq,
            location,
        };
        let final_score =
            combiner::combine(&signals.weights, &scores, self.config.low_relevance_cutoff);

        ScoreBreakdown {
            relevance: scores.relevance,
            embedding: scores.embedding,
            grade,
            prereq,
            location,
            grade_assessment,
            missing_prereqs,
            penalties: relevance.penalties,
            bonuses: relevance.bonuses,
            weights: signals.weights,
            final_score,
            match_percent: combiner::match_percent(final_score),
        }
    }

    /// Rank the catalogue for `profile`, returning at most `top_k` programs
    /// (the configured default when `None`).
    #[tracing::instrument(skip_all, fields(top_k = ?top_k))]
    pub async fn search(&self, profile: &StudentProfile, top_k: Option<usize>) -> SearchOutcome {
        let start = Instant::now();
        let top_k = top_k.unwrap_or(self.config.top_k).max(1);

        let signals = self.signals(profile);
        let ctx = RelevanceContext::new(
            &self.taxonomy,
            &self.config,
            &signals.detected,
            &profile.preferences,
        );
        let similarities = self.catalogue_similarities(profile).await;

        let candidates: Vec<Candidate> = self
            .catalogue
            .programs()
            .iter()
            .enumerate()
            .map(|(index, program)| {
                let embedding = similarities
                    .as_ref()
                    .and_then(|s| s.get(index).copied())
                    .unwrap_or(0.0);
                Candidate {
                    index,
                    breakdown: self.score_program(&signals, &ctx, profile, program, embedding),
                }
            })
            .collect();

        let total = candidates.len();
        let ranking = combiner::rank(candidates, &self.config, top_k);

        let note = if ranking.low_confidence {
            Some(format!(
                "No program reached the minimum relevance of {:.2}; showing the closest matches instead.",
                self.config.min_relevance
            ))
        } else if total == 0 {
            Some("The program catalogue is empty.".to_string())
        } else {
            None
        };

        let results: Vec<RankedProgram> = ranking
            .candidates
            .into_iter()
            .filter_map(|c| {
                let program = self.catalogue.get(c.index)?.clone();
                Some(RankedProgram {
                    index: c.index,
                    program,
                    final_score: c.breakdown.final_score,
                    breakdown: c.breakdown,
                })
            })
            .collect();

        debug!(
            candidates = total,
            filtered_out = ranking.filtered_out,
            returned = results.len(),
            low_confidence = ranking.low_confidence,
            fields = ?signals.detected.fields,
            is_stem = signals.detected.is_stem,
            embedding = similarities.is_some(),
            duration = fmt_duration(start.elapsed()),
            "Search completed"
        );
        log_if_slow(start, SLOW_SEARCH, "program search");

        SearchOutcome {
            results,
            low_confidence: ranking.low_confidence,
            note,
            embedding_available: similarities.is_some(),
            detected_fields: signals.detected.fields.iter().cloned().collect(),
            is_stem: signals.detected.is_stem,
        }
    }

    /// Explain one program's score for `profile`.
    ///
    /// Catalogue programs get the same relative embedding score they would
    /// in a search; other programs are compared by plain cosine similarity.
    pub async fn score_one(
        &self,
        program: &Program,
        profile: &StudentProfile,
    ) -> (f64, ScoreBreakdown) {
        let signals = self.signals(profile);
        let ctx = RelevanceContext::new(
            &self.taxonomy,
            &self.config,
            &signals.detected,
            &profile.preferences,
        );

        let position = self
            .catalogue
            .programs()
            .iter()
            .position(|p| p.as_ref() == program);
        let embedding = match position {
            Some(index) => self
                .catalogue_similarities(profile)
                .await
                .and_then(|s| s.get(index).copied())
                .unwrap_or(0.0),
            None => self.standalone_similarity(program, profile).await,
        };

        let breakdown = self.score_program(&signals, &ctx, profile, program, embedding);
        (breakdown.final_score, breakdown)
    }

    /// Score the catalogue entry at `index`.
    pub async fn score_index(
        &self,
        index: usize,
        profile: &StudentProfile,
    ) -> Option<RankedProgram> {
        let program = self.catalogue.get(index)?.clone();
        let (final_score, breakdown) = self.score_one(&program, profile).await;
        Some(RankedProgram {
            index,
            program,
            final_score,
            breakdown,
        })
    }

    async fn standalone_similarity(&self, program: &Program, profile: &StudentProfile) -> f64 {
        let Some(embedding) = program.embedding.as_deref() else {
            return 0.0;
        };
        if !self.embedder.is_enabled() {
            return 0.0;
        }
        let Some(query) = self.embedder.embed_query(&profile.query_text()).await else {
            return 0.0;
        };
        crate::embedding::index::cosine(&query, embedding)
            .unwrap_or(0.0)
            .max(0.0)
    }
}
