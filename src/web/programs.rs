//! Catalogue listing and single-program score explanation.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::data::profile::ProfileInput;
use crate::data::programs::Program;
use crate::matching::RankedProgram;
use crate::matching::text::fold;
use crate::state::AppState;
use crate::web::error::ApiError;

fn default_list_limit() -> usize {
    25
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

#[derive(Serialize)]
pub struct ProgramEntry {
    pub index: usize,
    #[serde(flatten)]
    pub program: Arc<Program>,
}

#[derive(Serialize)]
pub struct ProgramList {
    pub programs: Vec<ProgramEntry>,
    /// Matches before `limit` was applied.
    pub total: usize,
}

/// `GET /api/programs?q={text}&limit=25`
///
/// Case- and accent-insensitive match against program and university names.
pub(super) async fn list_programs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<ProgramList> {
    let limit = params.limit.clamp(1, 100);
    let needle = fold(&params.q);

    let matches: Vec<ProgramEntry> = state
        .recommender
        .catalogue()
        .programs()
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            needle.is_empty()
                || fold(&p.name).contains(&needle)
                || fold(&p.university).contains(&needle)
        })
        .map(|(index, program)| ProgramEntry {
            index,
            program: program.clone(),
        })
        .collect();

    let total = matches.len();
    Json(ProgramList {
        programs: matches.into_iter().take(limit).collect(),
        total,
    })
}

/// `POST /api/programs/{index}/score`
pub(super) async fn score_program(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    body: Result<Json<ProfileInput>, JsonRejection>,
) -> Result<Json<RankedProgram>, ApiError> {
    let Json(input) = body?;
    let profile = input.validate()?;
    state
        .recommender
        .score_index(index, &profile)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::program_not_found(index))
}
