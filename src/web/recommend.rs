//! Ranking and roadmap handlers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::profile::ProfileInput;
use crate::matching::SearchOutcome;
use crate::roadmap::generate_roadmap;
use crate::state::AppState;
use crate::web::error::ApiError;

/// Largest `top_k` a client may request.
const MAX_TOP_K: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub profile: ProfileInput,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Serialize)]
pub struct RoadmapResponse {
    #[serde(flatten)]
    pub ranking: SearchOutcome,
    /// `null` when generation is disabled or failed.
    pub roadmap: Option<String>,
}

fn clamp_top_k(top_k: Option<usize>) -> Option<usize> {
    top_k.map(|k| k.clamp(1, MAX_TOP_K))
}

/// `POST /api/recommend`
pub(super) async fn recommend(
    State(state): State<AppState>,
    body: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let Json(request) = body?;
    let profile = request.profile.validate()?;
    let outcome = state
        .recommender
        .search(&profile, clamp_top_k(request.top_k))
        .await;
    info!(
        results = outcome.results.len(),
        low_confidence = outcome.low_confidence,
        "Recommendation served"
    );
    Ok(Json(outcome))
}

/// `POST /api/roadmap`
pub(super) async fn roadmap(
    State(state): State<AppState>,
    body: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RoadmapResponse>, ApiError> {
    let Json(request) = body?;
    let profile = request.profile.validate()?;
    let ranking = state
        .recommender
        .search(&profile, clamp_top_k(request.top_k))
        .await;
    let roadmap =
        generate_roadmap(state.generator.as_deref(), &profile, &ranking.results).await;
    Ok(Json(RoadmapResponse { ranking, roadmap }))
}
