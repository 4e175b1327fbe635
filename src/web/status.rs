//! Health handler.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use tracing::trace;

use crate::embedding::cache::CacheStats;
use crate::state::AppState;
use crate::utils::fmt_duration;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    programs: usize,
    embeddings_enabled: bool,
    roadmaps_enabled: bool,
    embedding_cache: CacheStats,
    uptime: String,
}

/// `GET /api/health`
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    trace!("health check requested");
    let recommender = &state.recommender;
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        programs: recommender.catalogue().len(),
        embeddings_enabled: recommender.embedder().is_enabled(),
        roadmaps_enabled: state.generator.is_some(),
        embedding_cache: recommender.embedder().cache().stats(),
        uptime: fmt_duration(state.started_at.elapsed()),
    })
}
