use crate::{
    error::Result,
    metrics,
    models::{MovieId, MovieRecord},
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use std::time::Instant;
use tracing::info;

/// Serve one movie, refreshing it from TMDb when missing or stale
pub async fn get_movie(
    Path(id): Path<MovieId>,
    State(state): State<AppState>,
) -> Result<Json<MovieRecord>> {
    let start = Instant::now();
    info!("Serving movie: {}", id);

    let outcome = state.cache.get_movie(id).await;

    let status = match &outcome {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    };
    metrics::record_request("movie", status);
    metrics::record_duration("movie", start);

    outcome.map(Json)
}
