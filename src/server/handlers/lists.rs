use crate::{
    error::Result,
    lists::{ListKind, ListParams, parse_genre_ids},
    metrics,
    models::MovieRecord,
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    /// Comma-separated TMDb genre ids, e.g. `28,12`
    pub genres: Option<String>,
}

/// Serve the trending list for a time window (`day` or `week`)
pub async fn trending(
    Path(window): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MovieRecord>>> {
    info!("Serving trending list: {}", window);
    serve_list(&state, "trending", ListKind::Trending, Ok(ListParams::trending(window))).await
}

/// Serve the discover list, optionally filtered by genre
pub async fn discover(
    Query(query): Query<DiscoverQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MovieRecord>>> {
    let genres = query.genres.unwrap_or_default();
    info!("Serving discover list: genres=[{}]", genres);
    let params = parse_genre_ids(&genres).map(ListParams::discover);
    serve_list(&state, "discover", ListKind::Discover, params).await
}

async fn serve_list(
    state: &AppState,
    endpoint: &'static str,
    kind: ListKind,
    params: Result<ListParams>,
) -> Result<Json<Vec<MovieRecord>>> {
    let start = Instant::now();

    let outcome = match params {
        Ok(params) => state.cache.get_list(kind, &params).await,
        Err(e) => Err(e),
    };

    let status = match &outcome {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    };
    metrics::record_request(endpoint, status);
    metrics::record_duration(endpoint, start);

    outcome.map(Json)
}
