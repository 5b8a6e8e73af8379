use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::MovieId;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by the cache engine.
///
/// Variants are `Clone` so a single coalesced refresh can hand the same
/// outcome to every waiting caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    /// Transport failure, non-success status or malformed envelope from TMDb.
    #[error("Upstream unavailable for {target}: {cause}")]
    UpstreamUnavailable { target: String, cause: String },

    /// Payload arrived but lacks data required to build a usable record.
    #[error("Invalid upstream data for movie {id}: {reason}")]
    InvalidUpstreamData { id: MovieId, reason: String },

    #[error("Movie {0} not found in local store")]
    NotFoundLocally(MovieId),

    #[error("Invalid list parameters: {0}")]
    InvalidListParams(String),

    #[error("Invalid rating {value} for movie {id}")]
    InvalidRating { id: MovieId, value: f64 },

    #[error("Record store error: {0}")]
    Store(String),
}

impl CacheError {
    /// Stable identifier for the error class, used in logs, metrics and
    /// response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::UpstreamUnavailable { .. } => "upstream_unavailable",
            CacheError::InvalidUpstreamData { .. } => "invalid_upstream_data",
            CacheError::NotFoundLocally(_) => "not_found_locally",
            CacheError::InvalidListParams(_) => "invalid_list_params",
            CacheError::InvalidRating { .. } => "invalid_rating",
            CacheError::Store(_) => "store",
        }
    }

    pub(crate) fn upstream(target: impl Into<String>, cause: impl ToString) -> Self {
        CacheError::UpstreamUnavailable {
            target: target.into(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn invalid(id: MovieId, reason: impl Into<String>) -> Self {
        CacheError::InvalidUpstreamData {
            id,
            reason: reason.into(),
        }
    }

    /// HTTP status for this error.
    ///
    /// Engine failures all read as "temporarily unavailable" to HTTP clients;
    /// the response body keeps the precise kind.
    pub fn status(&self) -> StatusCode {
        match self {
            CacheError::InvalidListParams(_) | CacheError::InvalidRating { .. } => {
                StatusCode::BAD_REQUEST
            }
            CacheError::UpstreamUnavailable { .. }
            | CacheError::InvalidUpstreamData { .. }
            | CacheError::NotFoundLocally(_)
            | CacheError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
