use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::{UpstreamClient, payload::RawPayload};
use crate::{
    error::{CacheError, Result},
    lists::SnapshotKey,
    models::MovieId,
};

/// Default TMDb v3 API root.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default response language.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the TMDb v3 API.
#[derive(Clone)]
pub struct TmdbClient {
    http: Client,
    base_url: Url,
    api_key: String,
    language: String,
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url.as_str())
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl TmdbClient {
    /// Create a client on top of a shared `reqwest::Client`.
    ///
    /// The request timeout is whatever `http` was built with.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(
        http: Client,
        base_url: &str,
        api_key: impl Into<String>,
        language: impl Into<String>,
    ) -> std::result::Result<Self, String> {
        let base_url =
            Url::parse(base_url).map_err(|e| format!("Invalid TMDb base URL '{base_url}': {e}"))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(format!("TMDb base URL must be http(s): {base_url}"));
        }

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            language: language.into(),
        })
    }

    /// Build an endpoint URL with the credential and language parameters.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("language", &self.language);
        url
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Only the path is logged; the query string carries the API key.
    async fn get_json(&self, url: Url, target: &str) -> Result<Value> {
        info!("Fetching {} from TMDb ({})", target, url.path());

        let response = self.http.get(url).send().await.map_err(|e| {
            let cause = if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.without_url().to_string()
            };
            warn!("TMDb request for {} failed: {}", target, cause);
            CacheError::upstream(target, cause)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("TMDb returned {} for {}", status, target);
            return Err(CacheError::upstream(target, format!("HTTP {status}")));
        }

        response.json::<Value>().await.map_err(|e| {
            let e = e.without_url();
            warn!("TMDb returned an unreadable body for {}: {}", target, e);
            CacheError::upstream(target, format!("malformed JSON body: {e}"))
        })
    }
}

#[async_trait]
impl UpstreamClient for TmdbClient {
    async fn fetch_details(&self, id: MovieId) -> Result<RawPayload> {
        let target = format!("movie {id}");
        let payload = self
            .get_json(self.endpoint(&["movie", &id.to_string()]), &target)
            .await?;

        if !payload.is_object() {
            return Err(CacheError::upstream(target, "response body is not a JSON object"));
        }
        Ok(payload)
    }

    async fn fetch_list(&self, key: &SnapshotKey) -> Result<Vec<RawPayload>> {
        let url = match key {
            SnapshotKey::Trending { window } => {
                self.endpoint(&["trending", "movie", window.as_str()])
            }
            SnapshotKey::Discover { genre_ids } => {
                let mut url = self.endpoint(&["discover", "movie"]);
                if !genre_ids.is_empty() {
                    let genres: Vec<String> = genre_ids.iter().map(u32::to_string).collect();
                    url.query_pairs_mut()
                        .append_pair("with_genres", &genres.join(","));
                }
                url
            }
        };

        let target = key.to_string();
        match self.get_json(url, &target).await? {
            Value::Object(mut envelope) => match envelope.remove("results") {
                Some(Value::Array(results)) => Ok(results),
                _ => Err(CacheError::upstream(target, "response has no 'results' array")),
            },
            _ => Err(CacheError::upstream(target, "response body is not a JSON object")),
        }
    }
}
