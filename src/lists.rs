//! Trending and discover list snapshots.
//!
//! One snapshot is cached per list identity (kind plus normalized
//! parameters). Snapshots hold member ids only; every read goes back to the
//! record store so ratings and per-movie refreshes show through.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::{
    engine::MovieCache,
    error::{CacheError, Result},
    freshness::is_fresh,
    metrics,
    models::{ListSnapshot, MovieRecord},
    normalize,
};

/// Which upstream list a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Trending,
    Discover,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Trending => "trending",
            ListKind::Discover => "discover",
        }
    }
}

/// Trending time window accepted by TMDb.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

/// Caller-supplied list parameters, before normalization.
///
/// Parameters irrelevant to the requested kind are ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListParams {
    /// Trending window, `day` when absent.
    pub window: Option<String>,
    /// Discover genre filter, all genres when empty.
    pub genre_ids: Vec<u32>,
}

impl ListParams {
    pub fn trending(window: impl Into<String>) -> Self {
        Self {
            window: Some(window.into()),
            ..Default::default()
        }
    }

    pub fn discover(genre_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            genre_ids: genre_ids.into_iter().collect(),
            ..Default::default()
        }
    }
}

/// Normalized identity of a list snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SnapshotKey {
    Trending { window: TimeWindow },
    /// Genre ids are sorted and de-duplicated.
    Discover { genre_ids: Vec<u32> },
}

impl SnapshotKey {
    /// Normalize `params` for `kind`.
    ///
    /// # Errors
    /// [`CacheError::InvalidListParams`] for an unknown trending window.
    pub fn new(kind: ListKind, params: &ListParams) -> Result<Self> {
        match kind {
            ListKind::Trending => {
                let window = match params.window.as_deref().map(str::trim) {
                    None | Some("") => TimeWindow::Day,
                    Some(w) if w.eq_ignore_ascii_case("day") => TimeWindow::Day,
                    Some(w) if w.eq_ignore_ascii_case("week") => TimeWindow::Week,
                    Some(other) => {
                        return Err(CacheError::InvalidListParams(format!(
                            "unknown trending window '{other}', expected 'day' or 'week'"
                        )));
                    }
                };
                Ok(SnapshotKey::Trending { window })
            }
            ListKind::Discover => {
                let mut genre_ids = params.genre_ids.clone();
                genre_ids.sort_unstable();
                genre_ids.dedup();
                Ok(SnapshotKey::Discover { genre_ids })
            }
        }
    }

    pub fn kind(&self) -> ListKind {
        match self {
            SnapshotKey::Trending { .. } => ListKind::Trending,
            SnapshotKey::Discover { .. } => ListKind::Discover,
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKey::Trending { window } => write!(f, "trending:{}", window.as_str()),
            SnapshotKey::Discover { genre_ids } if genre_ids.is_empty() => {
                write!(f, "discover:all")
            }
            SnapshotKey::Discover { genre_ids } => {
                let ids: Vec<String> = genre_ids.iter().map(u32::to_string).collect();
                write!(f, "discover:{}", ids.join(","))
            }
        }
    }
}

/// Parse a comma-separated genre filter such as `"28,12"`.
///
/// Blank segments are ignored so `""` and `"28,"` are accepted.
pub fn parse_genre_ids(csv: &str) -> Result<Vec<u32>> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| CacheError::InvalidListParams(format!("invalid genre id '{s}'")))
        })
        .collect()
}

impl MovieCache {
    /// Return the members of a trending or discover list.
    ///
    /// Serves the cached snapshot while it is fresh. Otherwise refetches the
    /// list once (concurrent callers share the refetch), writes every valid
    /// entry through to the record store and replaces the snapshot. An empty
    /// list is a valid result.
    pub async fn get_list(&self, kind: ListKind, params: &ListParams) -> Result<Vec<MovieRecord>> {
        let key = SnapshotKey::new(kind, params)?;

        match self.store().get_snapshot(&key).await? {
            Some(snapshot) if is_fresh(Some(snapshot.refreshed_at), Utc::now(), self.ttl()) => {
                debug!("List cache HIT for {}", key);
                metrics::record_cache_lookup(kind.as_str(), "hit");
                return self.store().get_many(snapshot.members()).await;
            }
            Some(_) => {
                debug!("List cache STALE for {}", key);
                metrics::record_cache_lookup(kind.as_str(), "stale");
            }
            None => {
                debug!("List cache MISS for {}", key);
                metrics::record_cache_lookup(kind.as_str(), "miss");
            }
        }

        let cache = self.clone();
        let flight_key = key.clone();
        self.list_flights()
            .run(flight_key, async move { cache.refresh_list(key).await })
            .await
    }

    async fn refresh_list(&self, key: SnapshotKey) -> Result<Vec<MovieRecord>> {
        // A flight that settled just before this one was started may already
        // have written a fresh snapshot.
        if let Some(snapshot) = self.store().get_snapshot(&key).await?
            && is_fresh(Some(snapshot.refreshed_at), Utc::now(), self.ttl())
        {
            return self.store().get_many(snapshot.members()).await;
        }

        let kind = key.kind().as_str();
        metrics::record_upstream_fetch(kind);
        let payloads = self.upstream().fetch_list(&key).await.inspect_err(|e| {
            warn!("List refresh for {} failed: {}", key, e);
            metrics::record_upstream_error(kind, e.kind());
        })?;

        let refreshed_at = Utc::now();
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for (position, payload) in payloads.into_iter().take(self.list_size_cap()).enumerate() {
            let (id, fields) = match normalize::list_entry(payload) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        "Skipping malformed entry {} in {}: {}",
                        position, key, e
                    );
                    metrics::record_skipped_entry(kind);
                    continue;
                }
            };
            if !seen.insert(id) {
                warn!("Skipping duplicate movie {} in {}", id, key);
                continue;
            }
            records.push(self.store().upsert_refresh(id, fields, refreshed_at).await?);
        }

        let members = records.iter().map(|r| r.tmdb_id).collect();
        self.store()
            .put_snapshot(ListSnapshot::new(key.clone(), members, refreshed_at))
            .await?;

        info!("Refreshed {} with {} movies", key, records.len());
        Ok(records)
    }
}
