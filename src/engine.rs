//! Cache-aside orchestration for single movies.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    coalesce::Coalescer,
    error::{CacheError, Result},
    freshness::{self, is_fresh},
    lists::SnapshotKey,
    metrics,
    models::{MAX_LIST_SIZE, MovieId, MovieRecord},
    normalize,
    store::RecordStore,
    upstream::UpstreamClient,
};

/// Tunables for [`MovieCache`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheSettings {
    /// How long records and list snapshots stay fresh.
    pub ttl: Duration,
    /// Maximum members kept per list snapshot, at most [`MAX_LIST_SIZE`].
    pub list_size_cap: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: freshness::DEFAULT_TTL,
            list_size_cap: MAX_LIST_SIZE,
        }
    }
}

/// Cache-aside engine in front of the upstream movie API.
///
/// Cheap to clone; clones share the store, the upstream client and the
/// in-flight refresh maps.
#[derive(Clone)]
pub struct MovieCache {
    upstream: Arc<dyn UpstreamClient>,
    store: Arc<dyn RecordStore>,
    settings: CacheSettings,
    movie_flights: Coalescer<MovieId, MovieRecord>,
    list_flights: Coalescer<SnapshotKey, Vec<MovieRecord>>,
}

impl MovieCache {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        store: Arc<dyn RecordStore>,
        settings: CacheSettings,
    ) -> Self {
        let settings = CacheSettings {
            list_size_cap: settings.list_size_cap.clamp(1, MAX_LIST_SIZE),
            ..settings
        };
        Self {
            upstream,
            store,
            settings,
            movie_flights: Coalescer::new("movie"),
            list_flights: Coalescer::new("list"),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Refreshes currently waiting on the upstream.
    pub fn in_flight(&self) -> usize {
        self.movie_flights.in_flight() + self.list_flights.in_flight()
    }

    pub(crate) fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub(crate) fn upstream(&self) -> &dyn UpstreamClient {
        self.upstream.as_ref()
    }

    pub(crate) fn ttl(&self) -> Duration {
        self.settings.ttl
    }

    pub(crate) fn list_size_cap(&self) -> usize {
        self.settings.list_size_cap
    }

    pub(crate) fn list_flights(&self) -> &Coalescer<SnapshotKey, Vec<MovieRecord>> {
        &self.list_flights
    }

    /// Return the movie, refreshing it from upstream when missing or stale.
    ///
    /// Concurrent calls for the same id share a single upstream fetch. A
    /// failed refresh is reported even if a stale copy is stored; stale data
    /// is never served.
    ///
    /// # Errors
    /// - [`CacheError::UpstreamUnavailable`] if TMDb could not be reached.
    /// - [`CacheError::InvalidUpstreamData`] if the payload is unusable, in
    ///   which case the store is left untouched.
    pub async fn get_movie(&self, id: MovieId) -> Result<MovieRecord> {
        match self.store.get(id).await? {
            Some(record) if is_fresh(record.refreshed_at, Utc::now(), self.settings.ttl) => {
                debug!("Movie cache HIT for {}", id);
                metrics::record_cache_lookup("movie", "hit");
                return Ok(record);
            }
            Some(_) => {
                debug!("Movie cache STALE for {}", id);
                metrics::record_cache_lookup("movie", "stale");
            }
            None => {
                debug!("Movie cache MISS for {}", id);
                metrics::record_cache_lookup("movie", "miss");
            }
        }

        let cache = self.clone();
        self.movie_flights
            .run(id, async move { cache.refresh_movie(id).await })
            .await
    }

    async fn refresh_movie(&self, id: MovieId) -> Result<MovieRecord> {
        // Another flight may have settled between our lookup and this one
        // being registered.
        if let Some(record) = self.store.get(id).await?
            && is_fresh(record.refreshed_at, Utc::now(), self.settings.ttl)
        {
            return Ok(record);
        }

        metrics::record_upstream_fetch("movie");
        let payload = self.upstream.fetch_details(id).await.inspect_err(|e| {
            metrics::record_upstream_error("movie", e.kind());
        })?;

        let fields = normalize::movie_details(id, payload).inspect_err(|e| {
            warn!("Rejecting upstream data: {}", e);
            metrics::record_upstream_error("movie", e.kind());
        })?;

        let record = self.store.upsert_refresh(id, fields, Utc::now()).await?;
        info!("Refreshed movie {} ({})", id, record.title);
        Ok(record)
    }

    /// Return the movie only if it is already stored, fresh or not. Never
    /// calls the upstream.
    ///
    /// # Errors
    /// [`CacheError::NotFoundLocally`] on a store miss.
    pub async fn cached_movie(&self, id: MovieId) -> Result<MovieRecord> {
        self.store
            .get(id)
            .await?
            .ok_or(CacheError::NotFoundLocally(id))
    }

    /// Store a new average rating computed by the rating service.
    ///
    /// Only `average_rating` is written. If the movie is not cached yet a
    /// never-refreshed placeholder is created to carry the rating; the next
    /// [`get_movie`](Self::get_movie) fills in the rest.
    ///
    /// # Errors
    /// [`CacheError::InvalidRating`] for NaN or infinite values.
    pub async fn apply_rating_update(&self, id: MovieId, new_average: f64) -> Result<MovieRecord> {
        if !new_average.is_finite() {
            return Err(CacheError::InvalidRating {
                id,
                value: new_average,
            });
        }

        let record = self.store.update_rating(id, new_average).await?;
        info!("Updated average rating of movie {} to {}", id, new_average);
        Ok(record)
    }

    /// Administrative removal of a cached movie. Returns whether it existed.
    ///
    /// List snapshots that reference the movie skip it on their next read.
    pub async fn delete_movie(&self, id: MovieId) -> Result<bool> {
        let existed = self.store.delete(id).await?;
        if existed {
            info!("Deleted movie {} from the cache", id);
        }
        Ok(existed)
    }
}
