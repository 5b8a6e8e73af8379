use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use super::RecordStore;
use crate::{
    error::Result,
    lists::SnapshotKey,
    models::{ListSnapshot, MovieFields, MovieId, MovieRecord},
};

/// In-process record store.
///
/// Writes go through the DashMap entry API, which holds the shard lock for
/// the whole read-modify-write, so updates to one movie never interleave.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    movies: Arc<DashMap<MovieId, MovieRecord>>,
    snapshots: Arc<DashMap<SnapshotKey, ListSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored movie records.
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: MovieId) -> Result<Option<MovieRecord>> {
        Ok(self.movies.get(&id).map(|r| r.clone()))
    }

    async fn upsert_refresh(
        &self,
        id: MovieId,
        fields: MovieFields,
        refreshed_at: DateTime<Utc>,
    ) -> Result<MovieRecord> {
        let mut record = self
            .movies
            .entry(id)
            .or_insert_with(|| MovieRecord::placeholder(id));
        record.apply_refresh(fields, refreshed_at);
        Ok(record.clone())
    }

    async fn update_rating(&self, id: MovieId, average_rating: f64) -> Result<MovieRecord> {
        let mut record = self
            .movies
            .entry(id)
            .or_insert_with(|| MovieRecord::placeholder(id));
        record.average_rating = average_rating;
        Ok(record.clone())
    }

    async fn delete(&self, id: MovieId) -> Result<bool> {
        Ok(self.movies.remove(&id).is_some())
    }

    async fn get_snapshot(&self, key: &SnapshotKey) -> Result<Option<ListSnapshot>> {
        Ok(self.snapshots.get(key).map(|s| s.clone()))
    }

    async fn put_snapshot(&self, snapshot: ListSnapshot) -> Result<()> {
        self.snapshots.insert(snapshot.key.clone(), snapshot);
        Ok(())
    }
}
