//! Keyed storage for movie records and list snapshots.

pub mod memory;
#[cfg(feature = "valkey")]
pub mod valkey;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    lists::SnapshotKey,
    models::{ListSnapshot, MovieFields, MovieId, MovieRecord},
};

pub use memory::MemoryStore;
#[cfg(feature = "valkey")]
pub use valkey::ValkeyStore;

/// Shared record store.
///
/// Every mutation is an atomic partial write of one field group: refreshes
/// touch the descriptive fields and popularity, rating updates touch only
/// `average_rating`. Neither may clobber the other.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: MovieId) -> Result<Option<MovieRecord>>;

    /// Fetch several records in the order given, skipping ids that are not
    /// stored.
    async fn get_many(&self, ids: &[MovieId]) -> Result<Vec<MovieRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(*id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Write the refresh-owned fields, creating the record if needed, and
    /// return the merged record.
    async fn upsert_refresh(
        &self,
        id: MovieId,
        fields: MovieFields,
        refreshed_at: DateTime<Utc>,
    ) -> Result<MovieRecord>;

    /// Write `average_rating`, creating a never-refreshed placeholder if the
    /// movie is not stored yet, and return the merged record.
    async fn update_rating(&self, id: MovieId, average_rating: f64) -> Result<MovieRecord>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, id: MovieId) -> Result<bool>;

    async fn get_snapshot(&self, key: &SnapshotKey) -> Result<Option<ListSnapshot>>;

    /// Replace the snapshot stored under `snapshot.key`.
    async fn put_snapshot(&self, snapshot: ListSnapshot) -> Result<()>;
}
