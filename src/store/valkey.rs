//! Valkey/Redis-backed record store.
//!
//! Each movie is a hash under `cinecache:movie:{id}`. A refresh writes its
//! field group through one Lua script (which also keeps `refreshed_at`
//! monotonic); a rating update is a single `HSET`. Snapshots are JSON strings
//! under `cinecache:list:{key}`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use tracing::{error, info};

use super::RecordStore;
use crate::{
    error::{CacheError, Result},
    lists::SnapshotKey,
    models::{ListSnapshot, MovieFields, MovieId, MovieRecord},
};

const KEY_PREFIX: &str = "cinecache";

/// ARGV: title, release_year, overview, poster_path, genres, popularity,
/// refreshed_at (epoch millis), tmdb_id.
const UPSERT_REFRESH_SCRIPT: &str = r#"
local ts = ARGV[7]
local current = redis.call('HGET', KEYS[1], 'refreshed_at')
if current and tonumber(current) > tonumber(ts) then
  ts = current
end
redis.call('HSET', KEYS[1],
  'tmdb_id', ARGV[8],
  'title', ARGV[1],
  'release_year', ARGV[2],
  'overview', ARGV[3],
  'poster_path', ARGV[4],
  'genres', ARGV[5],
  'popularity', ARGV[6],
  'refreshed_at', ts)
return redis.call('HGETALL', KEYS[1])
"#;

#[derive(Clone)]
pub struct ValkeyStore {
    conn: ConnectionManager,
    upsert_script: redis::Script,
}

impl ValkeyStore {
    /// Connect to Valkey at `url`.
    pub async fn connect(url: &str) -> std::result::Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Valkey record store");
        Ok(Self {
            conn,
            upsert_script: redis::Script::new(UPSERT_REFRESH_SCRIPT),
        })
    }

    fn movie_key(id: MovieId) -> String {
        format!("{}:movie:{}", KEY_PREFIX, id)
    }

    fn snapshot_key(key: &SnapshotKey) -> String {
        format!("{}:list:{}", KEY_PREFIX, key)
    }
}

fn store_error(op: &str, e: redis::RedisError) -> CacheError {
    error!("Valkey {} failed: {}", op, e);
    CacheError::Store(format!("{op}: {e}"))
}

/// Rebuild a record from its hash fields. Missing fields take the
/// placeholder defaults, which is what a rating-only record looks like.
fn record_from_hash(id: MovieId, hash: HashMap<String, String>) -> Result<MovieRecord> {
    let mut record = MovieRecord::placeholder(id);
    let corrupt = |field: &str| CacheError::Store(format!("corrupt field '{field}' for movie {id}"));

    if let Some(title) = hash.get("title") {
        record.title = title.clone();
    }
    if let Some(year) = hash.get("release_year").filter(|y| !y.is_empty()) {
        record.release_year = Some(year.parse().map_err(|_| corrupt("release_year"))?);
    }
    if let Some(overview) = hash.get("overview") {
        record.overview = overview.clone();
    }
    if let Some(poster_path) = hash.get("poster_path") {
        record.poster_path = poster_path.clone();
    }
    if let Some(genres) = hash.get("genres") {
        record.genres = serde_json::from_str(genres).map_err(|_| corrupt("genres"))?;
    }
    if let Some(popularity) = hash.get("popularity") {
        record.popularity = popularity.parse().map_err(|_| corrupt("popularity"))?;
    }
    if let Some(rating) = hash.get("average_rating") {
        record.average_rating = rating.parse().map_err(|_| corrupt("average_rating"))?;
    }
    if let Some(millis) = hash.get("refreshed_at") {
        let millis: i64 = millis.parse().map_err(|_| corrupt("refreshed_at"))?;
        record.refreshed_at =
            Some(DateTime::from_timestamp_millis(millis).ok_or_else(|| corrupt("refreshed_at"))?);
    }
    Ok(record)
}

#[async_trait]
impl RecordStore for ValkeyStore {
    async fn get(&self, id: MovieId) -> Result<Option<MovieRecord>> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(Self::movie_key(id))
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("HGETALL", e))?;

        if hash.is_empty() {
            return Ok(None);
        }
        record_from_hash(id, hash).map(Some)
    }

    async fn upsert_refresh(
        &self,
        id: MovieId,
        fields: MovieFields,
        refreshed_at: DateTime<Utc>,
    ) -> Result<MovieRecord> {
        let genres = serde_json::to_string(&fields.genres)
            .map_err(|e| CacheError::Store(format!("encode genres: {e}")))?;
        let release_year = fields
            .release_year
            .map(|y| y.to_string())
            .unwrap_or_default();

        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = self
            .upsert_script
            .key(Self::movie_key(id))
            .arg(fields.title)
            .arg(release_year)
            .arg(fields.overview)
            .arg(fields.poster_path)
            .arg(genres)
            .arg(fields.popularity)
            .arg(refreshed_at.timestamp_millis())
            .arg(id)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error("refresh script", e))?;

        record_from_hash(id, hash)
    }

    async fn update_rating(&self, id: MovieId, average_rating: f64) -> Result<MovieRecord> {
        let key = Self::movie_key(id);
        let mut conn = self.conn.clone();
        let (hash,): (HashMap<String, String>,) = redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&key)
            .arg("tmdb_id")
            .arg(id)
            .arg("average_rating")
            .arg(average_rating)
            .ignore()
            .cmd("HGETALL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("HSET average_rating", e))?;

        record_from_hash(id, hash)
    }

    async fn delete(&self, id: MovieId) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(Self::movie_key(id))
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("DEL", e))?;
        Ok(removed > 0)
    }

    async fn get_snapshot(&self, key: &SnapshotKey) -> Result<Option<ListSnapshot>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = redis::cmd("GET")
            .arg(Self::snapshot_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("GET snapshot", e))?;

        let Some(json) = json else {
            return Ok(None);
        };
        let stored: ListSnapshot = serde_json::from_str(&json)
            .map_err(|e| CacheError::Store(format!("corrupt snapshot {key}: {e}")))?;
        // Re-apply the member cap to whatever was persisted.
        Ok(Some(ListSnapshot::new(
            stored.key.clone(),
            stored.members().to_vec(),
            stored.refreshed_at,
        )))
    }

    async fn put_snapshot(&self, snapshot: ListSnapshot) -> Result<()> {
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| CacheError::Store(format!("encode snapshot: {e}")))?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::snapshot_key(&snapshot.key))
            .arg(json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_error("SET snapshot", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_only_hash_reads_as_placeholder() {
        let hash = HashMap::from([
            ("tmdb_id".to_string(), "7".to_string()),
            ("average_rating".to_string(), "3.5".to_string()),
        ]);
        let record = record_from_hash(7, hash).unwrap();
        assert_eq!(record.average_rating, 3.5);
        assert!(record.refreshed_at.is_none());
        assert!(record.genres.is_empty());
    }

    #[test]
    fn full_hash_round_trips_fields() {
        let hash = HashMap::from([
            ("title".to_string(), "Heat".to_string()),
            ("release_year".to_string(), "1995".to_string()),
            ("genres".to_string(), r#"["Crime","Thriller"]"#.to_string()),
            ("popularity".to_string(), "31.2".to_string()),
            ("refreshed_at".to_string(), "1700000000000".to_string()),
        ]);
        let record = record_from_hash(949, hash).unwrap();
        assert_eq!(record.release_year, Some(1995));
        assert_eq!(record.genres, vec!["Crime", "Thriller"]);
        assert_eq!(
            record.refreshed_at.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn corrupt_field_is_a_store_error() {
        let hash = HashMap::from([("popularity".to_string(), "lots".to_string())]);
        assert!(matches!(
            record_from_hash(1, hash),
            Err(CacheError::Store(_))
        ));
    }
}
