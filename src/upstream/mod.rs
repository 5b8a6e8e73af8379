//! Access to the upstream movie database.

pub mod payload;
pub mod tmdb;

use async_trait::async_trait;

use crate::{error::Result, lists::SnapshotKey, models::MovieId};
use payload::RawPayload;

pub use tmdb::TmdbClient;

/// Request/response wrapper around the upstream movie API.
///
/// Implementations classify every transport or envelope failure as
/// [`CacheError::UpstreamUnavailable`](crate::error::CacheError) and never
/// retry: a degraded upstream should not see amplified load from us.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Fetch the detail payload for one movie.
    async fn fetch_details(&self, id: MovieId) -> Result<RawPayload>;

    /// Fetch the entries of a trending or discover list, in upstream order.
    async fn fetch_list(&self, key: &SnapshotKey) -> Result<Vec<RawPayload>>;
}
