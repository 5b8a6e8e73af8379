use serde::Deserialize;
use std::num::NonZeroU64;

/// Undecoded JSON object as returned by TMDb.
///
/// List entries stay undecoded until normalization so one malformed entry
/// cannot fail the whole list.
pub type RawPayload = serde_json::Value;

/// Subset of TMDb's movie object the cache keeps.
///
/// Detail responses carry `genres`, list responses carry `genre_ids`.
#[derive(Debug, Deserialize)]
pub struct RawMovie {
    pub id: NonZeroU64,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub genres: Option<Vec<RawGenre>>,
    pub genre_ids: Option<Vec<u32>>,
    pub popularity: Option<f64>,
}

/// Genre object from a detail response; only the name is kept.
#[derive(Debug, Deserialize)]
pub struct RawGenre {
    pub name: String,
}
