use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lists::SnapshotKey;

/// TMDb movie identifier.
pub type MovieId = u64;

/// Hard upper bound on the number of members a list snapshot can hold.
pub const MAX_LIST_SIZE: usize = 20;

/// Cached movie metadata, keyed by TMDb id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub tmdb_id: MovieId,
    pub title: String,
    pub release_year: Option<i32>,
    pub overview: String,
    pub poster_path: String,
    pub genres: Vec<String>,
    /// Written only by the rating collaborator.
    pub average_rating: f64,
    pub popularity: f64,
    /// `None` until the first successful upstream refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl MovieRecord {
    /// Record that exists only to carry a rating; it is stale until refreshed.
    pub fn placeholder(tmdb_id: MovieId) -> Self {
        Self {
            tmdb_id,
            title: String::new(),
            release_year: None,
            overview: String::new(),
            poster_path: String::new(),
            genres: Vec::new(),
            average_rating: 0.0,
            popularity: 0.0,
            refreshed_at: None,
        }
    }

    /// Overwrite the refresh-owned field group, leaving the rating alone.
    ///
    /// `refreshed_at` never moves backwards.
    pub fn apply_refresh(&mut self, fields: MovieFields, refreshed_at: DateTime<Utc>) {
        self.title = fields.title;
        self.release_year = fields.release_year;
        self.overview = fields.overview;
        self.poster_path = fields.poster_path;
        self.genres = fields.genres;
        self.popularity = fields.popularity;
        self.refreshed_at = Some(match self.refreshed_at {
            Some(previous) if previous > refreshed_at => previous,
            _ => refreshed_at,
        });
    }
}

/// Field group owned by upstream refreshes.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieFields {
    pub title: String,
    pub release_year: Option<i32>,
    pub overview: String,
    pub poster_path: String,
    pub genres: Vec<String>,
    pub popularity: f64,
}

/// Cached membership of a trending or discover list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub key: SnapshotKey,
    members: Vec<MovieId>,
    pub refreshed_at: DateTime<Utc>,
}

impl ListSnapshot {
    /// Build a snapshot, keeping at most [`MAX_LIST_SIZE`] members.
    pub fn new(key: SnapshotKey, mut members: Vec<MovieId>, refreshed_at: DateTime<Utc>) -> Self {
        members.truncate(MAX_LIST_SIZE);
        Self {
            key,
            members,
            refreshed_at,
        }
    }

    pub fn members(&self) -> &[MovieId] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::{ListKind, ListParams};
    use chrono::Duration;

    fn fields(title: &str) -> MovieFields {
        MovieFields {
            title: title.to_string(),
            release_year: Some(2010),
            overview: "overview".to_string(),
            poster_path: "/poster.jpg".to_string(),
            genres: vec!["Drama".to_string()],
            popularity: 12.5,
        }
    }

    #[test]
    fn refresh_preserves_rating() {
        let mut record = MovieRecord::placeholder(27205);
        record.average_rating = 4.5;

        record.apply_refresh(fields("Inception"), Utc::now());

        assert_eq!(record.title, "Inception");
        assert_eq!(record.average_rating, 4.5);
        assert!(record.refreshed_at.is_some());
    }

    #[test]
    fn refresh_timestamp_never_moves_backwards() {
        let mut record = MovieRecord::placeholder(1);
        let newer = Utc::now();
        let older = newer - Duration::hours(1);

        record.apply_refresh(fields("first"), newer);
        record.apply_refresh(fields("second"), older);

        assert_eq!(record.refreshed_at, Some(newer));
        assert_eq!(record.title, "second");
    }

    #[test]
    fn snapshot_caps_members() {
        let key = SnapshotKey::new(ListKind::Trending, &ListParams::default()).unwrap();
        let snapshot = ListSnapshot::new(key, (1..=30).collect(), Utc::now());

        assert_eq!(snapshot.members().len(), MAX_LIST_SIZE);
        assert_eq!(snapshot.members()[0], 1);
        assert_eq!(snapshot.members()[19], 20);
    }

    #[test]
    fn record_serializes_to_json() {
        let record = MovieRecord::placeholder(603);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tmdb_id"], 603);
        assert!(json["release_year"].is_null());
        assert!(json["refreshed_at"].is_null());
    }
}
