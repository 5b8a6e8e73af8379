//! Turn raw TMDb payloads into the refresh-owned field group.
//!
//! Missing and explicit `null` fields are treated the same way: they fall
//! back to a default instead of failing the payload.

use crate::{
    error::{CacheError, Result},
    models::{MovieFields, MovieId},
    upstream::payload::{RawMovie, RawPayload},
};

/// TMDb's fixed movie genre table, used to name the `genre_ids` carried by
/// list payloads.
const MOVIE_GENRES: &[(u32, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

/// Name for a TMDb movie genre id, if it is a known one.
pub fn genre_name(id: u32) -> Option<&'static str> {
    MOVIE_GENRES
        .iter()
        .find(|(genre_id, _)| *genre_id == id)
        .map(|(_, name)| *name)
}

/// Extract the year from a free-form release date such as `"2010-03-12"`.
///
/// Only the first four characters are considered and they must all be
/// digits. Anything else yields `None`.
pub fn release_year(release_date: Option<&str>) -> Option<i32> {
    let prefix = release_date?.get(..4)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Normalize a detail payload for `requested`.
///
/// Detail lookups are strict: the payload must describe the requested movie
/// and carry at least one genre.
///
/// # Errors
/// [`CacheError::InvalidUpstreamData`] when the payload does not decode, names
/// a different movie or has no genres.
pub fn movie_details(requested: MovieId, payload: RawPayload) -> Result<MovieFields> {
    let raw: RawMovie = serde_json::from_value(payload)
        .map_err(|e| CacheError::invalid(requested, format!("undecodable payload: {e}")))?;

    if raw.id.get() != requested {
        return Err(CacheError::invalid(
            requested,
            format!("payload describes movie {}", raw.id),
        ));
    }

    let fields = into_fields(raw);
    if fields.genres.is_empty() {
        return Err(CacheError::invalid(requested, "missing genre metadata"));
    }
    Ok(fields)
}

/// Normalize one entry of a list payload.
///
/// List entries may legitimately come without genres. The error is returned
/// to the caller so it can log and skip the entry.
pub fn list_entry(payload: RawPayload) -> std::result::Result<(MovieId, MovieFields), serde_json::Error> {
    let raw: RawMovie = serde_json::from_value(payload)?;
    Ok((raw.id.get(), into_fields(raw)))
}

fn into_fields(raw: RawMovie) -> MovieFields {
    let genres = match raw.genres {
        Some(genres) if !genres.is_empty() => genres.into_iter().map(|g| g.name).collect(),
        _ => raw
            .genre_ids
            .unwrap_or_default()
            .into_iter()
            .filter_map(genre_name)
            .map(str::to_string)
            .collect(),
    };

    MovieFields {
        title: raw.title.unwrap_or_default(),
        release_year: release_year(raw.release_date.as_deref()),
        overview: raw.overview.unwrap_or_default(),
        poster_path: raw.poster_path.unwrap_or_default(),
        genres,
        popularity: raw.popularity.unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_year_from_release_date() {
        assert_eq!(release_year(Some("2010-03-12")), Some(2010));
        assert_eq!(release_year(Some("1999")), Some(1999));
    }

    #[test]
    fn absent_or_garbled_release_date_has_no_year() {
        assert_eq!(release_year(None), None);
        assert_eq!(release_year(Some("")), None);
        assert_eq!(release_year(Some("201")), None);
        assert_eq!(release_year(Some("TBA-2025")), None);
        assert_eq!(release_year(Some("+201-01-01")), None);
        assert_eq!(release_year(Some("20é0")), None);
    }

    #[test]
    fn details_map_genre_objects_to_names() {
        let payload = json!({
            "id": 27205,
            "title": "Inception",
            "release_date": "2010-07-15",
            "overview": "A thief who steals corporate secrets...",
            "poster_path": "/inception.jpg",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "popularity": 83.9
        });

        let fields = movie_details(27205, payload).unwrap();
        assert_eq!(fields.title, "Inception");
        assert_eq!(fields.release_year, Some(2010));
        assert_eq!(fields.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(fields.popularity, 83.9);
    }

    #[test]
    fn genre_objects_are_read_by_name_only() {
        let payload = json!({
            "id": 13,
            "title": "Forrest Gump",
            "genres": [{"name": "Drama"}, {"id": "18-alt", "name": "Romance"}]
        });

        let fields = movie_details(13, payload).unwrap();
        assert_eq!(fields.genres, vec!["Drama", "Romance"]);
    }

    #[test]
    fn missing_and_null_fields_get_defaults() {
        let payload = json!({
            "id": 5,
            "title": "Four Rooms",
            "overview": null,
            "genres": [{"id": 35, "name": "Comedy"}]
        });

        let fields = movie_details(5, payload).unwrap();
        assert_eq!(fields.overview, "");
        assert_eq!(fields.poster_path, "");
        assert_eq!(fields.popularity, 0.0);
        assert_eq!(fields.release_year, None);
    }

    #[test]
    fn details_without_genres_are_invalid() {
        for payload in [
            json!({"id": 11, "title": "Star Wars", "genres": []}),
            json!({"id": 11, "title": "Star Wars"}),
            json!({"id": 11, "title": "Star Wars", "genres": null}),
        ] {
            let err = movie_details(11, payload).unwrap_err();
            assert!(
                matches!(err, CacheError::InvalidUpstreamData { id: 11, .. }),
                "unexpected error: {err:?}"
            );
        }
    }

    #[test]
    fn details_for_another_movie_are_invalid() {
        let payload = json!({"id": 12, "genres": [{"id": 18, "name": "Drama"}]});
        assert!(matches!(
            movie_details(11, payload),
            Err(CacheError::InvalidUpstreamData { id: 11, .. })
        ));
    }

    #[test]
    fn list_entry_names_genre_ids() {
        let payload = json!({
            "id": 603,
            "title": "The Matrix",
            "release_date": "1999-03-30",
            "genre_ids": [28, 878, 424242]
        });

        let (id, fields) = list_entry(payload).unwrap();
        assert_eq!(id, 603);
        assert_eq!(fields.genres, vec!["Action", "Science Fiction"]);
    }

    #[test]
    fn list_entry_without_genres_is_accepted() {
        let (_, fields) = list_entry(json!({"id": 1, "title": "Untitled"})).unwrap();
        assert!(fields.genres.is_empty());
    }

    #[test]
    fn list_entry_with_malformed_id_is_rejected() {
        for payload in [
            json!({"title": "no id"}),
            json!({"id": "abc"}),
            json!({"id": -4}),
            json!({"id": 0}),
            json!({"id": 1.5}),
            json!("not an object"),
        ] {
            assert!(list_entry(payload).is_err());
        }
    }
}
