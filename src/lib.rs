//! Cache-aside movie metadata service in front of the TMDb API.
//!
//! [`engine::MovieCache`] is the entry point: it serves movies and
//! trending/discover lists from a [`store::RecordStore`], refreshing them
//! through an [`upstream::UpstreamClient`] when they are missing or stale.

pub mod coalesce;
pub mod config;
pub mod engine;
pub mod error;
pub mod freshness;
pub mod lists;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod server;
pub mod store;
pub mod upstream;
