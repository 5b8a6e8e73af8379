use std::env;
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::engine::CacheSettings;
use crate::models::MAX_LIST_SIZE;
use crate::upstream::tmdb::{DEFAULT_BASE_URL, DEFAULT_LANGUAGE, DEFAULT_TIMEOUT};

/// Record store backend selection
#[derive(Clone, Debug, PartialEq)]
pub enum RecordStoreType {
    Memory,
    Valkey,
}

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// TMDb API key (secret, never logged)
    pub tmdb_api_key: String,
    /// TMDb API root, e.g. `https://api.themoviedb.org/3`
    pub tmdb_base_url: String,
    /// Response language sent with every upstream call
    pub tmdb_language: String,
    /// Freshness window for records and list snapshots, in seconds (default: 86400)
    pub cache_ttl_secs: u64,
    /// Members kept per list snapshot (default and maximum: 20)
    pub list_size_cap: usize,
    /// Per-request upstream timeout in seconds (default: 10)
    pub upstream_timeout_secs: u64,
    /// Record store backend
    pub record_store: RecordStoreType,
    /// Valkey/Redis URL (used when record_store = Valkey)
    pub valkey_url: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("is_dev", &self.is_dev)
            .field("tmdb_api_key", &"<redacted>")
            .field("tmdb_base_url", &self.tmdb_base_url)
            .field("tmdb_language", &self.tmdb_language)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("list_size_cap", &self.list_size_cap)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("record_store", &self.record_store)
            .field("valkey_url", &self.valkey_url)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT and TMDB_API_KEY are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 3000 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        // API key: required in prod; dev runs without one only reach mocks
        let tmdb_api_key = if is_dev {
            env::var("TMDB_API_KEY").unwrap_or_default()
        } else {
            env::var("TMDB_API_KEY").map_err(|_| "TMDB_API_KEY is required in production")?
        };
        if tmdb_api_key.is_empty() {
            warn!("TMDB_API_KEY is empty; upstream calls will be rejected by TMDb");
        }

        let tmdb_base_url =
            env::var("TMDB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let tmdb_language =
            env::var("TMDB_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());

        let cache_ttl_secs: u64 = env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let requested_cap: usize = env::var("LIST_SIZE_CAP")
            .unwrap_or_else(|_| MAX_LIST_SIZE.to_string())
            .parse()
            .unwrap_or(MAX_LIST_SIZE);
        let list_size_cap = requested_cap.clamp(1, MAX_LIST_SIZE);
        if list_size_cap != requested_cap {
            warn!(
                "LIST_SIZE_CAP {} out of range, using {}",
                requested_cap, list_size_cap
            );
        }

        let upstream_timeout_secs: u64 = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT.as_secs().to_string())
            .parse()
            .unwrap_or(DEFAULT_TIMEOUT.as_secs());

        let record_store = match env::var("RECORD_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "valkey" | "redis" => RecordStoreType::Valkey,
            _ => RecordStoreType::Memory,
        };
        let valkey_url = env::var("VALKEY_URL").ok();

        Ok(Config {
            port,
            is_dev,
            tmdb_api_key,
            tmdb_base_url,
            tmdb_language,
            cache_ttl_secs,
            list_size_cap,
            upstream_timeout_secs,
            record_store,
            valkey_url,
        })
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            list_size_cap: self.list_size_cap,
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }
}
