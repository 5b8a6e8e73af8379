use crate::{
    config::{Config, RecordStoreType},
    engine::MovieCache,
    metrics,
    store::{MemoryStore, RecordStore},
    upstream::TmdbClient,
};
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

pub type BuildError = Box<dyn std::error::Error + Send + Sync>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Cache engine (owns the record store and upstream client)
    pub cache: MovieCache,
    /// Prometheus handle, `None` if another recorder owns the process
    pub metrics: Option<PrometheusHandle>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create the state for `config`: HTTP client, TMDb client, record store
    /// and cache engine, each constructed once per process.
    pub async fn new(config: Config) -> Result<Self, BuildError> {
        let http_client = Client::builder()
            .timeout(config.upstream_timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;

        let upstream = TmdbClient::new(
            http_client,
            &config.tmdb_base_url,
            config.tmdb_api_key.clone(),
            config.tmdb_language.clone(),
        )?;

        let store = build_store(&config).await?;
        let cache = MovieCache::new(Arc::new(upstream), store, config.cache_settings());

        info!(
            "Cache engine ready (ttl {}s, list cap {})",
            config.cache_ttl_secs, config.list_size_cap
        );

        Ok(Self {
            config: Arc::new(config),
            cache,
            metrics: metrics::install(),
            started_at: Instant::now(),
        })
    }
}

async fn build_store(config: &Config) -> Result<Arc<dyn RecordStore>, BuildError> {
    match config.record_store {
        RecordStoreType::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "valkey")]
        RecordStoreType::Valkey => {
            let url = config
                .valkey_url
                .as_deref()
                .ok_or("VALKEY_URL is required when RECORD_STORE=valkey")?;
            Ok(Arc::new(crate::store::ValkeyStore::connect(url).await?))
        }
        #[cfg(not(feature = "valkey"))]
        RecordStoreType::Valkey => {
            tracing::warn!("RECORD_STORE=valkey requires the `valkey` feature; using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
