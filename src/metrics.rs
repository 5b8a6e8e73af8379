//! Prometheus metrics.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`install`] has registered the Prometheus recorder.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the process-wide Prometheus recorder.
///
/// Safe to call more than once; later calls return the first handle.
/// Returns `None` if another recorder was already installed.
pub fn install() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Prometheus recorder not installed: {}", e);
                None
            }
        })
        .clone()
}

/// Cache lookup outcome: `hit`, `miss` or `stale`.
pub fn record_cache_lookup(kind: &'static str, outcome: &'static str) {
    counter!("cinecache_cache_lookups_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_upstream_fetch(kind: &'static str) {
    counter!("cinecache_upstream_fetches_total", "kind" => kind).increment(1);
}

pub fn record_upstream_error(kind: &'static str, error: &'static str) {
    counter!("cinecache_upstream_errors_total", "kind" => kind, "error" => error).increment(1);
}

/// A caller joined a refresh that was already in flight.
pub fn record_coalesced(kind: &'static str) {
    counter!("cinecache_coalesced_requests_total", "kind" => kind).increment(1);
}

/// A malformed list entry was dropped.
pub fn record_skipped_entry(kind: &'static str) {
    counter!("cinecache_skipped_list_entries_total", "kind" => kind).increment(1);
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!("cinecache_requests_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
}

pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("cinecache_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}
