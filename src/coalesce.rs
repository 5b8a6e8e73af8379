//! Per-key request coalescing.
//!
//! The first caller for a key spawns the refresh as a detached task and
//! parks a shared handle to it in the in-flight map. Callers arriving while
//! it runs await the same handle. The task removes its own entry when it
//! settles, including when it panics or is aborted. Because the work is spawned, a caller that gives up does not
//! cancel the refresh for the others.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{CacheError, Result};
use crate::metrics;

type Flight<V> = Shared<BoxFuture<'static, Result<V>>>;

/// In-flight map of shared refreshes, keyed by what is being refreshed.
pub struct Coalescer<K, V> {
    flights: Arc<DashMap<K, Flight<V>>>,
    /// Label for logs and metrics (`movie`, `list`).
    label: &'static str,
}

impl<K, V> Clone for Coalescer<K, V> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
            label: self.label,
        }
    }
}

/// Removes a flight from the map when its task finishes, however it ends.
struct FlightGuard<K, V>
where
    K: Eq + Hash,
{
    flights: Arc<DashMap<K, Flight<V>>>,
    key: K,
}

impl<K, V> Drop for FlightGuard<K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.flights.remove(&self.key);
    }
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(label: &'static str) -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
            label,
        }
    }

    /// Run `refresh` for `key` unless one is already running, and return the
    /// outcome of whichever refresh is in flight.
    pub async fn run<F>(&self, key: K, refresh: F) -> Result<V>
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let flight = match self.flights.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!("Joining in-flight {} refresh for {:?}", self.label, key);
                metrics::record_coalesced(self.label);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let label = self.label;
                let guard = FlightGuard {
                    flights: Arc::clone(&self.flights),
                    key: key.clone(),
                };
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    refresh.await
                });

                let flight = async move {
                    handle.await.unwrap_or_else(|e| {
                        error!("{} refresh task for {:?} aborted: {}", label, key, e);
                        Err(CacheError::Store(format!("{label} refresh task aborted: {e}")))
                    })
                }
                .boxed()
                .shared();

                entry.insert(flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Number of refreshes currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}
