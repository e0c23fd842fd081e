//! Keyed cache of pooled backend clients.
//!
//! Entries are keyed by configuration fingerprint and evicted by capacity,
//! age (TTL) and idle time (TTI). Lookups for the same fingerprint share a
//! single in-flight construction. Because entries are `Arc`s, evicting one
//! never invalidates a client borrowed by an in-flight worker; the
//! underlying resources are released when the last clone drops.

use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::backend::{self, BackendConfig, ObjectClient};
use crate::{Error, Result};

/// Cache of backend clients, keyed by configuration fingerprint.
pub struct ConnectionCache {
    cache: Cache<u64, Arc<dyn ObjectClient>>,
}

impl ConnectionCache {
    /// Create a cache with the given capacity and eviction settings.
    /// `None` disables the corresponding eviction axis.
    pub fn new(capacity: u64, ttl: Option<Duration>, tti: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(capacity);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = tti {
            builder = builder.time_to_idle(tti);
        }
        Self {
            cache: builder.build(),
        }
    }

    /// Look up the client for a configuration, constructing it on miss.
    ///
    /// Concurrent calls with equal fingerprints trigger at most one
    /// construction.
    pub async fn get_or_create(&self, config: &BackendConfig) -> Result<Arc<dyn ObjectClient>> {
        let fingerprint = config.fingerprint();
        let config = config.clone();
        self.get_or_create_with(fingerprint, async move {
            debug!("Connection cache miss for fingerprint {:#018x}", fingerprint);
            backend::connect(&config)
        })
        .await
    }

    /// Single-flight lookup with an explicit constructor, used directly by
    /// tests that need to observe construction counts.
    pub async fn get_or_create_with<F>(
        &self,
        fingerprint: u64,
        init: F,
    ) -> Result<Arc<dyn ObjectClient>>
    where
        F: Future<Output = Result<Arc<dyn ObjectClient>>>,
    {
        self.cache
            .try_get_with(fingerprint, init)
            .await
            .map_err(|e: Arc<Error>| Error::Connect(e.to_string()))
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Drain eviction bookkeeping; only meaningful in tests.
    #[cfg(test)]
    async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}
