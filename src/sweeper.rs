// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expiry Sweeper
//!
//! Background task that periodically removes records whose retention
//! window has closed. Fetches already refuse expired rows on their own;
//! the sweeper is what physically reclaims them, so ciphertext does not
//! sit on disk after the consent that justified it lapsed.
//!
//! ## Strategy
//!
//! Every `sweep_interval` (default 1 h) the sweeper runs one
//! `sweep_expired` pass and logs how many rows it removed. A failed
//! pass is logged and retried at the next tick; rows it missed are
//! still unreadable in the meantime.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown so
//! an in-flight pass finishes before the task exits.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::DocumentCache;
use crate::config::DEFAULT_SWEEP_INTERVAL_SECS;
use crate::storage::ConsentStore;

/// Background task that physically deletes expired records.
pub struct ExpirySweeper<S: ConsentStore> {
    cache: Arc<DocumentCache<S>>,
    sweep_interval: Duration,
}

impl<S: ConsentStore> ExpirySweeper<S> {
    /// Create a sweeper over the given cache with the default interval.
    pub fn new(cache: Arc<DocumentCache<S>>) -> Self {
        Self {
            cache,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    /// Override the interval between passes.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Expiry sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Expiry sweeper shutting down");
                return;
            }

            self.sweep_step();

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one pass. Errors are logged, never fatal to the loop.
    fn sweep_step(&self) {
        match self.cache.sweep_expired() {
            Ok(0) => {}
            Ok(removed) => {
                info!(removed, "Expiry sweeper: removed expired records");
            }
            Err(e) => {
                warn!(error = %e, "Expiry sweeper: pass failed, retrying next interval");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::storage::{MemoryStore, StoreStats};
    use chrono::Duration as ChronoDuration;

    fn shared_cache() -> Arc<DocumentCache<MemoryStore>> {
        let config = CacheConfig::new("sweeper-test-secret").unwrap();
        Arc::new(DocumentCache::new(&config, MemoryStore::new()).unwrap())
    }

    #[tokio::test]
    async fn removes_expired_rows_while_running() {
        let cache = shared_cache();
        cache
            .store("consent-1", "principal-1", b"dead", Some(ChronoDuration::seconds(-1)))
            .unwrap();
        cache.store("consent-2", "principal-2", b"alive", None).unwrap();

        let shutdown = CancellationToken::new();
        let sweeper = ExpirySweeper::new(cache.clone()).with_interval(Duration::from_millis(10));
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        // First pass runs immediately after spawn
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cache.stats().unwrap(), StoreStats { live: 1, expired: 0 });
        assert_eq!(cache.fetch_by_consent("consent-2").unwrap(), b"alive");
    }

    #[tokio::test]
    async fn stops_promptly_on_cancellation() {
        let cache = shared_cache();
        let shutdown = CancellationToken::new();
        // Interval far longer than the test; only cancellation can end the loop
        let sweeper = ExpirySweeper::new(cache).with_interval(Duration::from_secs(3600));
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
