// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Consent cache maintenance daemon.
//!
//! Opens the embedded database, verifies the cache is usable, and runs
//! the expiry sweeper until interrupted. Embedders that only need the
//! library API do not run this binary.

use std::sync::Arc;
use std::time::Duration;
use std::{env, process};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use consent_cache::cache::DocumentCache;
use consent_cache::config::{CacheConfig, LOG_FORMAT_ENV};
use consent_cache::error::CacheResult;
use consent_cache::storage::ConsentDb;
use consent_cache::sweeper::ExpirySweeper;

#[tokio::main]
async fn main() {
    init_tracing();

    // Configuration problems are fatal here: without a secret there is
    // no key, and a made-up key would quietly produce unreadable rows
    let (config, cache) = match boot() {
        Ok(parts) => parts,
        Err(e) => {
            error!(error = %e, "Refusing to start");
            process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let sweeper = ExpirySweeper::new(cache.clone())
        .with_interval(Duration::from_secs(config.sweep_interval_secs()));
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    info!(
        db_path = %config.db_path().display(),
        retention_days = config.retention_days(),
        "Consent cache service running"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");

    shutdown.cancel();
    let _ = sweeper_handle.await;
    info!("Consent cache service stopped");
}

/// Load configuration, open the database, and derive the at-rest key.
fn boot() -> CacheResult<(CacheConfig, Arc<DocumentCache<ConsentDb>>)> {
    let config = CacheConfig::from_env()?;
    let store = ConsentDb::open(&config.db_path())?;
    let cache = Arc::new(DocumentCache::new(&config, store)?);

    match cache.stats() {
        Ok(stats) => info!(live = stats.live, expired = stats.expired, "Cache opened"),
        Err(e) => warn!(error = %e, "Cache opened but stats are unavailable"),
    }

    Ok((config, cache))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var(LOG_FORMAT_ENV).map(|v| v == "json").unwrap_or(false);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
