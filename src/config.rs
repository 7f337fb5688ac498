// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and the [`CacheConfig`]
//! object loaded from them at startup. The config is constructed once and
//! passed by reference into the cache; no module-level secret state exists.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CACHE_SECRET` | Operator secret the encryption key is derived from | Required |
//! | `CACHE_DATA_DIR` | Directory holding the embedded database file | `/data` |
//! | `CACHE_RETENTION_DAYS` | Default retention window in days | `90` |
//! | `CACHE_SWEEP_INTERVAL_SECS` | Seconds between expiry sweeps | `3600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, CacheResult};

/// Environment variable name for the operator-supplied encryption secret.
///
/// The 32-byte payload key is derived from this value with a memory-hard
/// KDF. There is no fallback: startup fails if the variable is unset or
/// empty, so an unconfigured deployment can never encrypt under a key an
/// attacker could guess from the source.
pub const SECRET_ENV: &str = "CACHE_SECRET";

/// Environment variable name for the data directory.
///
/// The embedded database file lives here. The directory is created on
/// first open if it does not exist.
pub const DATA_DIR_ENV: &str = "CACHE_DATA_DIR";

/// Environment variable name for the default retention window (days).
pub const RETENTION_DAYS_ENV: &str = "CACHE_RETENTION_DAYS";

/// Environment variable name for the sweep interval (seconds).
pub const SWEEP_INTERVAL_ENV: &str = "CACHE_SWEEP_INTERVAL_SECS";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default data directory when `CACHE_DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Default retention window in days when `CACHE_RETENTION_DAYS` is unset.
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Default seconds between expiry sweeps when `CACHE_SWEEP_INTERVAL_SECS`
/// is unset.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// File name of the embedded database inside the data directory.
const DB_FILE_NAME: &str = "consent_cache.redb";

/// Startup configuration for the cache.
///
/// Built once via [`CacheConfig::from_env`] (or [`CacheConfig::new`] in
/// tests and embedding code) and handed by reference to
/// [`DocumentCache::new`](crate::cache::DocumentCache::new).
#[derive(Clone)]
pub struct CacheConfig {
    secret: String,
    data_dir: PathBuf,
    retention_days: i64,
    sweep_interval_secs: u64,
}

impl CacheConfig {
    /// Create a config with the given secret and all defaults.
    ///
    /// Fails with [`CacheError::Configuration`] if the secret is empty.
    pub fn new(secret: impl Into<String>) -> CacheResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(CacheError::Configuration(format!(
                "{SECRET_ENV} must not be empty"
            )));
        }
        Ok(Self {
            secret,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            retention_days: DEFAULT_RETENTION_DAYS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        })
    }

    /// Load configuration from the environment.
    ///
    /// A missing or empty `CACHE_SECRET` is fatal. Numeric variables that
    /// are set but unparseable are also fatal rather than silently
    /// replaced with defaults.
    pub fn from_env() -> CacheResult<Self> {
        let secret = env::var(SECRET_ENV).map_err(|_| {
            CacheError::Configuration(format!(
                "{SECRET_ENV} is not set; refusing to start without an encryption secret"
            ))
        })?;
        let mut config = Self::new(secret)?;

        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(days) = env::var(RETENTION_DAYS_ENV) {
            let days: i64 = days.parse().map_err(|_| {
                CacheError::Configuration(format!("{RETENTION_DAYS_ENV} must be an integer"))
            })?;
            config = config.with_retention_days(days)?;
        }
        if let Ok(secs) = env::var(SWEEP_INTERVAL_ENV) {
            let secs: u64 = secs.parse().map_err(|_| {
                CacheError::Configuration(format!("{SWEEP_INTERVAL_ENV} must be an integer"))
            })?;
            config.sweep_interval_secs = secs;
        }

        Ok(config)
    }

    /// Override the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Override the default retention window. Must be positive and within
    /// what the window arithmetic can represent; per-call overrides at
    /// store time are not constrained by this.
    pub fn with_retention_days(mut self, days: i64) -> CacheResult<Self> {
        if days <= 0 {
            return Err(CacheError::Configuration(format!(
                "{RETENTION_DAYS_ENV} must be positive, got {days}"
            )));
        }
        if chrono::Duration::try_days(days).is_none() {
            return Err(CacheError::Configuration(format!(
                "{RETENTION_DAYS_ENV} is out of range, got {days}"
            )));
        }
        self.retention_days = days;
        Ok(self)
    }

    /// Override the sweep interval.
    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    /// The operator secret the key is derived from.
    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Directory holding the embedded database file.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the embedded database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    /// Default retention window in days.
    pub fn retention_days(&self) -> i64 {
        self.retention_days
    }

    /// Seconds between expiry sweeps.
    pub fn sweep_interval_secs(&self) -> u64 {
        self.sweep_interval_secs
    }
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("secret", &"[REDACTED]")
            .field("data_dir", &self.data_dir)
            .field("retention_days", &self.retention_days)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_rejected() {
        let result = CacheConfig::new("");
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn defaults_applied() {
        let config = CacheConfig::new("test-secret").unwrap();
        assert_eq!(config.data_dir(), Path::new(DEFAULT_DATA_DIR));
        assert_eq!(config.retention_days(), DEFAULT_RETENTION_DAYS);
        assert_eq!(config.sweep_interval_secs(), DEFAULT_SWEEP_INTERVAL_SECS);
        assert!(config.db_path().ends_with(DB_FILE_NAME));
    }

    #[test]
    fn builder_overrides() {
        let config = CacheConfig::new("test-secret")
            .unwrap()
            .with_data_dir("/tmp/cache-test")
            .with_retention_days(7)
            .unwrap()
            .with_sweep_interval_secs(60);
        assert_eq!(config.data_dir(), Path::new("/tmp/cache-test"));
        assert_eq!(config.retention_days(), 7);
        assert_eq!(config.sweep_interval_secs(), 60);
    }

    #[test]
    fn non_positive_retention_rejected() {
        let config = CacheConfig::new("test-secret").unwrap();
        assert!(config.clone().with_retention_days(0).is_err());
        assert!(config.with_retention_days(-5).is_err());
    }

    #[test]
    fn out_of_range_retention_rejected() {
        // Parseable but absurd values fail as config errors, not panics
        let config = CacheConfig::new("test-secret").unwrap();
        assert!(matches!(
            config.with_retention_days(i64::MAX),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = CacheConfig::new("super-secret-value").unwrap();
        let printed = format!("{config:?}");
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("super-secret-value"));
    }

    // Sequential on purpose: the only test in the crate that mutates
    // process environment.
    #[test]
    fn from_env_requires_secret() {
        env::remove_var(SECRET_ENV);
        assert!(matches!(
            CacheConfig::from_env(),
            Err(CacheError::Configuration(_))
        ));

        env::set_var(SECRET_ENV, "env-secret");
        env::set_var(RETENTION_DAYS_ENV, "30");
        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.retention_days(), 30);

        env::set_var(RETENTION_DAYS_ENV, "not-a-number");
        assert!(matches!(
            CacheConfig::from_env(),
            Err(CacheError::Configuration(_))
        ));

        env::remove_var(SECRET_ENV);
        env::remove_var(RETENTION_DAYS_ENV);
    }
}
