// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Consent-scoped encrypted document cache.
//!
//! One [`DocumentCache`] ties the pieces together: it derives the
//! at-rest key from the configured secret once at construction,
//! encrypts payloads before they reach the storage backend, and scopes
//! every read to a consent handle. Plaintext never touches the backend;
//! key material never leaves this type.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::crypto::{decrypt, derive_key, encrypt, SecureKey};
use crate::error::{CacheError, CacheResult};
use crate::models::DocumentBundle;
use crate::retention::RetentionPolicy;
use crate::storage::{ConsentScopedRecord, ConsentStore, StoreStats};

/// Encrypted cache over a pluggable storage backend.
pub struct DocumentCache<S: ConsentStore> {
    key: SecureKey,
    policy: RetentionPolicy,
    storage: S,
}

impl<S: ConsentStore> DocumentCache<S> {
    /// Build a cache from configuration and a backend.
    ///
    /// Derives the at-rest key here, once; the derivation is memory-hard
    /// and deliberately slow, so construct the cache at startup and keep
    /// it around.
    pub fn new(config: &CacheConfig, storage: S) -> CacheResult<Self> {
        let key = derive_key(config.secret())?;
        Ok(Self {
            key,
            policy: RetentionPolicy::from_days(config.retention_days()),
            storage,
        })
    }

    // =========================================================================
    // Byte Operations
    // =========================================================================

    /// Encrypt `payload` and persist it under `consent_id`.
    ///
    /// `retention` overrides the configured window for this record only;
    /// `None` applies the default. Returns the new record's id. Storing
    /// again under the same consent adds a row, it does not replace.
    pub fn store(
        &self,
        consent_id: &str,
        data_principal_id: &str,
        payload: &[u8],
        retention: Option<Duration>,
    ) -> CacheResult<Uuid> {
        let now = Utc::now();
        let encrypted = encrypt(payload, &self.key)?;
        let record = ConsentScopedRecord::new(
            consent_id,
            data_principal_id,
            &encrypted,
            self.policy.expiry_from(now, retention),
            now,
        );
        self.storage.insert(&record)?;
        Ok(record.id)
    }

    /// Decrypt and return the newest unexpired payload for this consent.
    ///
    /// Expired rows are skipped even if a sweep has not removed them
    /// yet. [`CacheError::NotFound`] is returned both for a consent that
    /// was never stored and for one whose records have all expired or
    /// been erased; callers cannot tell the cases apart.
    pub fn fetch_by_consent(&self, consent_id: &str) -> CacheResult<Vec<u8>> {
        self.fetch_by_consent_at(consent_id, Utc::now())
    }

    fn fetch_by_consent_at(&self, consent_id: &str, now: DateTime<Utc>) -> CacheResult<Vec<u8>> {
        let record = self
            .storage
            .latest_live_by_consent(consent_id, now)?
            .ok_or(CacheError::NotFound)?;
        let payload = record.encrypted_payload()?;
        decrypt(&payload, &self.key)
    }

    // =========================================================================
    // Typed Operations
    // =========================================================================

    /// Serialize a bundle and store it; see [`DocumentCache::store`].
    pub fn store_bundle(
        &self,
        consent_id: &str,
        data_principal_id: &str,
        bundle: &DocumentBundle,
        retention: Option<Duration>,
    ) -> CacheResult<Uuid> {
        let bytes = serde_json::to_vec(bundle)?;
        self.store(consent_id, data_principal_id, &bytes, retention)
    }

    /// Fetch and deserialize the newest bundle for this consent.
    pub fn fetch_bundle_by_consent(&self, consent_id: &str) -> CacheResult<DocumentBundle> {
        let bytes = self.fetch_by_consent(consent_id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Physically remove every expired record. Returns the number
    /// removed; running it again immediately removes nothing and is not
    /// an error.
    pub fn sweep_expired(&self) -> CacheResult<usize> {
        self.sweep_expired_at(Utc::now())
    }

    fn sweep_expired_at(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        self.storage.delete_expired(now)
    }

    /// Remove every record stored under this consent, live or expired.
    /// Returns the number removed. Safe to repeat.
    pub fn erase_by_consent(&self, consent_id: &str) -> CacheResult<usize> {
        self.storage.delete_by_consent(consent_id)
    }

    /// Current live/expired row counts.
    pub fn stats(&self) -> CacheResult<StoreStats> {
        self.storage.stats(Utc::now())
    }
}
