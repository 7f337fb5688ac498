// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Consent-Scoped Storage
//!
//! Persistence for encrypted document payloads, keyed by record id and
//! indexed by consent id and expiry time.
//!
//! ## Access Model
//!
//! - Every row is written once and never updated; correcting a payload
//!   means erase + re-store
//! - Every read passes through the expiry filter: a row whose
//!   `expires_at` is not in the future is dead, even before a sweep has
//!   physically removed it
//! - Nothing outside the [`ConsentStore`] operations touches the tables
//!
//! ## Backends
//!
//! - `consent_db` - embedded redb database (production)
//! - `memory` - in-process map (tests, embedding)

pub mod consent_db;
pub mod memory;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::EncryptedPayload;
use crate::error::{CacheError, CacheResult};

pub use consent_db::ConsentDb;
pub use memory::MemoryStore;

// =============================================================================
// Record
// =============================================================================

/// One persisted encrypted payload.
///
/// The AEAD fields are base64 text, kept separate so the stored schema
/// can grow without reparsing a packed binary layout. The row is opaque
/// to the store; only the codec can open it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsentScopedRecord {
    /// Opaque unique identifier, generated at creation, immutable.
    pub id: Uuid,
    /// Handle correlating this record to one consent grant. Not unique:
    /// repeated stores under one consent leave multiple rows.
    pub consent_id: String,
    /// The individual the data belongs to. Used by upstream
    /// erasure-by-subject workflows, never as a storage key.
    pub data_principal_id: String,
    /// AEAD ciphertext, base64.
    pub ciphertext: String,
    /// AEAD nonce, base64.
    pub nonce: String,
    /// AEAD authentication tag, base64.
    pub auth_tag: String,
    /// Rows with `expires_at <= now` are logically dead.
    pub expires_at: DateTime<Utc>,
    /// Set at insert, immutable.
    pub created_at: DateTime<Utc>,
}

impl ConsentScopedRecord {
    /// Build a record around an encrypted payload.
    pub fn new(
        consent_id: &str,
        data_principal_id: &str,
        payload: &EncryptedPayload,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            consent_id: consent_id.to_string(),
            data_principal_id: data_principal_id.to_string(),
            ciphertext: Base64::encode_string(&payload.ciphertext),
            nonce: Base64::encode_string(&payload.nonce),
            auth_tag: Base64::encode_string(&payload.tag),
            expires_at,
            created_at,
        }
    }

    /// Whether the record is readable at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Decode the stored triple back into codec input.
    ///
    /// A row that does not decode is treated exactly like a tampered
    /// one: [`CacheError::Integrity`], no detail.
    pub fn encrypted_payload(&self) -> CacheResult<EncryptedPayload> {
        let ciphertext = Base64::decode_vec(&self.ciphertext).map_err(|_| CacheError::Integrity)?;
        let nonce = Base64::decode_vec(&self.nonce).map_err(|_| CacheError::Integrity)?;
        let tag = Base64::decode_vec(&self.auth_tag).map_err(|_| CacheError::Integrity)?;
        Ok(EncryptedPayload {
            ciphertext,
            nonce,
            tag,
        })
    }
}

// =============================================================================
// Store Interface
// =============================================================================

/// Row counts for operational visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Rows still inside their retention window.
    pub live: usize,
    /// Logically dead rows awaiting the next sweep.
    pub expired: usize,
}

/// Storage backend seam.
///
/// The cache is written against this trait so it runs unchanged on the
/// embedded database or on an in-process map. Implementations take the
/// observation instant as an argument; they never read the clock
/// themselves.
pub trait ConsentStore {
    /// Persist a new record. Record ids are generated by the caller and
    /// treated as unique.
    fn insert(&self, record: &ConsentScopedRecord) -> CacheResult<()>;

    /// The unexpired record for this consent with the greatest
    /// `created_at`, ties broken by record id. Expired rows are skipped,
    /// never surfaced.
    fn latest_live_by_consent(
        &self,
        consent_id: &str,
        now: DateTime<Utc>,
    ) -> CacheResult<Option<ConsentScopedRecord>>;

    /// Remove every record with `expires_at <= now`. Returns the number
    /// removed; 0 on a repeat call is success, not an error.
    fn delete_expired(&self, now: DateTime<Utc>) -> CacheResult<usize>;

    /// Remove every record for this consent regardless of expiry.
    /// Returns the number removed. Idempotent.
    fn delete_by_consent(&self, consent_id: &str) -> CacheResult<usize>;

    /// Live/expired row counts as of `now`.
    fn stats(&self, now: DateTime<Utc>) -> CacheResult<StoreStats>;
}
