// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-wide error type.
//!
//! One enum covers the whole pipeline: configuration at startup, the
//! AEAD codec, and the embedded store. `NotFound` is a normal outcome
//! (no live record for a consent id), not a fault; callers branch on the
//! variant instead of string-matching messages.

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No usable encryption secret configured. Fatal at startup; the cache
    /// never substitutes a default key.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// AEAD tag verification failed or the stored ciphertext/nonce/tag
    /// triple is malformed. The message deliberately carries no detail.
    #[error("payload integrity verification failed")]
    Integrity,

    /// AEAD sealing failed. Only reachable when a plaintext exceeds the
    /// cipher's length limit; nothing is stored on this path.
    #[error("payload encryption failed")]
    Encryption,

    /// No live (unexpired, unerased) record for the consent id.
    /// Indistinguishable from "never stored".
    #[error("no live record for consent")]
    NotFound,

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    /// True when the error is the benign no-live-record outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}
