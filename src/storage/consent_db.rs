// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded consent record database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `consent_records`: record_id → serialized ConsentScopedRecord
//! - `consent_index`: composite key (consent_id|!created_at|record_id) → record_id
//! - `expiry_index`: composite key (expires_at|record_id) → record_id
//!
//! The consent index inverts the creation timestamp so a forward range
//! scan yields newest-first; the expiry index keeps natural order so a
//! sweep is a single bounded range scan from the start of the table.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{ConsentScopedRecord, ConsentStore, StoreStats};
use crate::error::CacheResult;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: record_id → serialized ConsentScopedRecord (JSON bytes).
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("consent_records");

/// Index: composite key → record_id.
/// Key format: `consent_id|!created_at_be|record_id` for descending-time range scans.
const CONSENT_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("consent_index");

/// Index: composite key → record_id.
/// Key format: `expires_at_be|record_id`; a sweep scans `..bound(now)`.
const EXPIRY_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("expiry_index");

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Map a signed microsecond timestamp onto `u64` preserving order:
/// `i64::MIN` becomes 0 and `i64::MAX` becomes `u64::MAX`, so byte-wise
/// comparison of the big-endian form matches chronological order even
/// for pre-epoch (negative) values.
fn encode_micros(micros: i64) -> u64 {
    (micros as u64) ^ (1u64 << 63)
}

/// Build a composite key for the consent_index table.
///
/// Format: `consent_id | inverted_micros_be | record_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning
/// forward; equal timestamps fall back to record id order, so the scan
/// winner is deterministic.
fn make_consent_key(consent_id: &str, created_at: DateTime<Utc>, record_id: &str) -> Vec<u8> {
    let micros = created_at.timestamp_micros();
    let mut key = Vec::with_capacity(consent_id.len() + 1 + 8 + 1 + record_id.len());
    key.extend_from_slice(consent_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!encode_micros(micros)).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(record_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all records of a consent.
fn make_consent_prefix(consent_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(consent_id.len() + 1);
    prefix.extend_from_slice(consent_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a consent range scan (prefix with all 0xFF bytes appended).
fn make_consent_prefix_end(consent_id: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(consent_id.len() + 1 + 20);
    end.extend_from_slice(consent_id.as_bytes());
    end.push(b'|');
    // Append enough 0xFF bytes to be past any valid key with this prefix
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Build a composite key for the expiry_index table.
///
/// Format: `expires_micros_be | record_id`, natural (ascending) order.
fn make_expiry_key(expires_at: DateTime<Utc>, record_id: &str) -> Vec<u8> {
    let micros = expires_at.timestamp_micros();
    let mut key = Vec::with_capacity(8 + 1 + record_id.len());
    key.extend_from_slice(&encode_micros(micros).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(record_id.as_bytes());
    key
}

/// Upper bound for an expiry sweep: every key whose leading timestamp is
/// at or before `now` sorts strictly below this value.
fn make_expiry_bound(now: DateTime<Utc>) -> Vec<u8> {
    encode_micros(now.timestamp_micros())
        .saturating_add(1)
        .to_be_bytes()
        .to_vec()
}

// =============================================================================
// ConsentDb
// =============================================================================

/// Embedded ACID database of consent-scoped records.
pub struct ConsentDb {
    db: Database,
}

impl ConsentDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> CacheResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(CONSENT_INDEX)?;
            let _ = write_txn.open_table(EXPIRY_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl ConsentStore for ConsentDb {
    /// Write the record and both index entries in one transaction.
    fn insert(&self, record: &ConsentScopedRecord) -> CacheResult<()> {
        let json = serde_json::to_vec(record)?;
        let id = record.id.to_string();

        let write_txn = self.db.begin_write()?;
        {
            let mut records = write_txn.open_table(RECORDS)?;
            records.insert(id.as_str(), json.as_slice())?;

            let mut consent_idx = write_txn.open_table(CONSENT_INDEX)?;
            let consent_key = make_consent_key(&record.consent_id, record.created_at, &id);
            consent_idx.insert(consent_key.as_slice(), id.as_str())?;

            let mut expiry_idx = write_txn.open_table(EXPIRY_INDEX)?;
            let expiry_key = make_expiry_key(record.expires_at, &id);
            expiry_idx.insert(expiry_key.as_slice(), id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn latest_live_by_consent(
        &self,
        consent_id: &str,
        now: DateTime<Utc>,
    ) -> CacheResult<Option<ConsentScopedRecord>> {
        let read_txn = self.db.begin_read()?;
        let consent_idx = read_txn.open_table(CONSENT_INDEX)?;
        let records = read_txn.open_table(RECORDS)?;

        let prefix = make_consent_prefix(consent_id);
        let prefix_end = make_consent_prefix_end(consent_id);

        // Forward scan is newest-first; the first live row wins
        for entry in consent_idx.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let id = entry.1.value().to_string();

            let Some(value) = records.get(id.as_str())? else {
                continue;
            };
            let record: ConsentScopedRecord = serde_json::from_slice(value.value())?;

            // A consent id containing '|' can land inside another consent's
            // key range; verify before trusting the scan
            if record.consent_id != consent_id {
                continue;
            }
            if record.is_live_at(now) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut records = write_txn.open_table(RECORDS)?;
            let mut consent_idx = write_txn.open_table(CONSENT_INDEX)?;
            let mut expiry_idx = write_txn.open_table(EXPIRY_INDEX)?;

            // Collect candidates first; the range borrows the table
            let mut doomed: Vec<(Vec<u8>, String)> = Vec::new();
            {
                let bound = make_expiry_bound(now);
                for entry in expiry_idx.range(..bound.as_slice())? {
                    let entry = entry?;
                    doomed.push((entry.0.value().to_vec(), entry.1.value().to_string()));
                }
            }

            let mut removed = 0usize;
            for (expiry_key, id) in &doomed {
                let record_bytes = {
                    match records.get(id.as_str())? {
                        Some(value) => value.value().to_vec(),
                        None => {
                            // Orphaned index entry; clean it up and move on
                            expiry_idx.remove(expiry_key.as_slice())?;
                            continue;
                        }
                    }
                };
                let record: ConsentScopedRecord = serde_json::from_slice(&record_bytes)?;

                // Index keys carry microsecond precision; recheck the row
                if record.is_live_at(now) {
                    continue;
                }

                records.remove(id.as_str())?;
                let consent_key = make_consent_key(&record.consent_id, record.created_at, id);
                consent_idx.remove(consent_key.as_slice())?;
                expiry_idx.remove(expiry_key.as_slice())?;
                removed += 1;
            }
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn delete_by_consent(&self, consent_id: &str) -> CacheResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut records = write_txn.open_table(RECORDS)?;
            let mut consent_idx = write_txn.open_table(CONSENT_INDEX)?;
            let mut expiry_idx = write_txn.open_table(EXPIRY_INDEX)?;

            let mut doomed: Vec<(Vec<u8>, String)> = Vec::new();
            {
                let prefix = make_consent_prefix(consent_id);
                let prefix_end = make_consent_prefix_end(consent_id);
                for entry in consent_idx.range(prefix.as_slice()..prefix_end.as_slice())? {
                    let entry = entry?;
                    doomed.push((entry.0.value().to_vec(), entry.1.value().to_string()));
                }
            }

            let mut removed = 0usize;
            for (consent_key, id) in &doomed {
                let record_bytes = {
                    match records.get(id.as_str())? {
                        Some(value) => value.value().to_vec(),
                        None => {
                            consent_idx.remove(consent_key.as_slice())?;
                            continue;
                        }
                    }
                };
                let record: ConsentScopedRecord = serde_json::from_slice(&record_bytes)?;

                // Same overshoot guard as the fetch scan
                if record.consent_id != consent_id {
                    continue;
                }

                records.remove(id.as_str())?;
                consent_idx.remove(consent_key.as_slice())?;
                let expiry_key = make_expiry_key(record.expires_at, id);
                expiry_idx.remove(expiry_key.as_slice())?;
                removed += 1;
            }
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn stats(&self, now: DateTime<Utc>) -> CacheResult<StoreStats> {
        let read_txn = self.db.begin_read()?;
        let expiry_idx = read_txn.open_table(EXPIRY_INDEX)?;

        // Every record has exactly one expiry entry, so one pass over the
        // index partitions the whole store
        let bound = make_expiry_bound(now);
        let mut stats = StoreStats::default();
        for entry in expiry_idx.iter()? {
            let entry = entry?;
            if entry.0.value() < bound.as_slice() {
                stats.expired += 1;
            } else {
                stats.live += 1;
            }
        }
        Ok(stats)
    }
}

// =============================================================================
// Tests
// =============================================================================
