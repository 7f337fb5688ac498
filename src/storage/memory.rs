// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process store backend.
//!
//! Holds every record in one locked map. Suited to tests and to
//! embedding the cache without a data directory; nothing survives a
//! process restart.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ConsentScopedRecord, ConsentStore, StoreStats};
use crate::error::CacheResult;

/// Map-backed [`ConsentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<Uuid, ConsentScopedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds a structurally sound map; recover it
    fn rows(&self) -> MutexGuard<'_, BTreeMap<Uuid, ConsentScopedRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConsentStore for MemoryStore {
    fn insert(&self, record: &ConsentScopedRecord) -> CacheResult<()> {
        self.rows().insert(record.id, record.clone());
        Ok(())
    }

    fn latest_live_by_consent(
        &self,
        consent_id: &str,
        now: DateTime<Utc>,
    ) -> CacheResult<Option<ConsentScopedRecord>> {
        let rows = self.rows();
        // Same ordering the embedded backend's index yields: microsecond
        // timestamps descending, then record id ascending
        let winner = rows
            .values()
            .filter(|r| r.consent_id == consent_id && r.is_live_at(now))
            .max_by_key(|r| (r.created_at.timestamp_micros(), Reverse(r.id)))
            .cloned();
        Ok(winner)
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|_, r| r.is_live_at(now));
        Ok(before - rows.len())
    }

    fn delete_by_consent(&self, consent_id: &str) -> CacheResult<usize> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|_, r| r.consent_id != consent_id);
        Ok(before - rows.len())
    }

    fn stats(&self, now: DateTime<Utc>) -> CacheResult<StoreStats> {
        let rows = self.rows();
        let live = rows.values().filter(|r| r.is_live_at(now)).count();
        Ok(StoreStats {
            live,
            expired: rows.len() - live,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptedPayload;
    use chrono::Duration;

    fn sample_record(
        consent_id: &str,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> ConsentScopedRecord {
        let payload = EncryptedPayload {
            ciphertext: vec![1, 2, 3, 4],
            nonce: vec![7; 12],
            tag: vec![9; 16],
        };
        ConsentScopedRecord::new(consent_id, "principal-1", &payload, created_at + ttl, created_at)
    }

    #[test]
    fn insert_and_fetch_latest() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = sample_record("consent-a", now, Duration::days(1));
        store.insert(&record).unwrap();

        let found = store.latest_live_by_consent("consent-a", now).unwrap().unwrap();
        assert_eq!(found, record);
        assert!(store.latest_live_by_consent("consent-b", now).unwrap().is_none());
    }

    #[test]
    fn newest_live_record_wins() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let older = sample_record("consent-a", now - Duration::seconds(3), Duration::days(1));
        let newest_dead = sample_record("consent-a", now, Duration::seconds(-1));
        let newer = sample_record("consent-a", now - Duration::seconds(1), Duration::days(1));
        store.insert(&older).unwrap();
        store.insert(&newest_dead).unwrap();
        store.insert(&newer).unwrap();

        let found = store.latest_live_by_consent("consent-a", now).unwrap().unwrap();
        assert_eq!(found.id, newer.id);
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let first = sample_record("consent-a", now, Duration::days(1));
        let second = sample_record("consent-a", now, Duration::days(1));
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        let found = store.latest_live_by_consent("consent-a", now).unwrap().unwrap();
        assert_eq!(found.id, first.id.min(second.id));
    }

    #[test]
    fn delete_expired_is_idempotent() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.insert(&sample_record("consent-a", now, Duration::seconds(-5))).unwrap();
        store.insert(&sample_record("consent-b", now, Duration::days(1))).unwrap();

        assert_eq!(store.delete_expired(now).unwrap(), 1);
        assert_eq!(store.delete_expired(now).unwrap(), 0);
        assert!(store.latest_live_by_consent("consent-b", now).unwrap().is_some());
    }

    #[test]
    fn delete_by_consent_leaves_other_consents_alone() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.insert(&sample_record("consent-a", now - Duration::seconds(1), Duration::days(1))).unwrap();
        store.insert(&sample_record("consent-a", now, Duration::seconds(-5))).unwrap();
        store.insert(&sample_record("consent-b", now, Duration::days(1))).unwrap();

        assert_eq!(store.delete_by_consent("consent-a").unwrap(), 2);
        assert_eq!(store.delete_by_consent("consent-a").unwrap(), 0);
        assert!(store.latest_live_by_consent("consent-b", now).unwrap().is_some());
    }

    #[test]
    fn stats_reflect_liveness_at_the_given_instant() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.insert(&sample_record("consent-a", now, Duration::days(1))).unwrap();
        store.insert(&sample_record("consent-b", now, Duration::seconds(-1))).unwrap();

        assert_eq!(store.stats(now).unwrap(), StoreStats { live: 1, expired: 1 });
        // The same rows, observed a day later
        assert_eq!(
            store.stats(now + Duration::days(2)).unwrap(),
            StoreStats { live: 0, expired: 2 }
        );
    }
}
