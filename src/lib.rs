// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Consent Cache - Consent-Scoped Encrypted Document Cache
//!
//! This crate provides short-lived storage for sensitive documents fetched
//! on a data principal's consent: payloads are sealed with AES-256-GCM under
//! a key derived from a deployment secret, every read is scoped to a consent
//! handle, and a retention window bounds how long anything survives.
//!
//! ## Modules
//!
//! - `cache` - the `DocumentCache` facade (encrypt, store, fetch, erase)
//! - `crypto` - key derivation and the authenticated payload codec
//! - `retention` - retention windows and expiry arithmetic
//! - `storage` - consent-scoped record stores (redb, in-memory)
//! - `sweeper` - background removal of expired records

pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod retention;
pub mod storage;
pub mod sweeper;
