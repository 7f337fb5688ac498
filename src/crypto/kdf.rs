// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key derivation from the operator secret.
//!
//! scrypt with fixed cost parameters and a fixed application-level salt:
//! the same secret always yields the same 32-byte key, so rows written
//! before a restart stay decryptable, while brute-forcing the secret from
//! a leaked database stays expensive. Derivation takes on the order of
//! 100 ms and runs once per process, when the cache object is built.

use scrypt::{scrypt, Params};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CacheError, CacheResult};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Application-level salt (domain separation, versioned).
const KDF_SALT: &[u8] = b"consent-cache-at-rest-v1";

/// scrypt cost: N = 2^15 (32 MiB work factor), standard r and p.
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Derived payload key. Zeroized on drop; `Debug` never prints the bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Key bytes for cipher construction. Handle with care.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureKey([REDACTED])")
    }
}

/// Derive the payload key from the operator secret.
///
/// Deterministic: identical secrets yield identical keys across process
/// restarts. The error message never includes the secret.
pub fn derive_key(secret: &[u8]) -> CacheResult<SecureKey> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_SIZE)
        .map_err(|e| CacheError::Configuration(format!("scrypt parameters rejected: {e}")))?;

    let mut key = [0u8; KEY_SIZE];
    scrypt(secret, KDF_SALT, &params, &mut key)
        .map_err(|e| CacheError::Configuration(format!("key derivation failed: {e}")))?;

    Ok(SecureKey(key))
}
