// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated encryption of opaque payloads (AES-256-GCM).
//!
//! Every `encrypt` call draws a fresh random nonce; reusing a nonce under
//! the same key would void the AEAD confidentiality guarantee. Ciphertext,
//! nonce and tag travel as three separate fields so the stored schema can
//! grow (e.g. a key-version column) without reparsing a packed blob.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};

use crate::crypto::kdf::SecureKey;
use crate::error::{CacheError, CacheResult};

/// AES-GCM nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// AEAD output: the three fields persisted per record.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub tag: Vec<u8>,
}

fn cipher_for(key: &SecureKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Encrypt a payload under a fresh random nonce.
///
/// Fails with [`CacheError::Encryption`] only when the plaintext
/// exceeds the AEAD length limit (just under 64 GiB for AES-GCM).
pub fn encrypt(plaintext: &[u8], key: &SecureKey) -> CacheResult<EncryptedPayload> {
    let cipher = cipher_for(key);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CacheError::Encryption)?;
    let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

    Ok(EncryptedPayload {
        ciphertext,
        nonce: nonce.to_vec(),
        tag,
    })
}

/// Decrypt and verify a stored triple.
///
/// Fails closed with [`CacheError::Integrity`] on any tag mismatch,
/// wrong key, or malformed field. Never returns partial plaintext.
pub fn decrypt(payload: &EncryptedPayload, key: &SecureKey) -> CacheResult<Vec<u8>> {
    if payload.nonce.len() != NONCE_SIZE || payload.tag.len() != TAG_SIZE {
        return Err(CacheError::Integrity);
    }

    let cipher = cipher_for(key);
    let nonce = Nonce::from_slice(&payload.nonce);

    let mut combined = Vec::with_capacity(payload.ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(&payload.ciphertext);
    combined.extend_from_slice(&payload.tag);

    cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| CacheError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::derive_key;
    use std::collections::HashSet;

    fn test_key() -> SecureKey {
        derive_key(b"codec-test-secret").unwrap()
    }

    #[test]
    fn roundtrip_small_payload() {
        let key = test_key();
        let plaintext = b"tax filing 2025, form 16";
        let encrypted = encrypt(plaintext, &key).unwrap();
        assert_eq!(encrypted.nonce.len(), NONCE_SIZE);
        assert_eq!(encrypted.tag.len(), TAG_SIZE);

        let decrypted = decrypt(&encrypted, &key).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn roundtrip_empty_payload() {
        let key = test_key();
        let encrypted = encrypt(b"", &key).unwrap();
        assert!(encrypted.ciphertext.is_empty());
        assert_eq!(encrypted.tag.len(), TAG_SIZE);

        let decrypted = decrypt(&encrypted, &key).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn roundtrip_multi_megabyte_payload() {
        let key = test_key();
        let plaintext: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let encrypted = encrypt(&plaintext, &key).unwrap();
        let decrypted = decrypt(&encrypted, &key).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let key = test_key();
        let mut encrypted = encrypt(b"bank statement Q3", &key).unwrap();
        encrypted.ciphertext[0] ^= 0x01;
        assert!(matches!(
            decrypt(&encrypted, &key),
            Err(CacheError::Integrity)
        ));
    }

    #[test]
    fn tampered_nonce_fails_closed() {
        let key = test_key();
        let mut encrypted = encrypt(b"bank statement Q3", &key).unwrap();
        encrypted.nonce[0] ^= 0x01;
        assert!(matches!(
            decrypt(&encrypted, &key),
            Err(CacheError::Integrity)
        ));
    }

    #[test]
    fn tampered_tag_fails_closed() {
        let key = test_key();
        let mut encrypted = encrypt(b"bank statement Q3", &key).unwrap();
        encrypted.tag[0] ^= 0x01;
        assert!(matches!(
            decrypt(&encrypted, &key),
            Err(CacheError::Integrity)
        ));
    }

    #[test]
    fn wrong_key_fails_closed() {
        let key = test_key();
        let other = derive_key(b"a-different-secret").unwrap();
        let encrypted = encrypt(b"identity record", &key).unwrap();
        assert!(matches!(
            decrypt(&encrypted, &other),
            Err(CacheError::Integrity)
        ));
    }

    #[test]
    fn malformed_field_lengths_fail_closed() {
        let key = test_key();
        let encrypted = encrypt(b"payload", &key).unwrap();

        let short_nonce = EncryptedPayload {
            nonce: encrypted.nonce[..NONCE_SIZE - 1].to_vec(),
            ..encrypted.clone()
        };
        assert!(matches!(
            decrypt(&short_nonce, &key),
            Err(CacheError::Integrity)
        ));

        let short_tag = EncryptedPayload {
            tag: encrypted.tag[..TAG_SIZE - 1].to_vec(),
            ..encrypted
        };
        assert!(matches!(
            decrypt(&short_tag, &key),
            Err(CacheError::Integrity)
        ));
    }

    #[test]
    fn nonces_never_repeat() {
        let key = test_key();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let encrypted = encrypt(b"x", &key).unwrap();
            assert!(
                seen.insert(encrypted.nonce.clone()),
                "nonce collision within 10,000 encryptions"
            );
        }
    }
}
