// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payload Cryptography
//!
//! Two leaf components with no storage knowledge:
//!
//! - `kdf` - scrypt derivation of the 32-byte payload key from the
//!   operator secret (once per process, zeroized on drop)
//! - `codec` - AES-256-GCM encrypt/decrypt with a fresh random nonce per
//!   call and fail-closed tag verification

pub mod codec;
pub mod kdf;

pub use codec::{decrypt, encrypt, EncryptedPayload, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive_key, SecureKey, KEY_SIZE};
