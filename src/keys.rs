//! Key derivation and ownership.
//!
//! This module owns two responsibilities:
//! 1. Deriving a symmetric key and its fingerprint from a caller secret and a
//!    salt using PBKDF2-HMAC-SHA3-512.
//! 2. Holding derived key material in types that are opaque, non-cloneable,
//!    and zeroised on drop.
//!
//! ## Derivation structure
//!
//! ```text
//! key         = PBKDF2-HMAC-SHA3-512(secret, salt, 65536 iterations, 32 bytes)
//! fingerprint = SHAKE256(key || salt)[..32]
//! ```
//!
//! The fingerprint is stored in the envelope. It proves that a presented
//! secret is the one used at creation without storing the secret or the key.
//!
//! ## Stream keys
//!
//! The stream cipher runs with an all-zero IV, which is only sound while no
//! key ever encrypts two streams. [`FreshKey`] enforces that: it can only be
//! built with a salt drawn inside [`FreshKey::generate`], and
//! [`crate::stream::encrypt`] consumes it.

use std::fmt;

use sha3::Sha3_512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{self, HASH_LEN, KEY_LEN};
use crate::error::Result;

/// Number of PBKDF2 iterations.
pub const PBKDF2_ITERATIONS: u32 = 65_536;

/// Digest of (key || salt), safe to store and compare.
pub type Fingerprint = [u8; HASH_LEN];

// ---------------------------------------------------------------------------
// Derived key
// ---------------------------------------------------------------------------

/// A key derived from a caller secret and a salt.
///
/// - Not `Clone`. Each derived key lives for one encrypt or decrypt call.
/// - Zeroised on drop.
/// - Raw bytes are `pub(crate)`; they never leave the crate.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Borrow the raw key bytes for use in the ciphers.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Build a key from raw bytes, bypassing derivation. Test-only.
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the key and its fingerprint for `secret` under `salt`.
///
/// Pure and deterministic: the same inputs always give the same outputs.
pub fn derive_key(secret: &[u8], salt: &[u8]) -> (DerivedKey, Fingerprint) {
    let mut key = DerivedKey {
        bytes: [0u8; KEY_LEN],
    };
    pbkdf2::pbkdf2_hmac::<Sha3_512>(secret, salt, PBKDF2_ITERATIONS, &mut key.bytes);
    let fingerprint = crypto::hash(&[&key.as_bytes()[..], salt]);
    (key, fingerprint)
}

/// Check `secret` against a stored fingerprint and return the key on success.
///
/// Returns `None` on mismatch. The comparison is constant-time.
pub(crate) fn verify_key(secret: &[u8], salt: &[u8], expected: &[u8]) -> Option<DerivedKey> {
    let (key, fingerprint) = derive_key(secret, salt);
    crypto::constant_time_eq(&fingerprint, expected).then_some(key)
}

// ---------------------------------------------------------------------------
// Fresh key
// ---------------------------------------------------------------------------

/// A derived key bound to a salt that was generated for it alone.
///
/// Single-use: the stream cipher takes it by value.
pub struct FreshKey {
    key: DerivedKey,
    salt: Vec<u8>,
    fingerprint: Fingerprint,
}

impl FreshKey {
    /// Draw a new salt and derive a key for `secret` under it.
    pub fn generate(secret: &[u8]) -> Result<Self> {
        let salt = crypto::new_salt()?;
        let (key, fingerprint) = derive_key(secret, &salt);
        Ok(Self {
            key,
            salt,
            fingerprint,
        })
    }

    /// The salt this key was derived under.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The fingerprint to store next to the ciphertext.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub(crate) fn key(&self) -> &DerivedKey {
        &self.key
    }

    /// Wrap raw key bytes with a random salt, skipping PBKDF2. Test-only.
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        let key = DerivedKey::from_bytes(bytes);
        let salt = vec![0u8; crypto::SALT_LEN];
        let fingerprint = crypto::hash(&[&key.as_bytes()[..], &salt[..]]);
        Self {
            key,
            salt,
            fingerprint,
        }
    }
}

impl fmt::Debug for FreshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreshKey")
            .field("key", &self.key)
            .field("salt_len", &self.salt.len())
            .finish()
    }
}
