//! Low-level cryptographic operations.
//!
//! Randomness, hashing, constant-time comparison and the text cipher live
//! here. The stream cipher has its own module because it works on `Read` and
//! `Write` rather than buffers.
//!
//! Primitive choices:
//! - **Randomness**: `ring::rand::SystemRandom`, the only entropy source in the crate
//! - **Hash**: SHAKE256 squeezed to 32 bytes
//! - **Text cipher**: AES-256-CFB with a random 128-bit IV prepended to the output

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};
use sha3::digest::{ExtendableOutput, Update};
use sha3::Shake256;
use subtle::ConstantTimeEq;

use crate::error::{Result, SsfError};

/// Size of a derived key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Size of every digest produced by the crate.
pub const HASH_LEN: usize = 32;

/// AES block size, also the IV width of the text cipher.
pub const BLOCK_LEN: usize = 16;

/// Size of a per-envelope salt.
pub const SALT_LEN: usize = 128;

type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// Fill `buf` from the system CSPRNG.
///
/// A failing entropy source is reported, never replaced by a weaker one.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| SsfError::RandomnessFailure)
}

/// Return `n` random bytes.
pub fn random(n: usize) -> Result<Vec<u8>> {
    let mut result = vec![0u8; n];
    fill_random(&mut result)?;
    Ok(result)
}

/// Return a fresh salt for one envelope.
pub fn new_salt() -> Result<Vec<u8>> {
    random(SALT_LEN)
}

/// SHAKE256 of `parts` (fed in order) squeezed to `HASH_LEN` bytes.
pub fn hash(parts: &[&[u8]]) -> [u8; HASH_LEN] {
    let mut hasher = Shake256::default();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; HASH_LEN];
    hasher.finalize_xof_into(&mut out);
    out
}

/// Compare two byte strings without leaking where they differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Encrypt a short in-memory payload with AES-256-CFB.
///
/// # Layout of returned bytes
/// ```text
/// [ iv (16 bytes) ][ ciphertext (len(plaintext) bytes) ]
/// ```
pub fn encrypt_text(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(SsfError::EmptyInput);
    }

    let mut output = vec![0u8; BLOCK_LEN + plaintext.len()];
    let (iv, body) = output.split_at_mut(BLOCK_LEN);
    fill_random(iv)?;
    body.copy_from_slice(plaintext);

    Aes256CfbEnc::new_from_slices(key, iv)
        .map_err(|_| SsfError::InvalidInput("cipher key or iv length".into()))?
        .encrypt(body);

    Ok(output)
}

/// Decrypt a payload produced by [`encrypt_text`].
pub fn decrypt_text(ciphertext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() {
        return Err(SsfError::EmptyInput);
    }
    if ciphertext.len() < BLOCK_LEN {
        return Err(SsfError::InvalidInput(
            "invalid decryption cipher block length".into(),
        ));
    }

    let (iv, body) = ciphertext.split_at(BLOCK_LEN);
    let mut plaintext = body.to_vec();

    Aes256CfbDec::new_from_slices(key, iv)
        .map_err(|_| SsfError::InvalidInput("cipher key or iv length".into()))?
        .decrypt(&mut plaintext);

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_key(seed: &[u8]) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        let n = seed.len().min(KEY_LEN);
        key[..n].copy_from_slice(&seed[..n]);
        key
    }

    #[test]
    fn test_text_roundtrip_and_length() {
        let key = build_key(b"abc");
        for case in ["text", "other text", "other long long text"] {
            let encrypted = encrypt_text(case.as_bytes(), &key).unwrap();
            assert_eq!(encrypted.len(), case.len() + BLOCK_LEN);
            assert_ne!(&encrypted[BLOCK_LEN..], case.as_bytes());

            let decrypted = decrypt_text(&encrypted, &key).unwrap();
            assert_eq!(decrypted, case.as_bytes());
        }
    }

    #[test]
    fn test_decrypt_strips_iv() {
        // The first 16 bytes are taken as the IV.
        let key = build_key(b"abc");
        let input = b"                other text";
        let decrypted = decrypt_text(input, &key).unwrap();
        assert_eq!(decrypted.len(), input.len() - BLOCK_LEN);
        assert_ne!(&decrypted[..], &input[BLOCK_LEN..]);
    }

    #[test]
    fn test_text_rejects_empty_and_short() {
        let key = build_key(b"abc");
        assert!(matches!(encrypt_text(b"", &key), Err(SsfError::EmptyInput)));
        assert!(matches!(decrypt_text(b"", &key), Err(SsfError::EmptyInput)));
        assert!(matches!(
            decrypt_text(b"too short", &key),
            Err(SsfError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_iv_is_fresh_per_message() {
        let key = build_key(b"abc");
        let a = encrypt_text(b"same message", &key).unwrap();
        let b = encrypt_text(b"same message", &key).unwrap();
        assert_ne!(a[..BLOCK_LEN], b[..BLOCK_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_concatenates_parts() {
        let (ab, cd): (&[u8], &[u8]) = (b"ab", b"cd");
        assert_eq!(hash(&[ab, cd]), hash(&[b"abcd".as_slice()]));
        assert_ne!(hash(&[b"abcd".as_slice()]), hash(&[b"abce".as_slice()]));
    }

    #[test]
    fn test_random_lengths() {
        assert_eq!(new_salt().unwrap().len(), SALT_LEN);
        assert!(random(0).unwrap().is_empty());
        assert_ne!(random(32).unwrap(), random(32).unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
