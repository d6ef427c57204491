//! Readable random passwords for human-facing secrets.

use crate::crypto;
use crate::error::{Result, SsfError};

/// Symbols used when no alphabet is given. Look-alike characters are left out.
pub const ALPHABET: &str = "#%&+-3479@CFHJKLMNPRTVWXbcdfghjkmnpqrstvwxz";

/// A random password of `len` characters from [`ALPHABET`].
pub fn generate(len: usize) -> Result<String> {
    generate_with(len, ALPHABET)
}

/// A random password of `len` characters from `alphabet`.
///
/// Only ASCII alphabets of at most 256 symbols are accepted. Each symbol is
/// picked uniformly: random bytes that would bias the pick are redrawn.
pub fn generate_with(len: usize, alphabet: &str) -> Result<String> {
    let symbols = alphabet.as_bytes();
    if symbols.is_empty() || symbols.len() > 256 || !alphabet.is_ascii() {
        return Err(SsfError::InvalidInput(
            "password alphabet must be 1..=256 ASCII symbols".into(),
        ));
    }

    // Largest multiple of the alphabet size that fits in a byte.
    let zone = 256 - 256 % symbols.len();
    let mut password = String::with_capacity(len);
    let mut pool = [0u8; 64];

    while password.len() < len {
        crypto::fill_random(&mut pool)?;
        for &b in pool.iter().filter(|&&b| (b as usize) < zone) {
            if password.len() == len {
                break;
            }
            password.push(symbols[b as usize % symbols.len()] as char);
        }
    }
    Ok(password)
}
