//! # ssf
//!
//! Cryptographic and capacity-control core of a self-destructing secret
//! sharing service.
//!
//! A caller hands over a plaintext (short text or a file stream) and a secret
//! phrase. The secret is stretched into a key under a fresh salt, the payload
//! is encrypted, and an [`Envelope`] comes back. Presenting the envelope again
//! with the same secret recovers the content. A [`Quota`] keeps the total size
//! of stored ciphertext files under a configured budget.
//!
//! ## Public API
//!
//! - [`encrypt_text`] / [`decrypt_text`]: in-memory payloads, ciphertext inline.
//! - [`encrypt_file`] / [`decrypt_file`]: streamed payloads, ciphertext on disk
//!   with a plaintext digest computed on the fly.
//! - [`Vault`]: the above bound to a storage directory, pepper and quota.
//! - [`Quota`]: the shared byte budget.
//! - [`pwgen`]: readable random passwords.

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod ops;
pub mod pwgen;
pub mod quota;
pub mod signer;
pub mod storage;
pub mod stream;
pub mod vault;

pub use config::Config;
pub use crypto::{new_salt, random};
pub use envelope::Envelope;
pub use error::{Result, SsfError};
pub use ops::{decrypt_file, decrypt_text, encrypt_file, encrypt_text};
pub use quota::Quota;
pub use vault::Vault;
