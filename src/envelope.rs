//! The envelope handed back to callers and presented again on reconstruction.
//!
//! Wire format (JSON via serde, camelCase):
//!
//! ```text
//! {
//!   "salt":           hex,            always
//!   "keyFingerprint": hex,            always
//!   "dataDigest":     hex,            file envelopes only
//!   "value":          hex | path      ciphertext for text, file path for files
//! }
//! ```
//!
//! Hex is lowercase on encode. An envelope is immutable once built; decoding
//! produces fresh raw buffers and never touches the public fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SsfError};

/// Serialized result of an encryption, required again for decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Hex salt the key was derived under.
    pub salt: String,
    /// Hex SHAKE256 of (key || salt).
    pub key_fingerprint: String,
    /// Hex SHAKE256 of the plaintext file, absent for text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_digest: Option<String>,
    /// Hex ciphertext for text, storage path for files.
    pub value: String,
}

/// Raw fields of a text envelope.
#[derive(Debug)]
pub struct TextParts {
    pub salt: Vec<u8>,
    pub key_fingerprint: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Raw fields of a file envelope.
#[derive(Debug)]
pub struct FileParts {
    pub salt: Vec<u8>,
    pub key_fingerprint: Vec<u8>,
    pub data_digest: Vec<u8>,
    pub path: PathBuf,
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|source| SsfError::Decode { field, source })
}

impl Envelope {
    /// Encode a text envelope.
    pub fn text(salt: &[u8], key_fingerprint: &[u8], ciphertext: &[u8]) -> Self {
        Self {
            salt: hex::encode(salt),
            key_fingerprint: hex::encode(key_fingerprint),
            data_digest: None,
            value: hex::encode(ciphertext),
        }
    }

    /// Encode a file envelope. The path is stored as-is, not hex.
    ///
    /// Fails with [`SsfError::InvalidInput`] if the path is not valid UTF-8,
    /// since it could not be reopened from the stored string.
    pub fn file(salt: &[u8], key_fingerprint: &[u8], data_digest: &[u8], path: &Path) -> Result<Self> {
        let value = path
            .to_str()
            .ok_or_else(|| SsfError::InvalidInput("file path is not valid UTF-8".into()))?;
        Ok(Self {
            salt: hex::encode(salt),
            key_fingerprint: hex::encode(key_fingerprint),
            data_digest: Some(hex::encode(data_digest)),
            value: value.to_owned(),
        })
    }

    /// Whether this envelope references a ciphertext file.
    pub fn is_file(&self) -> bool {
        self.data_digest.is_some()
    }

    /// Decode the fields a text reconstruction needs. `dataDigest` is ignored.
    pub fn decode_text(&self) -> Result<TextParts> {
        Ok(TextParts {
            salt: decode_field("salt", &self.salt)?,
            key_fingerprint: decode_field("keyFingerprint", &self.key_fingerprint)?,
            ciphertext: decode_field("value", &self.value)?,
        })
    }

    /// Decode the fields a file reconstruction needs.
    pub fn decode_file(&self) -> Result<FileParts> {
        let digest = self
            .data_digest
            .as_deref()
            .ok_or_else(|| SsfError::InvalidInput("dataDigest is missing".into()))?;
        Ok(FileParts {
            salt: decode_field("salt", &self.salt)?,
            key_fingerprint: decode_field("keyFingerprint", &self.key_fingerprint)?,
            data_digest: decode_field("dataDigest", digest)?,
            path: PathBuf::from(&self.value),
        })
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SsfError::InvalidInput(e.to_string()))
    }

    /// Parse the JSON wire format.
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| SsfError::InvalidInput(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_envelope_shape() {
        let env = Envelope::text(&[0xAB, 0x01], &[0xFF; 4], b"\x00\x10");
        assert_eq!(env.salt, "ab01");
        assert_eq!(env.key_fingerprint, "ffffffff");
        assert_eq!(env.value, "0010");
        assert!(!env.is_file());

        let json = env.to_json().unwrap();
        assert!(!json.contains("dataDigest"));
        assert!(json.contains("\"keyFingerprint\":\"ffffffff\""));
    }

    #[test]
    fn test_file_envelope_keeps_plain_path() {
        let env = Envelope::file(&[1], &[2], &[3], Path::new("/var/ssf/abc")).unwrap();
        assert_eq!(env.value, "/var/ssf/abc");
        assert_eq!(env.data_digest.as_deref(), Some("03"));

        let parts = env.decode_file().unwrap();
        assert_eq!(parts.path, PathBuf::from("/var/ssf/abc"));
        assert_eq!(parts.data_digest, vec![3]);
    }

    #[test]
    fn test_malformed_hex_names_field() {
        let mut env = Envelope::text(&[1], &[2], &[3]);
        env.key_fingerprint = "zz".into();
        match env.decode_text() {
            Err(SsfError::Decode { field, .. }) => assert_eq!(field, "keyFingerprint"),
            other => panic!("unexpected {other:?}"),
        }

        let mut env = Envelope::file(&[1], &[2], &[3], Path::new("f")).unwrap();
        env.data_digest = Some("abc".into());
        match env.decode_file() {
            Err(SsfError::Decode { field, .. }) => assert_eq!(field, "dataDigest"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_text_decode_ignores_digest_and_file_requires_it() {
        let env = Envelope::text(&[1], &[2], &[3]);
        assert!(env.decode_text().is_ok());
        assert!(matches!(env.decode_file(), Err(SsfError::InvalidInput(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/var/ssf/\xff"));
        assert!(matches!(
            Envelope::file(&[1], &[2], &[3], path),
            Err(SsfError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let env = Envelope::file(&[9; 8], &[8; 32], &[7; 32], Path::new("/tmp/x")).unwrap();
        let back = Envelope::from_json(&env.to_json().unwrap()).unwrap();
        assert_eq!(back, env);
        assert!(Envelope::from_json("{\"salt\":1}").is_err());
    }
}
