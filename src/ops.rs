//! Envelope-level operations: secret + plaintext in, envelope out, and back.
//!
//! Every call derives its own key material and drops (zeroises) it before
//! returning. Nothing is shared between calls.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::crypto;
use crate::envelope::Envelope;
use crate::error::{Result, SsfError, Stage};
use crate::keys::{self, DerivedKey, FreshKey};
use crate::signer::{Side, Signer};
use crate::storage;
use crate::stream;

fn unlock(secret: &[u8], salt: &[u8], fingerprint: &[u8]) -> Result<DerivedKey> {
    keys::verify_key(secret, salt, fingerprint).ok_or(SsfError::SecretMismatch)
}

/// Encrypt a short plaintext. The envelope's `value` is the hex ciphertext.
pub fn encrypt_text(secret: &[u8], plaintext: &[u8]) -> Result<Envelope> {
    if plaintext.is_empty() {
        return Err(SsfError::EmptyInput);
    }
    let key = FreshKey::generate(secret)?;
    let ciphertext = crypto::encrypt_text(plaintext, key.key().as_bytes())?;
    Ok(Envelope::text(key.salt(), key.fingerprint(), &ciphertext))
}

/// Recover the plaintext of a text envelope.
///
/// The secret is checked against the stored fingerprint before any
/// decryption happens.
pub fn decrypt_text(secret: &[u8], envelope: &Envelope) -> Result<Vec<u8>> {
    let parts = envelope.decode_text()?;
    let key = unlock(secret, &parts.salt, &parts.key_fingerprint)?;
    crypto::decrypt_text(&parts.ciphertext, key.as_bytes())
}

/// Encrypt `src` into a new file under `base` and return its envelope.
///
/// The plaintext digest is computed while `src` is read. An empty source is
/// rejected with [`SsfError::EmptyInput`]. On any failure the partially
/// written file is removed.
pub fn encrypt_file<R>(
    secret: &[u8],
    src: &mut R,
    base: &Path,
    name: Option<&str>,
) -> Result<Envelope>
where
    R: Read + ?Sized,
{
    let key = FreshKey::generate(secret)?;
    let salt = key.salt().to_vec();
    let fingerprint = *key.fingerprint();

    let (file, path) = storage::create_unique(base, name)?;
    let sealed = write_encrypted(src, file, key).and_then(|(bytes, digest)| {
        Envelope::file(&salt, &fingerprint, &digest, &path).map(|envelope| (bytes, envelope))
    });
    match sealed {
        Ok((bytes, envelope)) => {
            debug!(path = %path.display(), bytes, "file encrypted");
            Ok(envelope)
        }
        Err(e) => {
            discard(&path);
            Err(e)
        }
    }
}

fn write_encrypted<R>(src: &mut R, file: File, key: FreshKey) -> Result<(u64, [u8; crypto::HASH_LEN])>
where
    R: Read + ?Sized,
{
    let mut signer = Signer::reader(src);
    let mut dst = BufWriter::new(file);
    let bytes = stream::encrypt(&mut signer, &mut dst, key)?;
    if bytes == 0 {
        return Err(SsfError::EmptyInput);
    }
    let digest = signer.sum(Side::Read)?;
    let file = dst
        .into_inner()
        .map_err(|e| SsfError::io(Stage::Encryption)(e.into_error()))?;
    file.sync_all().map_err(SsfError::io(Stage::Encryption))?;
    Ok((bytes, digest))
}

/// Remove a file we created, logging rather than masking the original error.
pub(crate) fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove rejected file");
        }
    }
}

/// Decrypt the file referenced by `envelope` into `dst`.
///
/// The secret is verified before the file is opened. The plaintext digest is
/// checked only after every byte has been written to `dst`: on
/// [`SsfError::IntegrityMismatch`] the caller must discard what it received.
pub fn decrypt_file<W>(secret: &[u8], envelope: &Envelope, dst: &mut W) -> Result<()>
where
    W: Write + ?Sized,
{
    let parts = envelope.decode_file()?;
    let key = unlock(secret, &parts.salt, &parts.key_fingerprint)?;

    let file = File::open(&parts.path).map_err(SsfError::io(Stage::FileAccess))?;
    let mut src = BufReader::new(file);
    let mut signer = Signer::writer(dst);
    let bytes = stream::decrypt(&mut src, &mut signer, &key)?;

    // An emptied file cannot match a digest recorded over real data.
    let digest = signer.sum(Side::Write).map_err(|_| SsfError::IntegrityMismatch)?;
    if !crypto::constant_time_eq(&digest, &parts.data_digest) {
        warn!(path = %parts.path.display(), bytes, "file digest mismatch");
        return Err(SsfError::IntegrityMismatch);
    }
    debug!(path = %parts.path.display(), bytes, "file decrypted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_text_roundtrip() {
        let envelope = encrypt_text(b"secret", b"some text").unwrap();
        assert!(!envelope.is_file());
        assert_ne!(envelope.value, hex::encode("some text"));
        assert_eq!(decrypt_text(b"secret", &envelope).unwrap(), b"some text");
    }

    #[test]
    fn test_text_wrong_secret() {
        let envelope = encrypt_text(b"secret", b"some text").unwrap();
        assert!(matches!(
            decrypt_text(b"secreT", &envelope),
            Err(SsfError::SecretMismatch)
        ));
    }

    #[test]
    fn test_empty_text_skips_derivation() {
        assert!(matches!(encrypt_text(b"secret", b""), Err(SsfError::EmptyInput)));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut src: &[u8] = b"some text";
        let envelope = encrypt_file(b"secret", &mut src, dir.path(), None).unwrap();
        assert!(envelope.is_file());
        assert!(Path::new(&envelope.value).starts_with(dir.path()));

        let mut out = Vec::new();
        decrypt_file(b"secret", &envelope, &mut out).unwrap();
        assert_eq!(out, b"some text");
    }

    #[test]
    fn test_file_wrong_secret_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let mut src: &[u8] = b"some text";
        let envelope = encrypt_file(b"secret", &mut src, dir.path(), Some("f")).unwrap();
        // Even a missing file reports the secret first.
        fs::remove_file(&envelope.value).unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            decrypt_file(b"wrong", &envelope, &mut out),
            Err(SsfError::SecretMismatch)
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_file_is_rejected_and_removed() {
        let dir = TempDir::new().unwrap();
        let err = encrypt_file(b"secret", &mut io::empty(), dir.path(), Some("empty")).unwrap_err();
        assert!(matches!(err, SsfError::EmptyInput));
        assert!(!dir.path().join("empty").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_storage_dir_leaves_nothing() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let base = dir.path().join(OsStr::from_bytes(b"store-\xff"));
        fs::create_dir(&base).unwrap();

        let mut src: &[u8] = b"some text";
        let err = encrypt_file(b"secret", &mut src, &base, Some("f")).unwrap_err();
        assert!(matches!(err, SsfError::InvalidInput(_)));
        assert_eq!(fs::read_dir(&base).unwrap().count(), 0);
    }

    #[test]
    fn test_truncated_file_is_integrity_failure() {
        let dir = TempDir::new().unwrap();
        let mut src: &[u8] = b"some text";
        let envelope = encrypt_file(b"secret", &mut src, dir.path(), None).unwrap();
        fs::write(&envelope.value, b"").unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            decrypt_file(b"secret", &envelope, &mut out),
            Err(SsfError::IntegrityMismatch)
        ));
    }
}
