//! The storage-bound facade the request layer talks to.
//!
//! A [`Vault`] ties the envelope operations to one storage directory, a
//! per-file size limit, the process-wide pepper and a shared [`Quota`].

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::config::{self, Config};
use crate::envelope::Envelope;
use crate::error::{Result, SsfError, Stage};
use crate::ops;
use crate::quota::Quota;

/// Encrypts and decrypts secrets inside one storage directory.
pub struct Vault {
    dir: PathBuf,
    quota: Arc<Quota>,
    max_file_size: u64,
    pepper: Zeroizing<String>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("dir", &self.dir)
            .field("quota", &self.quota.to_string())
            .field("max_file_size", &self.max_file_size)
            .finish_non_exhaustive()
    }
}

impl Vault {
    pub fn new(dir: impl Into<PathBuf>, quota: Arc<Quota>, max_file_size: u64, pepper: &str) -> Self {
        Self {
            dir: dir.into(),
            quota,
            max_file_size,
            pepper: Zeroizing::new(pepper.to_owned()),
        }
    }

    /// Build a vault from configuration, seeding the quota from disk.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let quota = Quota::initialize(&config.storage.dir, config.storage.size)?;
        Ok(Self::new(
            config.storage.dir.clone(),
            Arc::new(quota),
            config.max_file_size(),
            &config.settings.salt,
        ))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn quota(&self) -> &Arc<Quota> {
        &self.quota
    }

    fn secret(&self, password: &str) -> Zeroizing<Vec<u8>> {
        config::peppered(password, &self.pepper)
    }

    /// Files handed to us for reading or removal must be our own.
    fn owned_path(&self, envelope: &Envelope) -> Result<PathBuf> {
        let path = PathBuf::from(&envelope.value);
        if path.parent() != Some(self.dir.as_path()) {
            return Err(SsfError::InvalidInput(
                "file is outside the storage directory".into(),
            ));
        }
        Ok(path)
    }

    pub fn seal_text(&self, password: &str, plaintext: &[u8]) -> Result<Envelope> {
        ops::encrypt_text(&self.secret(password), plaintext)
    }

    pub fn open_text(&self, password: &str, envelope: &Envelope) -> Result<Vec<u8>> {
        ops::decrypt_text(&self.secret(password), envelope)
    }

    /// Encrypt an upload into storage and charge it to the quota.
    ///
    /// At most `max_file_size + 1` bytes are read from `src`. An upload over
    /// the limit or over the remaining quota is removed again and rejected;
    /// nothing of it is kept.
    pub fn seal_file<R>(&self, password: &str, src: &mut R, name: Option<&str>) -> Result<Envelope>
    where
        R: Read + ?Sized,
    {
        let mut limited = Read::take(&mut *src, self.max_file_size.saturating_add(1));
        let envelope = ops::encrypt_file(&self.secret(password), &mut limited, &self.dir, name)?;
        let path = PathBuf::from(&envelope.value);

        let admitted = fs::metadata(&path)
            .map_err(SsfError::io(Stage::FileAccess))
            .and_then(|meta| {
                let size = meta.len();
                if size > self.max_file_size {
                    return Err(SsfError::FileTooLarge {
                        limit: self.max_file_size,
                        size,
                    });
                }
                self.quota.reserve(size).map(|()| size)
            });

        match admitted {
            Ok(size) => {
                info!(path = %path.display(), size, quota = %self.quota, "file stored");
                Ok(envelope)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "file rejected");
                ops::discard(&path);
                Err(e)
            }
        }
    }

    /// Decrypt a stored file into `dst`. See [`ops::decrypt_file`] for the
    /// ordering of output and integrity check.
    pub fn open_file<W>(&self, password: &str, envelope: &Envelope, dst: &mut W) -> Result<()>
    where
        W: Write + ?Sized,
    {
        self.owned_path(envelope)?;
        ops::decrypt_file(&self.secret(password), envelope, dst)
    }

    /// Delete an expired file and give its bytes back to the quota.
    pub fn remove_file(&self, envelope: &Envelope) -> Result<u64> {
        let path = self.owned_path(envelope)?;
        let size = fs::metadata(&path)
            .map_err(SsfError::io(Stage::FileAccess))?
            .len();
        fs::remove_file(&path).map_err(SsfError::io(Stage::FileAccess))?;
        self.quota.release(size);
        info!(path = %path.display(), size, quota = %self.quota, "file removed");
        Ok(size)
    }
}
