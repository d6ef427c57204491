//! Service configuration (loaded from TOML).
//!
//! ```toml
//! [storage]
//! dir = "/var/lib/ssf"   # root of encrypted files
//! size = 1024            # quota capacity, MiB
//!
//! [settings]
//! ttl = 86400            # seconds an item lives
//! times = 1              # reads before an item is destroyed
//! size = 10              # per-file limit, MiB
//! salt = "pepper"        # appended to every caller secret
//! gc = 60                # expiry collector period, seconds
//! passlen = 16           # generated password length
//! shutdown = 5           # graceful shutdown timeout, seconds
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Result, SsfError, Stage};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub settings: Settings,
}

/// Where ciphertext files live and how much room they may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding ciphertext files.
    pub dir: PathBuf,
    /// Capacity in MiB.
    pub size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("storage"),
            size: 1024,
        }
    }
}

/// Per-item service policy.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ttl: u64,
    pub times: u32,
    /// Per-file limit in MiB.
    pub size: u64,
    /// Process-wide pepper appended to caller secrets.
    pub salt: String,
    pub gc: u64,
    pub passlen: usize,
    pub shutdown: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ttl: 86_400,
            times: 1,
            size: 10,
            salt: String::new(),
            gc: 60,
            passlen: 16,
            shutdown: 5,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("ttl", &self.ttl)
            .field("times", &self.times)
            .field("size", &self.size)
            .field("salt", &"[REDACTED]")
            .field("gc", &self.gc)
            .field("passlen", &self.passlen)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(data: &str) -> Result<Self> {
        let config: Self = toml::from_str(data).map_err(|e| SsfError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(SsfError::io(Stage::Config))?;
        Self::from_toml(&data)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.size == 0 {
            return Err(SsfError::Config("storage size must be positive".into()));
        }
        mib_to_bytes(self.storage.size)?;
        if self.settings.size == 0 || self.settings.size > self.storage.size {
            return Err(SsfError::Config(format!(
                "file size limit {} MiB must be in 1..={} MiB",
                self.settings.size, self.storage.size
            )));
        }
        if self.settings.ttl == 0 || self.settings.times == 0 {
            return Err(SsfError::Config("ttl and times must be positive".into()));
        }
        if self.settings.passlen == 0 {
            return Err(SsfError::Config("passlen must be positive".into()));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.settings.ttl)
    }

    pub fn gc_period(&self) -> Duration {
        Duration::from_secs(self.settings.gc)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.shutdown)
    }

    /// Per-file limit in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.settings.size.saturating_mul(MIB)
    }

    /// The secret handed to key derivation: `password || pepper`.
    pub fn secret(&self, password: &str) -> Zeroizing<Vec<u8>> {
        peppered(password, &self.settings.salt)
    }
}

const MIB: u64 = 1 << 20;

/// Convert a size in MiB to bytes, rejecting values that do not fit a `u64`.
pub(crate) fn mib_to_bytes(mb: u64) -> Result<u64> {
    mb.checked_mul(MIB)
        .ok_or_else(|| SsfError::Config(format!("size {mb} MiB overflows a byte count")))
}

pub(crate) fn peppered(password: &str, pepper: &str) -> Zeroizing<Vec<u8>> {
    let mut secret = Zeroizing::new(Vec::with_capacity(password.len() + pepper.len()));
    secret.extend_from_slice(password.as_bytes());
    secret.extend_from_slice(pepper.as_bytes());
    secret
}
