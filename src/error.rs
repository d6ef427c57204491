//! Error types for ssf.
//!
//! Every error variant is a distinct failure mode of the envelope, storage or
//! quota layers. Error messages are intentionally minimal: they signal *what*
//! failed and never carry secrets, keys, digests or plaintext.

use std::fmt;
use std::io;

use thiserror::Error;

/// Shorthand for results of ssf operations.
pub type Result<T> = std::result::Result<T, SsfError>;

/// The stage an I/O error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Copying plaintext into the stream cipher.
    Encryption,
    /// Copying ciphertext out of the stream cipher.
    Decryption,
    /// Creating a ciphertext file.
    FileCreation,
    /// Opening or removing an existing ciphertext file.
    FileAccess,
    /// Scanning the storage directory for its current footprint.
    StorageScan,
    /// Reading the configuration file.
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Encryption => "copy for encryption",
            Self::Decryption => "copy for decryption",
            Self::FileCreation => "file creation",
            Self::FileAccess => "file access",
            Self::StorageScan => "storage scan",
            Self::Config => "config read",
        };
        f.write_str(name)
    }
}

/// The single error type for all ssf operations.
#[derive(Debug, Error)]
pub enum SsfError {
    /// Zero-length plaintext or ciphertext given to the text cipher.
    #[error("empty text")]
    EmptyInput,

    /// Input is structurally invalid: a ciphertext shorter than its IV, a
    /// file envelope without a data digest, an unsafe file name, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An envelope field held malformed hex.
    #[error("hex decode {field}: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    /// The presented secret does not derive the stored key fingerprint.
    #[error("failed secret")]
    SecretMismatch,

    /// The decrypted file digest differs from the one recorded at encryption.
    #[error("data digest mismatch")]
    IntegrityMismatch,

    /// A digest was requested for a signer side that never saw a byte.
    #[error("no data signed")]
    NoDataSigned,

    /// No free random file name was found within the retry budget.
    #[error("can not create new file after {0} attempts")]
    NameExhaustion(usize),

    /// The storage reservation would exceed the configured capacity.
    #[error("storage limit={capacity} is reached [{reserved} + {requested}]")]
    QuotaExceeded {
        capacity: u64,
        reserved: u64,
        requested: u64,
    },

    /// A single upload is bigger than the per-file limit.
    #[error("file size {size} exceeds limit {limit}")]
    FileTooLarge { limit: u64, size: u64 },

    /// The system's random number generator failed to produce bytes.
    #[error("randomness source failed")]
    RandomnessFailure,

    /// An underlying I/O error, tagged with the stage it happened in.
    #[error("{stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    /// The configuration is unreadable or inconsistent.
    #[error("config: {0}")]
    Config(String),
}

impl SsfError {
    /// Wrap an I/O error with the stage it happened in.
    pub(crate) fn io(stage: Stage) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { stage, source }
    }

    /// Whether retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NameExhaustion(_))
    }
}
