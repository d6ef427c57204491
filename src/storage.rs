//! Ciphertext file creation.
//!
//! Uniqueness comes from the filesystem's exclusive-create primitive, so any
//! number of callers may create files in the same directory concurrently
//! without a lock. Files are readable and writable by the owner only.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::crypto;
use crate::error::{Result, SsfError, Stage};

/// Random bytes behind a generated file name (hex doubles the length).
pub const FILE_NAME_LEN: usize = 64;

/// Attempts at finding a free random name.
pub const FILE_CREATE_ATTEMPTS: usize = 10;

fn open_exclusive(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// A supplied name must stay inside the base directory.
fn check_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(SsfError::InvalidInput(format!("unsafe file name {name:?}"))),
    }
}

/// Create a new file inside `base` and return it with its full path.
///
/// With a `name`, exactly one exclusive creation is attempted and an existing
/// file is an error. Without one, a random hex name is drawn and redrawn on
/// collision up to [`FILE_CREATE_ATTEMPTS`] times; any other error aborts.
pub fn create_unique(base: &Path, name: Option<&str>) -> Result<(File, PathBuf)> {
    if let Some(name) = name {
        check_name(name)?;
        let path = base.join(name);
        let file = open_exclusive(&path).map_err(SsfError::io(Stage::FileCreation))?;
        return Ok((file, path));
    }

    create_with(base, || Ok(hex::encode(crypto::random(FILE_NAME_LEN)?)))
}

/// Exclusive creation under names drawn from `next_name`, redrawn on collision.
fn create_with<F>(base: &Path, mut next_name: F) -> Result<(File, PathBuf)>
where
    F: FnMut() -> Result<String>,
{
    for attempt in 1..=FILE_CREATE_ATTEMPTS {
        let path = base.join(next_name()?);
        match open_exclusive(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(attempt, "random file name collision");
            }
            Err(e) => return Err(SsfError::io(Stage::FileCreation)(e)),
        }
    }
    Err(SsfError::NameExhaustion(FILE_CREATE_ATTEMPTS))
}
