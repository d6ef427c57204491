//! Storage byte budget.
//!
//! One [`Quota`] guards one storage directory. It is built explicitly and
//! shared by reference (usually `Arc<Quota>`), never through a global.
//!
//! The counter lives behind a single mutex. The lock covers the
//! compare-and-commit of [`Quota::reserve`] as one region, so concurrent
//! reservations can never jointly overshoot the capacity. No file I/O happens
//! under the lock except the directory scan of [`Quota::resync`].

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::config;
use crate::error::{Result, SsfError, Stage};

/// Shared byte budget for stored ciphertext files.
#[derive(Debug)]
pub struct Quota {
    capacity: u64,
    reserved: Mutex<u64>,
}

impl Quota {
    /// A budget of `capacity` bytes with nothing reserved.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            reserved: Mutex::new(0),
        }
    }

    /// A budget of `capacity_mb` MiB seeded from the files already in `dir`.
    ///
    /// Only regular files directly inside `dir` count; subdirectories are
    /// skipped.
    pub fn initialize(dir: &Path, capacity_mb: u64) -> Result<Self> {
        let quota = Self::new(config::mib_to_bytes(capacity_mb)?);
        quota.resync(dir)?;
        info!(dir = %dir.display(), quota = %quota, "storage quota initialized");
        Ok(quota)
    }

    /// Replace the reserved total with the current footprint of `dir`.
    ///
    /// The scan runs under the lock so no reservation interleaves with it.
    pub fn resync(&self, dir: &Path) -> Result<u64> {
        let mut reserved = self.lock();
        *reserved = scan(dir)?;
        Ok(*reserved)
    }

    // A panic while holding the lock cannot leave the counter half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.reserved.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserve `n` bytes, or fail with [`SsfError::QuotaExceeded`] and leave
    /// the counter unchanged.
    pub fn reserve(&self, n: u64) -> Result<()> {
        let mut reserved = self.lock();
        match reserved.checked_add(n) {
            Some(total) if total <= self.capacity => {
                *reserved = total;
                Ok(())
            }
            _ => Err(SsfError::QuotaExceeded {
                capacity: self.capacity,
                reserved: *reserved,
                requested: n,
            }),
        }
    }

    /// Give back `n` bytes after their file was deleted.
    ///
    /// Saturates at zero; releasing more than is reserved means the caller's
    /// bookkeeping drifted, which is logged.
    pub fn release(&self, n: u64) {
        let mut reserved = self.lock();
        if n > *reserved {
            warn!(reserved = *reserved, released = n, "quota release exceeds reservation");
        }
        *reserved = reserved.saturating_sub(n);
    }

    /// Configured ceiling in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes currently committed.
    pub fn reserved(&self) -> u64 {
        *self.lock()
    }

    /// Bytes still available.
    pub fn available(&self) -> u64 {
        self.capacity.saturating_sub(self.reserved())
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "limit={}/{}", self.reserved(), self.capacity)
    }
}

fn scan(dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in fs::read_dir(dir).map_err(SsfError::io(Stage::StorageScan))? {
        let entry = entry.map_err(SsfError::io(Stage::StorageScan))?;
        let meta = entry.metadata().map_err(SsfError::io(Stage::StorageScan))?;
        if meta.is_dir() {
            continue;
        }
        total = total.saturating_add(meta.len());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reserve_until_full() {
        let quota = Quota::new(100);
        quota.reserve(60).unwrap();
        quota.reserve(40).unwrap();
        assert_eq!(quota.available(), 0);

        match quota.reserve(1) {
            Err(SsfError::QuotaExceeded {
                capacity,
                reserved,
                requested,
            }) => assert_eq!((capacity, reserved, requested), (100, 100, 1)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(quota.reserved(), 100);
        quota.reserve(0).unwrap();
    }

    #[test]
    fn test_overflowing_request_is_rejected() {
        let quota = Quota::new(u64::MAX);
        quota.reserve(10).unwrap();
        assert!(quota.reserve(u64::MAX).is_err());
        assert_eq!(quota.reserved(), 10);
    }

    #[test]
    fn test_release_saturates() {
        let quota = Quota::new(100);
        quota.reserve(30).unwrap();
        quota.release(10);
        assert_eq!(quota.reserved(), 20);
        quota.release(50);
        assert_eq!(quota.reserved(), 0);
        assert_eq!(quota.to_string(), "limit=0/100");
    }

    #[test]
    fn test_initialize_skips_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("b"), vec![0u8; 999]).unwrap();

        let quota = Quota::initialize(dir.path(), 1).unwrap();
        assert_eq!(quota.reserved(), 100);
        assert_eq!(quota.capacity(), 1 << 20);

        fs::write(dir.path().join("c"), vec![0u8; 20]).unwrap();
        assert_eq!(quota.resync(dir.path()).unwrap(), 120);
    }

    #[test]
    fn test_initialize_rejects_overflowing_capacity() {
        let dir = TempDir::new().unwrap();
        let err = Quota::initialize(dir.path(), u64::MAX >> 10).unwrap_err();
        assert!(matches!(err, SsfError::Config(_)));
    }

    #[test]
    fn test_initialize_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = Quota::initialize(&dir.path().join("missing"), 1).unwrap_err();
        assert!(matches!(
            err,
            SsfError::Io {
                stage: Stage::StorageScan,
                ..
            }
        ));
    }
}
