//! Quota admission under concurrency and the startup scan.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use ssf::{Quota, SsfError};
use tempfile::TempDir;

#[test]
fn test_concurrent_reservations_never_overshoot() {
    let quota = Arc::new(Quota::new(1000));
    let barrier = Arc::new(Barrier::new(20));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let quota = Arc::clone(&quota);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                quota.reserve(60)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(SsfError::QuotaExceeded { .. })))
        .count();

    assert_eq!(admitted, 16);
    assert_eq!(rejected, 4);
    assert_eq!(quota.reserved(), 960);
}

#[test]
fn test_initialize_sums_existing_files() {
    let dir = TempDir::new().unwrap();
    for (name, size) in [("a", 100usize), ("b", 250), ("c", 5)] {
        fs::write(dir.path().join(name), vec![0u8; size]).unwrap();
    }

    let quota = Quota::initialize(dir.path(), 1).unwrap();
    assert_eq!(quota.reserved(), 355);
    assert_eq!(quota.capacity(), 1 << 20);
}

#[test]
fn test_rejection_leaves_state_unchanged() {
    let quota = Quota::new(1000);
    quota.reserve(990).unwrap();
    assert!(matches!(quota.reserve(11), Err(SsfError::QuotaExceeded { .. })));
    assert_eq!(quota.reserved(), 990);
    quota.reserve(10).unwrap();
    assert_eq!(quota.available(), 0);
}
