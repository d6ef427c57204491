//! Minimal example: sharing a note and a file through a vault.
//!
//! Run with: `cargo run --example share_secret`
//!
//! - A text secret is sealed and opened with a generated password
//! - A file is streamed into storage and charged to the quota
//! - Removing the file hands its bytes back to the quota

use std::sync::Arc;

use ssf::{pwgen, Quota, Vault};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Setup: a scratch storage directory with a 1 MiB budget.
    let dir = std::env::temp_dir().join("ssf_demo");
    std::fs::create_dir_all(&dir)?;
    let quota = Arc::new(Quota::initialize(&dir, 1)?);
    let vault = Vault::new(&dir, Arc::clone(&quota), 64 * 1024, "demo-pepper");

    // 2. Share a note.
    let password = pwgen::generate(16)?;
    let note = vault.seal_text(&password, b"the vault code is 4-8-15-16")?;
    println!("password: {password}");
    println!("envelope: {}", note.to_json()?);
    let opened = vault.open_text(&password, &note)?;
    println!("opened:   {}", String::from_utf8_lossy(&opened));

    // 3. Share a file.
    let report = b"quarterly numbers, do not forward".repeat(100);
    let sealed = vault.seal_file(&password, &mut report.as_slice(), None)?;
    println!("stored {} bytes at {} ({quota})", report.len(), sealed.value);

    let mut restored = Vec::new();
    vault.open_file(&password, &sealed, &mut restored)?;
    assert_eq!(restored, report);

    // 4. Expire it.
    let freed = vault.remove_file(&sealed)?;
    println!("removed {freed} bytes ({quota})");

    Ok(())
}
