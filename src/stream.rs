//! Stream encryption for arbitrarily large payloads.
//!
//! AES-256-OFB with an all-zero IV, applied while copying from a reader to a
//! writer. Nothing is buffered beyond one copy chunk.
//!
//! A zero IV is sound only because every stream is encrypted under its own
//! key: [`encrypt`] takes a [`FreshKey`] by value, and a `FreshKey` is always
//! derived under a newly drawn salt. Do not add an entry point that accepts a
//! plain [`DerivedKey`] for encryption.

use std::io::{self, Read, Write};

use aes::Aes256;
use ofb::cipher::{KeyIvInit, StreamCipher};

use crate::crypto::BLOCK_LEN;
use crate::error::{Result, SsfError, Stage};
use crate::keys::{DerivedKey, FreshKey};

type Aes256Ofb = ofb::Ofb<Aes256>;

fn keystream(key: &DerivedKey) -> Result<Aes256Ofb> {
    let iv = [0u8; BLOCK_LEN];
    Aes256Ofb::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| SsfError::InvalidInput("cipher key or iv length".into()))
}

/// A writer that XORs everything written through it with the keystream.
struct CipherWriter<W> {
    cipher: Aes256Ofb,
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.clear();
        self.buf.extend_from_slice(data);
        self.cipher.apply_keystream(&mut self.buf);
        // The keystream has advanced by `data.len()`, so all of it must land.
        self.inner.write_all(&self.buf)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A reader that XORs everything read through it with the keystream.
struct CipherReader<R> {
    cipher: Aes256Ofb,
    inner: R,
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.cipher.apply_keystream(&mut buf[..n]);
        Ok(n)
    }
}

/// Encrypt everything from `src` into `dst`. Returns the number of bytes copied.
pub fn encrypt<R, W>(src: &mut R, dst: &mut W, key: FreshKey) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut writer = CipherWriter {
        cipher: keystream(key.key())?,
        inner: dst,
        buf: Vec::new(),
    };
    let copied = io::copy(src, &mut writer).map_err(SsfError::io(Stage::Encryption))?;
    writer.flush().map_err(SsfError::io(Stage::Encryption))?;
    Ok(copied)
}

/// Decrypt everything from `src` into `dst`. Returns the number of bytes copied.
pub fn decrypt<R, W>(src: &mut R, dst: &mut W, key: &DerivedKey) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut reader = CipherReader {
        cipher: keystream(key)?,
        inner: src,
    };
    let copied = io::copy(&mut reader, dst).map_err(SsfError::io(Stage::Decryption))?;
    dst.flush().map_err(SsfError::io(Stage::Decryption))?;
    Ok(copied)
}
