//! Digests computed while a stream is copied.
//!
//! [`Signer`] decorates a reader, a writer, or a duplex value and feeds every
//! byte that actually crosses it into a SHAKE256 accumulator, one per side.
//! The digest therefore reflects exactly what was read from the source or
//! written to the destination, without a second pass over the data.

use std::fmt;
use std::io::{self, Read, Write};

use sha3::digest::{ExtendableOutput, Update};
use sha3::Shake256;

use crate::crypto::HASH_LEN;
use crate::error::{Result, SsfError};

/// Which direction of a [`Signer`] a digest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Bytes returned by `read`.
    Read,
    /// Bytes accepted by `write`.
    Write,
}

#[derive(Default)]
struct Accumulator {
    hasher: Shake256,
    touched: bool,
}

impl Accumulator {
    fn feed(&mut self, data: &[u8]) {
        if !data.is_empty() {
            self.hasher.update(data);
            self.touched = true;
        }
    }
}

/// A pass-through stream that hashes what flows through it.
///
/// Each side is single-use: [`Signer::sum`] drains its accumulator, and a
/// drained side behaves like one that never saw data.
pub struct Signer<T> {
    inner: T,
    read_side: Option<Accumulator>,
    write_side: Option<Accumulator>,
}

impl<T> Signer<T> {
    /// Hash bytes read from `inner`.
    pub fn reader(inner: T) -> Self {
        Self {
            inner,
            read_side: Some(Accumulator::default()),
            write_side: None,
        }
    }

    /// Hash bytes written to `inner`.
    pub fn writer(inner: T) -> Self {
        Self {
            inner,
            read_side: None,
            write_side: Some(Accumulator::default()),
        }
    }

    /// Hash both directions of `inner` separately.
    pub fn duplex(inner: T) -> Self {
        Self {
            inner,
            read_side: Some(Accumulator::default()),
            write_side: Some(Accumulator::default()),
        }
    }

    /// Finalize the digest of one side.
    ///
    /// Fails with [`SsfError::NoDataSigned`] if that side is not tracked, has
    /// not seen a single byte, or was already finalized.
    pub fn sum(&mut self, side: Side) -> Result<[u8; HASH_LEN]> {
        let slot = match side {
            Side::Read => &mut self.read_side,
            Side::Write => &mut self.write_side,
        };
        match slot.take() {
            Some(acc) if acc.touched => {
                let mut out = [0u8; HASH_LEN];
                acc.hasher.finalize_xof_into(&mut out);
                Ok(out)
            }
            _ => Err(SsfError::NoDataSigned),
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Read for Signer<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(acc) = self.read_side.as_mut() {
            acc.feed(&buf[..n]);
        }
        Ok(n)
    }
}

impl<T: Write> Write for Signer<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if let Some(acc) = self.write_side.as_mut() {
            acc.feed(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<T> fmt::Debug for Signer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |side: &Option<Accumulator>| match side {
            None => "off",
            Some(acc) if acc.touched => "signed",
            Some(_) => "idle",
        };
        f.debug_struct("Signer")
            .field("read", &state(&self.read_side))
            .field("write", &state(&self.write_side))
            .finish()
    }
}
