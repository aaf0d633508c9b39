//! Advancing and copying through an input stream.
//!
//! A seal can come from a regular file, where skipping an unwanted entity is a
//! single relative seek, or from a pipe, where the only way forward is to read
//! the bytes and drop them.  [`Skip`] hides that difference from the entity
//! walker; which implementation is used depends only on the wrapper the caller
//! puts around its stream.

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::{trace, warn};

use crate::error::{Result, SeamaError};

/// Scratch buffer size for read-and-discard and bounded copies.
pub const SCRATCH_SIZE: usize = 1024;

/// Move a stream's read position forward without returning the data.
pub trait Skip {
    /// Advance by exactly `length` bytes.  Fails with
    /// [`SeamaError::TruncatedStream`] if the stream ends first.
    fn skip(&mut self, length: u64) -> Result<()>;
}

/// A readable stream that can also be skipped through.  This is what the
/// entity walker and the flows in [`crate::container`] consume.
pub trait Source: Read + Skip {}

impl<T: Read + Skip + ?Sized> Source for T {}

impl<S: Skip + ?Sized> Skip for &mut S {
    fn skip(&mut self, length: u64) -> Result<()> {
        (**self).skip(length)
    }
}

impl<S: Skip + ?Sized> Skip for Box<S> {
    fn skip(&mut self, length: u64) -> Result<()> {
        (**self).skip(length)
    }
}

// ── Seekable ─────────────────────────────────────────────────────────────────

/// Random-access input.  Skips with a relative seek and falls back to
/// read-and-discard if the seek is refused (a FIFO opened by path, say).
///
/// Seeking past the end succeeds on most streams, so the stream length is
/// looked up on the first skip and every seek is bounded by it.  A skip that
/// would land beyond the end stops there and reports the shortfall, exactly as
/// the discard path does.
#[derive(Debug)]
pub struct Seekable<R> {
    inner: R,
    end:   Option<u64>,
}

impl<R: Read + Seek> Seekable<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, end: None }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Seek forward by at most `length` bytes without passing the end of the
    /// stream.  Returns how many bytes were missing.
    fn seek_bounded(&mut self, length: u64) -> io::Result<u64> {
        let pos = self.inner.stream_position()?;
        let end = match self.end {
            Some(end) => end,
            None => {
                let end = self.inner.seek(SeekFrom::End(0))?;
                self.inner.seek(SeekFrom::Start(pos))?;
                self.end = Some(end);
                end
            }
        };
        let step = length.min(end.saturating_sub(pos));
        self.inner.seek(SeekFrom::Start(pos + step))?;
        Ok(length - step)
    }
}

impl<R: Read + Seek> Read for Seekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Seek> Skip for Seekable<R> {
    fn skip(&mut self, length: u64) -> Result<()> {
        match self.seek_bounded(length) {
            Ok(0) => {
                trace!("seeked forward {length} B");
                Ok(())
            }
            Ok(missing) => Err(SeamaError::TruncatedStream { missing }),
            Err(e) => {
                warn!("seek failed ({e}), discarding {length} B instead");
                discard(&mut self.inner, length)
            }
        }
    }
}

// ── Sequential ───────────────────────────────────────────────────────────────

/// Forward-only input such as standard input.
#[derive(Debug)]
pub struct Sequential<R> {
    inner: R,
}

impl<R: Read> Sequential<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> Skip for Sequential<R> {
    fn skip(&mut self, length: u64) -> Result<()> {
        discard(&mut self.inner, length)
    }
}

// ── Primitives ───────────────────────────────────────────────────────────────

/// Read and drop `length` bytes through a bounded scratch buffer.
pub fn discard<R: Read + ?Sized>(reader: &mut R, length: u64) -> Result<()> {
    let mut buf = [0u8; SCRATCH_SIZE];
    let mut left = length;
    while left > 0 {
        let want = left.min(SCRATCH_SIZE as u64) as usize;
        let got = read_some(reader, &mut buf[..want])?;
        if got == 0 {
            return Err(SeamaError::TruncatedStream { missing: left });
        }
        left -= got as u64;
    }
    trace!("discarded {length} B");
    Ok(())
}

/// Copy exactly `length` bytes from `reader` to `writer`.
pub fn copy_exact<R, W>(reader: &mut R, writer: &mut W, length: u64) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; SCRATCH_SIZE];
    let mut left = length;
    while left > 0 {
        let want = left.min(SCRATCH_SIZE as u64) as usize;
        let got = read_some(reader, &mut buf[..want])?;
        if got == 0 {
            return Err(SeamaError::TruncatedStream { missing: left });
        }
        writer.write_all(&buf[..got])?;
        left -= got as u64;
    }
    Ok(())
}

/// Fill as much of `buf` as the stream allows.  Returns the byte count, which
/// is short only at end of stream.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match read_some(reader, &mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn read_some<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
