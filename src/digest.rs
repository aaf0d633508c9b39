//! MD5 over an entity payload.

use std::io::Read;

use md5::{Digest, Md5};

use crate::error::{Result, SeamaError};
use crate::header::DIGEST_SIZE;
use crate::skip::{read_full, SCRATCH_SIZE};

/// Hash exactly `length` bytes from the current position of `source`.
///
/// Fails with [`SeamaError::TruncatedStream`] if fewer bytes are available;
/// a seal must never be closed over a digest of the wrong range.
pub fn digest_stream<R: Read + ?Sized>(source: &mut R, length: u64) -> Result<[u8; DIGEST_SIZE]> {
    let mut hasher = Md5::new();
    let mut buf = [0u8; SCRATCH_SIZE];
    let mut left = length;
    while left > 0 {
        let want = left.min(SCRATCH_SIZE as u64) as usize;
        let got = read_full(source, &mut buf[..want])?;
        hasher.update(&buf[..got]);
        left -= got as u64;
        if got < want {
            return Err(SeamaError::TruncatedStream { missing: left });
        }
    }
    Ok(hasher.finalize().into())
}

/// Digest of an in-memory payload.
pub fn digest_bytes(payload: &[u8]) -> [u8; DIGEST_SIZE] {
    Md5::digest(payload).into()
}
