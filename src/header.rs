//! Fixed-layout Seal and Entity headers.
//!
//! ```text
//! Seal header (12 B)               Entity header (28 B)
//! ┌──────────────┐ 0               ┌──────────────┐ 0
//! │ magic   u32  │                 │ magic   u32  │
//! │ reserved u16 │ 4               │ reserved u16 │ 4
//! │ meta_size u16│ 6               │ meta_size u16│ 6
//! │ image_size u32 8               │ image_size u32 8
//! └──────────────┘ 12              │ digest [16]  │ 12
//!                                  └──────────────┘ 28
//! ```
//!
//! All integers are big-endian and fields are packed without padding.

use std::io::{Read, Write};

use crate::error::{Result, SeamaError};
use crate::skip::read_full;
use crate::wire::{decode_u16, decode_u32, encode_u16, encode_u32};

/// Sentinel carried by every header, seal and entity alike.
pub const SEAMA_MAGIC: u32 = 0x5ea3_a417;
pub const SEAL_HEADER_SIZE: usize = 12;
pub const ENTITY_HEADER_SIZE: usize = 28;
pub const DIGEST_SIZE: usize = 16;

/// Fields shared by both header kinds, decoded from the first 12 bytes.
///
/// The magic is checked as soon as four bytes are present, so foreign data is
/// reported as such even when it is also too short.
fn decode_common(bytes: &[u8], expected: usize) -> Result<(u16, u16, u32)> {
    if let Some(magic) = bytes.get(..4) {
        let magic = decode_u32([magic[0], magic[1], magic[2], magic[3]]);
        if magic != SEAMA_MAGIC {
            return Err(SeamaError::BadMagic { found: magic });
        }
    }
    if bytes.len() < expected {
        return Err(SeamaError::MalformedHeader { expected, found: bytes.len() });
    }
    let reserved   = decode_u16([bytes[4], bytes[5]]);
    let meta_size  = decode_u16([bytes[6], bytes[7]]);
    let image_size = decode_u32([bytes[8], bytes[9], bytes[10], bytes[11]]);
    Ok((reserved, meta_size, image_size))
}

fn encode_common(buf: &mut [u8], reserved: u16, meta_size: u16, image_size: u32) {
    buf[0..4].copy_from_slice(&encode_u32(SEAMA_MAGIC));
    buf[4..6].copy_from_slice(&encode_u16(reserved));
    buf[6..8].copy_from_slice(&encode_u16(meta_size));
    buf[8..12].copy_from_slice(&encode_u32(image_size));
}

// ── Seal ─────────────────────────────────────────────────────────────────────

/// Container-level header.  Carries metadata only; `image_size` must be 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealHeader {
    pub reserved:   u16,
    pub meta_size:  u16,
    pub image_size: u32,
}

impl SealHeader {
    pub fn new(meta_size: u16) -> Self {
        Self { reserved: 0, meta_size, image_size: 0 }
    }

    pub fn encode(&self) -> [u8; SEAL_HEADER_SIZE] {
        let mut buf = [0u8; SEAL_HEADER_SIZE];
        encode_common(&mut buf, self.reserved, self.meta_size, self.image_size);
        buf
    }

    /// Decode from the front of `bytes`.  Does not validate `image_size`;
    /// see [`SealHeader::validate`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (reserved, meta_size, image_size) = decode_common(bytes, SEAL_HEADER_SIZE)?;
        Ok(Self { reserved, meta_size, image_size })
    }

    /// A seal never carries a payload of its own.
    pub fn validate(&self) -> Result<()> {
        if self.image_size != 0 {
            return Err(SeamaError::InvalidSealImageSize(self.image_size));
        }
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; SEAL_HEADER_SIZE];
        let got = read_full(reader, &mut buf)?;
        Self::decode(&buf[..got])
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }
}

// ── Entity ───────────────────────────────────────────────────────────────────

/// Per-entry header.  `digest` is the MD5 of the `image_size` payload bytes
/// that follow the metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityHeader {
    pub reserved:   u16,
    pub meta_size:  u16,
    pub image_size: u32,
    pub digest:     [u8; DIGEST_SIZE],
}

impl EntityHeader {
    pub fn new(meta_size: u16, image_size: u32, digest: [u8; DIGEST_SIZE]) -> Self {
        Self { reserved: 0, meta_size, image_size, digest }
    }

    /// Bytes following the header that belong to this entity.
    pub fn body_size(&self) -> u64 {
        self.meta_size as u64 + self.image_size as u64
    }

    /// Header plus metadata plus payload.
    pub fn total_size(&self) -> u64 {
        ENTITY_HEADER_SIZE as u64 + self.body_size()
    }

    pub fn encode(&self) -> [u8; ENTITY_HEADER_SIZE] {
        let mut buf = [0u8; ENTITY_HEADER_SIZE];
        encode_common(&mut buf, self.reserved, self.meta_size, self.image_size);
        buf[12..].copy_from_slice(&self.digest);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (reserved, meta_size, image_size) = decode_common(bytes, ENTITY_HEADER_SIZE)?;
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&bytes[12..ENTITY_HEADER_SIZE]);
        Ok(Self { reserved, meta_size, image_size, digest })
    }

    /// Read the next header from an entity stream.
    ///
    /// `Ok(None)` means the stream ended cleanly on a header boundary.  A
    /// partial header is [`SeamaError::MalformedHeader`].
    pub fn read_next<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut buf = [0u8; ENTITY_HEADER_SIZE];
        match read_full(reader, &mut buf)? {
            0 => Ok(None),
            n => Self::decode(&buf[..n]).map(Some),
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }
}
