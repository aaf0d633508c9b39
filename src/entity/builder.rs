//! Assembling a single entity.
//!
//! The header comes first on disk but its sizes and digest are only known once
//! the payload is down, so the builder writes a zeroed placeholder, streams
//! metadata and payload after it, hashes the payload back out of the
//! destination, and finally patches the header in place.
//!
//! The steps are encoded as a typestate so they can only run in order:
//!
//! ```text
//! Placeholder ─write_metadata─▶ MetadataWritten ─write_payload─▶ PayloadWritten ─seal─▶ Sealed
//! ```

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use log::debug;

use crate::digest::digest_stream;
use crate::error::{Result, SeamaError};
use crate::header::{EntityHeader, ENTITY_HEADER_SIZE};

/// One payload-producing step, applied in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadOp {
    /// Append the whole contents of a file.
    AppendFile(PathBuf),
    /// Append bytes held in memory.
    AppendBytes(Vec<u8>),
    /// Append zeros until the entity is this many bytes long, header included.
    PadToOffset(u64),
}

/// Zero bytes needed to bring `offset` up to a multiple of `alignment`.
pub fn padding(offset: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return 0;
    }
    (alignment - offset % alignment) % alignment
}

// ── States ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Placeholder;
#[derive(Debug)]
pub struct MetadataWritten;
#[derive(Debug)]
pub struct PayloadWritten;

/// An entity under construction in `writer`.
///
/// Offsets are measured from the position the writer had when the builder was
/// created, so the entity may be written into the middle of a larger stream.
#[derive(Debug)]
pub struct EntityBuilder<W, S> {
    writer:     W,
    start:      u64,
    offset:     u64,
    meta_size:  u64,
    image_size: u64,
    alignment:  u64,
    _state:     PhantomData<S>,
}

impl<W, S> EntityBuilder<W, S> {
    /// Bytes written so far, header placeholder included.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn into_state<T>(self) -> EntityBuilder<W, T> {
        EntityBuilder {
            writer:     self.writer,
            start:      self.start,
            offset:     self.offset,
            meta_size:  self.meta_size,
            image_size: self.image_size,
            alignment:  self.alignment,
            _state:     PhantomData,
        }
    }
}

impl<W: Write + Seek, S> EntityBuilder<W, S> {
    fn write_zeros(&mut self, length: u64) -> Result<u64> {
        let written = io::copy(&mut io::repeat(0).take(length), &mut self.writer)?;
        self.offset += written;
        Ok(written)
    }
}

impl<W: Write + Seek> EntityBuilder<W, Placeholder> {
    /// Reserve the header at the writer's current position.  Each metadata
    /// string is followed by zero padding up to `alignment`; 0 or 1 disables
    /// padding.
    pub fn new(mut writer: W, alignment: u32) -> Result<Self> {
        let start = writer.stream_position()?;
        writer.write_all(&[0u8; ENTITY_HEADER_SIZE])?;
        Ok(Self {
            writer,
            start,
            offset:     ENTITY_HEADER_SIZE as u64,
            meta_size:  0,
            image_size: 0,
            alignment:  alignment as u64,
            _state:     PhantomData,
        })
    }

    pub fn write_metadata<I, T>(mut self, strings: I) -> Result<EntityBuilder<W, MetadataWritten>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for s in strings {
            let s = s.as_ref();
            self.writer.write_all(s.as_bytes())?;
            self.writer.write_all(&[0])?;
            let mut written = s.len() as u64 + 1;
            self.offset += written;
            written += self.write_zeros(padding(self.offset, self.alignment))?;
            self.meta_size += written;
        }
        if self.meta_size > u16::MAX as u64 {
            return Err(SeamaError::FieldOverflow { field: "meta_size", size: self.meta_size });
        }
        debug!("metadata block is {} B", self.meta_size);
        Ok(self.into_state())
    }
}

impl<W: Write + Seek> EntityBuilder<W, MetadataWritten> {
    /// Apply one payload step and return the number of bytes it appended.
    pub fn apply(&mut self, op: &PayloadOp) -> Result<u64> {
        let written = match op {
            PayloadOp::AppendFile(path) => {
                let mut file = File::open(path)?;
                let n = io::copy(&mut file, &mut self.writer)?;
                debug!("appended {n} B from {}", path.display());
                self.offset += n;
                n
            }
            PayloadOp::AppendBytes(bytes) => {
                self.writer.write_all(bytes)?;
                self.offset += bytes.len() as u64;
                bytes.len() as u64
            }
            PayloadOp::PadToOffset(target) => {
                if *target < self.offset {
                    return Err(SeamaError::InvalidOffset { current: self.offset, target: *target });
                }
                self.write_zeros(target - self.offset)?
            }
        };
        self.image_size += written;
        Ok(written)
    }

    pub fn write_payload<'a, I>(mut self, ops: I) -> Result<EntityBuilder<W, PayloadWritten>>
    where
        I: IntoIterator<Item = &'a PayloadOp>,
    {
        for op in ops {
            self.apply(op)?;
        }
        if self.image_size > u32::MAX as u64 {
            return Err(SeamaError::FieldOverflow { field: "image_size", size: self.image_size });
        }
        Ok(self.into_state())
    }
}

impl<W: Read + Write + Seek> EntityBuilder<W, PayloadWritten> {
    /// Hash the payload back out of the writer and patch the header.  The
    /// writer is left positioned just past the entity.
    pub fn seal(mut self) -> Result<Sealed<W>> {
        let payload_start = self.start + ENTITY_HEADER_SIZE as u64 + self.meta_size;
        self.writer.seek(SeekFrom::Start(payload_start))?;
        let digest = digest_stream(&mut self.writer, self.image_size)?;

        let header = EntityHeader::new(self.meta_size as u16, self.image_size as u32, digest);
        self.writer.seek(SeekFrom::Start(self.start))?;
        header.write(&mut self.writer)?;
        self.writer.seek(SeekFrom::Start(self.start + self.offset))?;
        self.writer.flush()?;

        debug!("sealed entity: meta {} B, image {} B, md5 {}", self.meta_size, self.image_size, hex::encode(digest));
        Ok(Sealed { header, writer: self.writer })
    }
}

/// A finished entity.
#[derive(Debug)]
pub struct Sealed<W> {
    pub header: EntityHeader,
    writer:     W,
}

impl<W> Sealed<W> {
    pub fn into_inner(self) -> W {
        self.writer
    }
}
