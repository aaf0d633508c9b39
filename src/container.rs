//! High-level seal operations: inspect, build an entity, extract an entity.
//!
//! ```no_run
//! use std::fs::File;
//! use seama::container::{self, BuildOptions, ExtractOptions, InspectOptions, PayloadOp};
//! use seama::skip::Seekable;
//!
//! // Build one entity from a kernel image padded out to 1 MiB.
//! let ops = [PayloadOp::AppendFile("vmlinux.bin".into()), PayloadOp::PadToOffset(0x10_0000)];
//! container::build_file("kernel.seama", &["dev=/dev/mtdblock/1"], &ops, &BuildOptions::default())?;
//!
//! // Inspect a full seal.
//! let report = container::inspect(Seekable::new(File::open("fw.seama")?), &InspectOptions::default())?;
//! report.write_text(&mut std::io::stdout())?;
//!
//! // Pull entity 1 out of it.
//! let mut out = File::create("entity1.bin")?;
//! container::extract(Seekable::new(File::open("fw.seama")?), &mut out, &ExtractOptions { index: 1 })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::OpenOptions;
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use log::{debug, info};
use serde::Serialize;

use crate::entity::{EntityBuilder, EntityWalker, Flow};
use crate::error::{Result, SeamaError};
use crate::header::{EntityHeader, SealHeader, SEAL_HEADER_SIZE};
use crate::meta;
use crate::skip::{copy_exact, read_full, Source};

pub use crate::entity::PayloadOp;

/// Metadata blocks at or above this size are refused by default.
pub const DEFAULT_META_CAPACITY: usize = 1024;
/// Larger than any `u16` metadata size; never rejects.
pub const MAX_META_CAPACITY: usize = 1 << 16;
/// Metadata strings are padded to this boundary by default.
pub const DEFAULT_ALIGNMENT: u32 = 4;

// ── Options ──────────────────────────────────────────────────────────────────

/// Configuration for [`inspect`].
#[derive(Debug, Clone)]
pub struct InspectOptions {
    /// Report only this entity (and not the seal itself).
    pub index:         Option<u32>,
    /// Metadata blocks of this many bytes or more are rejected.
    pub meta_capacity: usize,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self { index: None, meta_capacity: DEFAULT_META_CAPACITY }
    }
}

/// Configuration for [`build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub alignment: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { alignment: DEFAULT_ALIGNMENT }
    }
}

/// Configuration for [`extract`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub index: u32,
}

// ── Inspection report ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SealInfo {
    pub meta_size:  u16,
    pub image_size: u32,
    pub meta:       Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityInfo {
    pub index:      u32,
    pub offset:     u64,
    pub size:       u64,
    pub meta_size:  u16,
    pub image_size: u32,
    /// Stored MD5, lowercase hex.  Not verified.
    pub digest:     String,
    pub meta:       Vec<String>,
}

/// Everything [`inspect`] found.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    /// Entity filter the inspection ran with.
    pub index:    Option<u32>,
    pub seal:     SealInfo,
    pub entities: Vec<EntityInfo>,
}

impl Inspection {
    /// Render as the classic tab-separated listing.  The seal is only listed
    /// when no entity filter is set.
    pub fn write_text<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        if self.index.is_none() {
            writeln!(out, "Meta size:\t{}", self.seal.meta_size)?;
            writeln!(out, "Image size:\t{}", self.seal.image_size)?;
            for entry in &self.seal.meta {
                writeln!(out, "Meta entry:\t{entry}")?;
            }
        }
        for e in &self.entities {
            if self.index.is_none() {
                writeln!(out)?;
            }
            writeln!(out, "Entity offset:\t{}", e.offset)?;
            writeln!(out, "Entity size:\t{}", e.size)?;
            writeln!(out, "Meta size:\t{}", e.meta_size)?;
            writeln!(out, "Image size:\t{}", e.image_size)?;
            writeln!(out, "Entity digest:\t{}", e.digest)?;
            for entry in &e.meta {
                writeln!(out, "Meta entry:\t{entry}")?;
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ── Inspect ──────────────────────────────────────────────────────────────────

/// Read the seal header and metadata, then describe every entity (or only
/// `opts.index`).
pub fn inspect<S: Source>(mut source: S, opts: &InspectOptions) -> Result<Inspection> {
    let seal = SealHeader::read(&mut source)?;
    let meta_size = seal.meta_size as usize;
    if meta_size >= opts.meta_capacity {
        return Err(SeamaError::BufferTooSmall { capacity: opts.meta_capacity, requested: meta_size });
    }
    seal.validate()?;

    let mut block = vec![0u8; meta_size];
    let got = read_full(&mut source, &mut block)?;
    if got < meta_size {
        return Err(SeamaError::TruncatedStream { missing: (meta_size - got) as u64 });
    }
    let seal_info = SealInfo {
        meta_size:  seal.meta_size,
        image_size: seal.image_size,
        meta:       meta::decode(&block).map(|s| s.into_owned()).collect(),
    };

    let mut entities = Vec::new();
    let start = (SEAL_HEADER_SIZE + meta_size) as u64;
    let mut walker = EntityWalker::new(source, start, opts.meta_capacity).with_target(opts.index);
    let count = walker.walk(|v| {
        entities.push(EntityInfo {
            index:      v.index,
            offset:     v.offset,
            size:       v.header.total_size(),
            meta_size:  v.header.meta_size,
            image_size: v.header.image_size,
            digest:     hex::encode(v.header.digest),
            meta:       v.meta_entries().map(|s| s.into_owned()).collect(),
        });
        Ok(Flow::Continue)
    })?;
    info!("inspected seal with {count} entities");

    Ok(Inspection { index: opts.index, seal: seal_info, entities })
}

// ── Build ────────────────────────────────────────────────────────────────────

/// Write one complete entity at the current position of `dest`.
///
/// Metadata strings are written first (each padded to `opts.alignment`), then
/// `ops` are applied in order.  `dest` must be readable as well: the payload
/// is hashed back out of it before the header is patched.
pub fn build<W, T>(dest: W, meta: &[T], ops: &[PayloadOp], opts: &BuildOptions) -> Result<EntityHeader>
where
    W: Read + Write + Seek,
    T: AsRef<str>,
{
    let sealed = EntityBuilder::new(dest, opts.alignment)?
        .write_metadata(meta)?
        .write_payload(ops)?
        .seal()?;
    Ok(sealed.header)
}

/// [`build`] into a file at `path`, replacing whatever was there.
pub fn build_file<P, T>(path: P, meta: &[T], ops: &[PayloadOp], opts: &BuildOptions) -> Result<EntityHeader>
where
    P: AsRef<Path>,
    T: AsRef<str>,
{
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path.as_ref())?;
    let header = build(file, meta, ops, opts)?;
    info!("built {}: {} B", path.as_ref().display(), header.total_size());
    Ok(header)
}

// ── Extract ──────────────────────────────────────────────────────────────────

/// Copy entity `opts.index` (header, metadata and payload, byte for byte)
/// from `source` into `dest`.
pub fn extract<S, W>(mut source: S, dest: &mut W, opts: &ExtractOptions) -> Result<EntityHeader>
where
    S: Source,
    W: Write + ?Sized,
{
    let seal = SealHeader::read(&mut source)?;
    source.skip(seal.meta_size as u64)?;

    let start = (SEAL_HEADER_SIZE + seal.meta_size as usize) as u64;
    let mut walker = EntityWalker::new(source, start, MAX_META_CAPACITY).with_target(Some(opts.index));
    let mut found = None;
    let count = walker.walk(|v| {
        dest.write_all(&v.header.encode())?;
        dest.write_all(v.meta)?;
        copy_exact(&mut v.payload, &mut *dest, v.header.image_size as u64)?;
        debug!("extracted entity {} from offset {}", v.index, v.offset);
        found = Some(v.header);
        Ok(Flow::Stop)
    })?;
    dest.flush()?;

    found.ok_or(SeamaError::EntityNotFound { index: opts.index, count })
}
