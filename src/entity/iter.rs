//! Walking the entity stream that follows a seal's metadata.
//!
//! There is no entity count anywhere in the format.  The walker reads one
//! header at a time, and a clean end of stream on a header boundary is the
//! only normal way out.  A bad magic or a partial header stops everything,
//! since header sizes are the only way to find the next entity.
//!
//! Entities that are not selected are skipped without reading their metadata
//! or payload.  Selected ones have their metadata materialized and are handed
//! to the visitor with the stream positioned at the first payload byte.

use std::io::{self, Read};

use log::{debug, trace};

use crate::error::{Result, SeamaError};
use crate::header::{EntityHeader, ENTITY_HEADER_SIZE};
use crate::meta::{self, MetaEntries};
use crate::skip::{read_full, Source};

/// What the visitor wants the walker to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Skip whatever payload is left unread and move to the next entity.
    Continue,
    /// Stop the walk right here, leaving the stream where it is.
    Stop,
}

/// Payload of the entity being visited, bounded to its `image_size`.
pub struct Payload<'a, S: ?Sized> {
    inner:     &'a mut S,
    remaining: u64,
}

impl<S: ?Sized> Payload<'_, S> {
    /// Payload bytes not yet read by the visitor.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<S: Read + ?Sized> Read for Payload<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let max = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// One selected entity, as seen by the visitor.
pub struct Visit<'a, S: ?Sized> {
    pub index:   u32,
    /// Absolute offset of the entity header within the source.
    pub offset:  u64,
    pub header:  EntityHeader,
    /// Raw metadata block, exactly `header.meta_size` bytes.
    pub meta:    &'a [u8],
    pub payload: Payload<'a, S>,
}

impl<'a, S: ?Sized> Visit<'a, S> {
    pub fn meta_entries(&self) -> MetaEntries<'a> {
        meta::decode(self.meta)
    }
}

/// Drives a visitor over the entities of a stream.
pub struct EntityWalker<S> {
    source:        S,
    position:      u64,
    index:         u32,
    target:        Option<u32>,
    meta_capacity: usize,
}

impl<S: Source> EntityWalker<S> {
    /// `position` is the absolute offset of the first entity header; it is
    /// only used to report offsets.
    pub fn new(source: S, position: u64, meta_capacity: usize) -> Self {
        Self { source, position, index: 0, target: None, meta_capacity }
    }

    /// Only visit entity `target`; every other one is skipped unread.
    pub fn with_target(mut self, target: Option<u32>) -> Self {
        self.target = target;
        self
    }

    /// Index of the next entity header to be read.  After a complete walk
    /// this is the number of entities in the stream.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Visit entities until the stream ends, the visitor says [`Flow::Stop`],
    /// or an error occurs.  Returns the number of entity headers read.
    pub fn walk<F>(&mut self, mut visit: F) -> Result<u32>
    where
        F: FnMut(&mut Visit<'_, S>) -> Result<Flow>,
    {
        let mut meta_buf = Vec::new();

        while let Some(header) = EntityHeader::read_next(&mut self.source)? {
            let offset = self.position;
            self.position += ENTITY_HEADER_SIZE as u64;

            if self.target.is_some_and(|t| t != self.index) {
                debug!("skipping entity {} at {offset} ({} B)", self.index, header.body_size());
                self.source.skip(header.body_size())?;
                self.position += header.body_size();
                self.index += 1;
                continue;
            }

            let meta_size = header.meta_size as usize;
            if meta_size >= self.meta_capacity {
                return Err(SeamaError::BufferTooSmall {
                    capacity:  self.meta_capacity,
                    requested: meta_size,
                });
            }
            meta_buf.resize(meta_size, 0);
            let got = read_full(&mut self.source, &mut meta_buf)?;
            if got < meta_size {
                return Err(SeamaError::TruncatedStream { missing: (meta_size - got) as u64 });
            }
            self.position += meta_size as u64;

            debug!("visiting entity {} at {offset}", self.index);
            let mut entry = Visit {
                index: self.index,
                offset,
                header,
                meta: &meta_buf,
                payload: Payload { inner: &mut self.source, remaining: header.image_size as u64 },
            };
            let flow = visit(&mut entry)?;
            let remaining = entry.payload.remaining();

            self.position += header.image_size as u64 - remaining;
            self.index += 1;

            if flow == Flow::Stop {
                return Ok(self.index);
            }
            if remaining > 0 {
                trace!("skipping {remaining} unread payload bytes");
                self.source.skip(remaining)?;
                self.position += remaining;
            }
        }

        Ok(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SEAMA_MAGIC;
    use crate::skip::{Seekable, Sequential};
    use std::io::Cursor;

    fn entity(meta: &[&str], payload: &[u8]) -> Vec<u8> {
        let block = meta::encode(meta);
        let hdr = EntityHeader::new(block.len() as u16, payload.len() as u32, [0; 16]);
        let mut out = hdr.encode().to_vec();
        out.extend(block);
        out.extend_from_slice(payload);
        out
    }

    fn stream() -> Vec<u8> {
        let mut out = entity(&["a=1"], b"first");
        out.extend(entity(&["b=2", "c=3"], b"second payload"));
        out.extend(entity(&[], b""));
        out
    }

    #[test]
    fn visits_every_entity_in_order() {
        let data = stream();
        let mut walker = EntityWalker::new(Seekable::new(Cursor::new(&data)), 0, 1024);
        let mut seen = Vec::new();
        let count = walker
            .walk(|v| {
                seen.push((v.index, v.offset, v.meta_entries().map(|s| s.into_owned()).collect::<Vec<_>>()));
                Ok(Flow::Continue)
            })
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(seen[0], (0, 0, vec!["a=1".to_owned()]));
        assert_eq!(seen[1], (1, 28 + 4 + 5, vec!["b=2".to_owned(), "c=3".to_owned()]));
        assert_eq!(seen[2].2, Vec::<String>::new());
        assert_eq!(walker.position(), data.len() as u64);
    }

    #[test]
    fn target_skips_others_on_sequential_input() {
        let data = stream();
        let mut walker = EntityWalker::new(Sequential::new(Cursor::new(&data)), 100, 1024).with_target(Some(1));
        let mut payload = Vec::new();
        let mut hits = 0;
        walker
            .walk(|v| {
                hits += 1;
                assert_eq!(v.index, 1);
                assert_eq!(v.offset, 100 + 37);
                v.payload.read_to_end(&mut payload)?;
                Ok(Flow::Continue)
            })
            .unwrap();
        assert_eq!(hits, 1);
        assert_eq!(payload, b"second payload");
        assert_eq!(walker.index(), 3);
    }

    #[test]
    fn stop_leaves_stream_after_consumed_bytes() {
        let data = stream();
        let mut walker = EntityWalker::new(Sequential::new(Cursor::new(&data)), 0, 1024);
        walker
            .walk(|v| {
                let mut b = [0u8; 2];
                v.payload.read_exact(&mut b)?;
                Ok(Flow::Stop)
            })
            .unwrap();
        let mut rest = Vec::new();
        walker.into_inner().read_to_end(&mut rest).unwrap();
        assert_eq!(&rest[..3], b"rst");
    }

    #[test]
    fn bad_magic_mid_stream_aborts() {
        let mut data = stream();
        data[37] ^= 0xff;
        let mut walker = EntityWalker::new(Seekable::new(Cursor::new(&data)), 0, 1024);
        let mut visited = 0;
        let err = walker.walk(|_| {
            visited += 1;
            Ok(Flow::Continue)
        });
        assert_eq!(visited, 1);
        match err {
            Err(SeamaError::BadMagic { found }) => assert_eq!(found, SEAMA_MAGIC ^ 0xff00_0000),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn partial_trailing_header_is_malformed() {
        let mut data = stream();
        data.extend_from_slice(&EntityHeader::default().encode()[..10]);
        let mut walker = EntityWalker::new(Seekable::new(Cursor::new(&data)), 0, 1024);
        assert!(matches!(
            walker.walk(|_| Ok(Flow::Continue)),
            Err(SeamaError::MalformedHeader { expected: 28, found: 10 })
        ));
    }

    #[test]
    fn oversized_meta_is_rejected_before_reading() {
        let data = entity(&["0123456789abcdef"], b"x");
        let mut walker = EntityWalker::new(Seekable::new(Cursor::new(&data)), 0, 17);
        assert!(matches!(
            walker.walk(|_| Ok(Flow::Continue)),
            Err(SeamaError::BufferTooSmall { capacity: 17, requested: 17 })
        ));
    }

    #[test]
    fn unselected_oversized_meta_is_not_checked() {
        let mut data = entity(&["0123456789abcdef"], b"x");
        data.extend(entity(&["ok"], b"y"));
        let mut walker = EntityWalker::new(Seekable::new(Cursor::new(&data)), 0, 8).with_target(Some(1));
        assert_eq!(walker.walk(|_| Ok(Flow::Continue)).unwrap(), 2);
    }

    #[test]
    fn truncated_payload_on_pipe_is_an_error() {
        let mut data = stream();
        data.truncate(data.len() - ENTITY_HEADER_SIZE - 10);
        let mut walker = EntityWalker::new(Sequential::new(Cursor::new(&data)), 0, 1024);
        assert!(matches!(walker.walk(|_| Ok(Flow::Continue)), Err(SeamaError::TruncatedStream { .. })));
    }

    #[test]
    fn truncated_payload_on_file_is_an_error() {
        let mut data = stream();
        data.truncate(data.len() - ENTITY_HEADER_SIZE - 10);

        let mut seek = EntityWalker::new(Seekable::new(Cursor::new(&data)), 0, 1024);
        let mut pipe = EntityWalker::new(Sequential::new(Cursor::new(&data)), 0, 1024);
        for result in [seek.walk(|_| Ok(Flow::Continue)), pipe.walk(|_| Ok(Flow::Continue))] {
            assert!(matches!(result, Err(SeamaError::TruncatedStream { missing: 10 })));
        }
    }

    #[test]
    fn truncated_unselected_entity_on_file_is_an_error() {
        let mut data = entity(&["a"], &[7; 500]);
        data.truncate(data.len() - 400);
        let mut walker = EntityWalker::new(Seekable::new(Cursor::new(&data)), 0, 1024).with_target(Some(1));
        assert!(matches!(
            walker.walk(|_| Ok(Flow::Continue)),
            Err(SeamaError::TruncatedStream { missing: 400 })
        ));
    }
}
