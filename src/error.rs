use std::io;
use thiserror::Error;

/// Every way a seal can be rejected or an operation on it can fail.
///
/// All variants are fatal to the operation that raised them; nothing here is
/// retried.  A destination that was being written when the error surfaced is
/// left as-is and must be treated as garbage.
#[derive(Error, Debug)]
pub enum SeamaError {
    /// The sentinel did not match: the bytes do not belong to this format.
    #[error("Invalid Seama magic: 0x{found:08x}")]
    BadMagic { found: u32 },

    /// Fewer bytes were available than the fixed header width.
    #[error("Malformed header: expected {expected} B, got {found} B")]
    MalformedHeader { expected: usize, found: usize },

    /// A declared-length region ended early.
    #[error("Truncated stream: {missing} B missing")]
    TruncatedStream { missing: u64 },

    #[error("Too small buffer ({capacity} B) to read all meta info ({requested} B)")]
    BufferTooSmall { capacity: usize, requested: usize },

    #[error("Invalid Seama image size: 0x{0:08x} (should be 0)")]
    InvalidSealImageSize(u32),

    #[error("Entity {index} not found ({count} entities in seal)")]
    EntityNotFound { index: u32, count: u32 },

    #[error("Current Seama entity length is 0x{current:x}, can't pad it with zeros to 0x{target:x}")]
    InvalidOffset { current: u64, target: u64 },

    /// A built entity outgrew the width of its header field.
    #[error("{field} of {size} B does not fit the header field")]
    FieldOverflow { field: &'static str, size: u64 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = SeamaError> = std::result::Result<T, E>;
