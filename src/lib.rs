//! Seama sealed firmware containers.
//!
//! A seal is a 12-byte header and a metadata block, followed by any number of
//! entities.  Each entity carries its own 28-byte header (with an MD5 of its
//! payload), a metadata block and the payload itself:
//!
//! ```text
//! [Seal hdr][seal meta][Entity 0 hdr][meta][payload][Entity 1 hdr][meta][payload]...
//! ```
//!
//! [`container`] holds the three operations most callers want: listing a
//! seal, building one entity, and extracting one entity.

pub mod container;
pub mod digest;
pub mod entity;
pub mod error;
pub mod header;
pub mod meta;
pub mod skip;
pub mod wire;

pub use container::{BuildOptions, EntityInfo, ExtractOptions, InspectOptions, Inspection, SealInfo};
pub use entity::{EntityBuilder, EntityWalker, PayloadOp};
pub use error::SeamaError;
pub use header::{EntityHeader, SealHeader, SEAMA_MAGIC};
pub use skip::{Seekable, Sequential, Skip, Source};
