pub mod builder;
pub mod iter;

pub use builder::{padding, EntityBuilder, PayloadOp, Sealed};
pub use iter::{EntityWalker, Flow, Payload, Visit};
