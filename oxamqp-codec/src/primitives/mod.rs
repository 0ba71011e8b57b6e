//! Primitive types that have no direct counterpart in the standard library

mod array;
mod decimal;
mod map;
mod symbol;
mod timestamp;
mod uuid;

pub use array::*;
pub use decimal::*;
pub use map::*;
pub use symbol::*;
pub use timestamp::*;
pub use uuid::*;

/// A sequence of octets
///
/// encoding name = "vbin8", encoding code = 0xa0
/// encoding name = "vbin32", encoding code = 0xb0
pub type Binary = serde_bytes::ByteBuf;
