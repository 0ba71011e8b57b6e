//! AMQP frames and the length prefixed frame codec

pub mod amqp;
mod error;

pub use error::Error;

/// Frame type of AMQP frames
pub const FRAME_TYPE_AMQP: u8 = 0x00;

/// Size of the fixed frame header: size, doff, type and channel
pub const FRAME_HEADER_SIZE: usize = 8;
