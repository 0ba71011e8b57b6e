//! Custom error

use std::fmt::Display;

use serde::{de, ser};

/// Encoding and decoding errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Custom error message raised by a `Serialize` or `Deserialize` impl
    #[error("Message {0}")]
    Message(String),

    /// IO error
    #[error("IO {0}")]
    Io(#[from] std::io::Error),

    /// The caller supplied buffer cannot hold the encoded value. Nothing has
    /// been written and the caller may retry with a larger buffer.
    #[error("Buffer overflow: {required} bytes required, {available} available")]
    Overflow {
        /// Number of bytes the encoded value needs
        required: usize,
        /// Number of bytes the buffer provided
        available: usize,
    },

    /// The encoded value would not fit even in a buffer of the configured
    /// maximum size
    #[error("Encoded value of {required} bytes exceeds buffer limit of {limit} bytes")]
    BufferLimitExceeded {
        /// Number of bytes the encoded value needs
        required: usize,
        /// The largest buffer the caller allows
        limit: usize,
    },

    /// Invalid format code
    #[error("Invalid format code 0x{0:02x}")]
    InvalidFormatCode(u8),

    /// The input ended in the middle of a value
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// Found invalid UTF-8 encoding
    #[error("Invalid UTF-8 encoding")]
    InvalidUtf8Encoding,

    /// Length or count field is inconsistent with the remaining input
    #[error("Invalid length")]
    InvalidLength,

    /// Described types, lists, maps and arrays are nested deeper than
    /// [`MAX_NESTING_DEPTH`](crate::de::MAX_NESTING_DEPTH)
    #[error("Nesting depth exceeds {0}")]
    NestingTooDeep(usize),

    /// Array elements do not share one constructor
    #[error("Array elements must share the same type")]
    HeterogeneousArray,

    /// A value was decoded but it is not what the caller expected
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl Error {
    pub(crate) fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    pub(crate) fn too_long() -> Self {
        Self::Message(String::from("Too long"))
    }

    /// Whether this error only indicates that the output buffer is too small
    pub fn is_overflow(&self) -> bool {
        matches!(self, Error::Overflow { .. })
    }
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Message(msg.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}
