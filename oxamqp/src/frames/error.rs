use std::io;

use oxamqp_types::definitions::{self, AmqpError, ConnectionError};

/// Errors of the frame layer. All of them are fatal to the connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO Error {0:?}")]
    Io(#[from] io::Error),

    #[error("Decode Error: {0}")]
    Decode(#[from] oxamqp_codec::Error),

    #[error("Encode Error: {0}")]
    Encode(oxamqp_codec::Error),

    #[error("Framing error: frame size {0} is smaller than the frame header")]
    InvalidFrameSize(u32),

    #[error("Framing error: invalid data offset {0}")]
    InvalidDataOffset(u8),

    #[error("Framing error: unsupported frame type 0x{0:02x}")]
    UnsupportedFrameType(u8),

    #[error("Framing error: frame of {size} bytes exceeds max frame size {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Framing error: stream ended with {buffered} bytes of an incomplete frame")]
    Truncated { buffered: usize },

    #[error("Performative of {required} bytes does not fit in max frame size {max}")]
    FrameSizeTooSmall { required: usize, max: usize },
}

impl Error {
    /// The condition reported to the peer and to the application
    pub fn condition(&self) -> definitions::Error {
        let description = Some(self.to_string());
        match self {
            Error::Io(_) | Error::Encode(_) => {
                definitions::Error::new(AmqpError::InternalError, description, None)
            }
            Error::Decode(_) => definitions::Error::new(AmqpError::DecodeError, description, None),
            Error::FrameSizeTooSmall { .. } => {
                definitions::Error::new(AmqpError::FrameSizeTooSmall, description, None)
            }
            _ => definitions::Error::new(ConnectionError::FramingError, description, None),
        }
    }
}
