use std::io;

use oxamqp_types::definitions::{self, AmqpError};

/// Protocol header negotiation errors
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("IO Error {0:?}")]
    Io(#[from] io::Error),

    #[error("Protocol header mismatch. Found {0:?}")]
    ProtocolHeaderMismatch([u8; 8]),
}

impl NegotiationError {
    /// The condition reported to the application
    pub fn condition(&self) -> definitions::Error {
        definitions::Error::new(AmqpError::NotImplemented, Some(self.to_string()), None)
    }
}
