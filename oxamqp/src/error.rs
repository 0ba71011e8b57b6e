use std::io;

use oxamqp_types::definitions::{self, AmqpError, ErrorCondition};

use crate::{frames, link::SendError, transport::NegotiationError};

/// Errors of the protocol engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO Error {0:?}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Frame(#[from] frames::Error),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("Invalid url: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Channel max reached")]
    ChannelMaxReached,

    #[error("Handle max reached")]
    HandleMaxReached,

    #[error("Unknown session")]
    UnknownSession,

    /// A condition raised by the local endpoint
    #[error("Local error: {0}")]
    Local(definitions::Error),

    /// A condition reported by the peer
    #[error("Remote error: {0}")]
    Remote(definitions::Error),
}

impl Error {
    pub(crate) fn amqp_error(
        condition: impl Into<ErrorCondition>,
        description: impl Into<Option<String>>,
    ) -> Self {
        Self::Local(definitions::Error::new(condition, description.into(), None))
    }

    pub(crate) fn illegal_state(description: impl Into<String>) -> Self {
        Self::amqp_error(AmqpError::IllegalState, Some(description.into()))
    }

    /// The AMQP error sent to the peer when this error closes the connection
    pub fn condition(&self) -> definitions::Error {
        match self {
            Error::Local(err) | Error::Remote(err) => err.clone(),
            Error::Frame(err) => err.condition(),
            Error::Negotiation(err) => err.condition(),
            Error::ChannelMaxReached | Error::HandleMaxReached => definitions::Error::new(
                AmqpError::ResourceLimitExceeded,
                Some(self.to_string()),
                None,
            ),
            Error::UnknownSession => {
                definitions::Error::new(AmqpError::NotFound, Some(self.to_string()), None)
            }
            _ => definitions::Error::new(AmqpError::InternalError, Some(self.to_string()), None),
        }
    }
}
