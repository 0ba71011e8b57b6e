use oxamqp_types::definitions::DeliveryTag;

use crate::frames;

/// Errors returned when a message cannot be sent. None of them change the
/// state of the link.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Illegal local state: {0}")]
    IllegalState(&'static str),

    #[error("Insufficient link credit")]
    InsufficientCredit,

    #[error("Delivery tag {0:?} is in use by an unsettled delivery")]
    DuplicateDeliveryTag(DeliveryTag),

    #[error("Remote session incoming window is exhausted")]
    SessionWindowExhausted,

    #[error("Unknown link")]
    UnknownLink,

    #[error("Message of {size} bytes exceeds max message size {max}")]
    MessageSizeExceeded { size: u64, max: u64 },

    #[error("Encoding error: {0}")]
    Encode(#[from] oxamqp_codec::Error),

    #[error(transparent)]
    Frame(#[from] frames::Error),
}
