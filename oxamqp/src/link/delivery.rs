//! Deliveries of the sending end of a link

use oxamqp_codec::primitives::Binary;
use oxamqp_types::{
    definitions::{self, DeliveryNumber, DeliveryTag},
    messaging::DeliveryState,
};

use super::LinkHandle;

/// Settlement state of an outgoing delivery as reported by the peer
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryStatus {
    /// No terminal outcome yet
    Unsettled,

    /// The message was accepted
    Accepted,

    /// The message was rejected, possibly with an error
    Rejected(Option<definitions::Error>),

    /// The message was not and will not be processed
    Released,

    /// The message was modified by the receiver
    Modified {
        /// Whether the delivery should count as failed
        delivery_failed: bool,

        /// Whether the receiver will not accept the message again
        undeliverable_here: bool,
    },
}

impl DeliveryStatus {
    /// Whether the peer reached a terminal outcome
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryStatus::Unsettled)
    }

    /// Whether the message was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, DeliveryStatus::Accepted)
    }
}

impl From<Option<&DeliveryState>> for DeliveryStatus {
    fn from(state: Option<&DeliveryState>) -> Self {
        match state {
            None | Some(DeliveryState::Received(_)) => DeliveryStatus::Unsettled,
            Some(DeliveryState::Accepted(_)) => DeliveryStatus::Accepted,
            Some(DeliveryState::Rejected(rejected)) => {
                DeliveryStatus::Rejected(rejected.error.clone())
            }
            Some(DeliveryState::Released(_)) => DeliveryStatus::Released,
            Some(DeliveryState::Modified(modified)) => DeliveryStatus::Modified {
                delivery_failed: modified.delivery_failed.unwrap_or(false),
                undeliverable_here: modified.undeliverable_here.unwrap_or(false),
            },
        }
    }
}

/// A change to an outgoing delivery reported by a disposition
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryUpdate {
    /// The link the delivery was sent on
    pub link: LinkHandle,

    /// Delivery id assigned by the session
    pub delivery_id: DeliveryNumber,

    /// Delivery tag chosen when the message was sent
    pub delivery_tag: DeliveryTag,

    /// The state reported by the peer
    pub status: DeliveryStatus,

    /// Whether the peer has settled the delivery
    pub remote_settled: bool,
}

/// An outgoing delivery waiting for its outcome
#[derive(Debug, Clone)]
pub(crate) struct UnsettledDelivery {
    pub delivery_id: DeliveryNumber,
    pub status: DeliveryStatus,
}

/// Produces delivery tags from a counter.
///
/// Each tag is the big endian encoding of the next `u64`, so tags do not
/// repeat before the counter wraps.
#[derive(Debug, Clone, Default)]
pub struct DeliveryTagGenerator {
    next: u64,
}

impl DeliveryTagGenerator {
    /// Creates a generator starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next tag
    pub fn next_tag(&mut self) -> DeliveryTag {
        let tag = self.peek_tag();
        self.advance();
        tag
    }

    /// Returns the tag the next call to [`next_tag`](Self::next_tag) yields
    pub fn peek_tag(&self) -> DeliveryTag {
        Binary::from(self.next.to_be_bytes().to_vec())
    }

    /// Skips the current tag
    pub fn advance(&mut self) {
        self.next = self.next.wrapping_add(1);
    }
}

impl Iterator for DeliveryTagGenerator {
    type Item = DeliveryTag;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_tag())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use oxamqp_types::{
        definitions::{AmqpError, Error},
        messaging::{Accepted, DeliveryState, Modified, Received, Rejected, Released},
    };

    use super::{DeliveryStatus, DeliveryTagGenerator};

    #[test]
    fn generated_tags_are_distinct() {
        let tags: HashSet<_> = DeliveryTagGenerator::new().take(1000).collect();
        assert_eq!(tags.len(), 1000);
    }

    #[test]
    fn tags_are_big_endian_counters() {
        let mut generator = DeliveryTagGenerator::new();
        assert_eq!(&generator.next_tag()[..], &[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&generator.next_tag()[..], &[0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn peek_does_not_take_the_tag() {
        let mut generator = DeliveryTagGenerator::new();
        assert_eq!(generator.peek_tag(), generator.peek_tag());
        let peeked = generator.peek_tag();
        assert_eq!(generator.next_tag(), peeked);
        assert_ne!(generator.peek_tag(), peeked);
    }

    #[test]
    fn status_from_remote_state() {
        assert_eq!(DeliveryStatus::from(None), DeliveryStatus::Unsettled);
        let received = DeliveryState::Received(Received {
            section_number: 0,
            section_offset: 10,
        });
        assert!(!DeliveryStatus::from(Some(&received)).is_terminal());
        let accepted = DeliveryState::Accepted(Accepted {});
        assert!(DeliveryStatus::from(Some(&accepted)).is_accepted());

        let rejected = DeliveryState::Rejected(Rejected {
            error: Some(Error::from(AmqpError::DecodeError)),
        });
        assert_eq!(
            DeliveryStatus::from(Some(&rejected)),
            DeliveryStatus::Rejected(Some(Error::from(AmqpError::DecodeError)))
        );
        assert_eq!(
            DeliveryStatus::from(Some(&DeliveryState::Released(Released {}))),
            DeliveryStatus::Released
        );

        let modified = DeliveryState::Modified(Modified {
            delivery_failed: Some(true),
            undeliverable_here: None,
            message_annotations: None,
        });
        assert_eq!(
            DeliveryStatus::from(Some(&modified)),
            DeliveryStatus::Modified {
                delivery_failed: true,
                undeliverable_here: false,
            }
        );
    }
}
