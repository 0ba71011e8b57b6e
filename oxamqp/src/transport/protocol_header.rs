//! The eight byte header exchanged before any frame

use bytes::{Buf, BufMut, BytesMut};
use oxamqp_types::definitions::{MAJOR, MINOR, REVISION};
use tokio_util::codec::{Decoder, Encoder};

use super::NegotiationError;

/// Size of the header on the wire
pub const HEADER_LEN: usize = 8;

/// `AMQP` followed by the protocol id of a plain (non SASL, non TLS) connection
const AMQP_PREFIX: [u8; 5] = *b"AMQP\x00";

/// Version announced in an AMQP protocol header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolHeader {
    /// Major number
    pub major: u8,

    /// Minor number
    pub minor: u8,

    /// Revision number
    pub revision: u8,
}

impl ProtocolHeader {
    /// The only version this crate speaks
    pub const AMQP_1_0_0: Self = Self {
        major: MAJOR,
        minor: MINOR,
        revision: REVISION,
    };

    /// Creates an AMQP 1.0.0 protocol header
    pub fn amqp() -> Self {
        Self::AMQP_1_0_0
    }

    /// Wire form of the header
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let [a, m, q, p, id] = AMQP_PREFIX;
        [a, m, q, p, id, self.major, self.minor, self.revision]
    }

    /// Parses a plain AMQP header. Headers of other protocols (SASL, TLS, or
    /// not AMQP at all) yield `None`.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Option<Self> {
        match bytes.split_at(AMQP_PREFIX.len()) {
            (prefix, &[major, minor, revision]) if prefix == AMQP_PREFIX => Some(Self {
                major,
                minor,
                revision,
            }),
            _ => None,
        }
    }
}

impl Default for ProtocolHeader {
    fn default() -> Self {
        Self::AMQP_1_0_0
    }
}

/// Encoder and Decoder for protocol headers.
///
/// The decoder only accepts the AMQP 1.0.0 header; anything else is a
/// [`NegotiationError`].
#[derive(Debug, Clone, Default)]
pub struct ProtocolHeaderCodec {}

impl ProtocolHeaderCodec {
    /// Creates a new protocol header codec
    pub fn new() -> Self {
        Self {}
    }
}

impl Encoder<ProtocolHeader> for ProtocolHeaderCodec {
    type Error = NegotiationError;

    fn encode(&mut self, item: ProtocolHeader, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(&item.to_bytes());
        Ok(())
    }
}

impl Decoder for ProtocolHeaderCodec {
    type Item = ProtocolHeader;
    type Error = NegotiationError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.remaining() < HEADER_LEN {
            return Ok(None);
        }

        let mut buf = [0u8; HEADER_LEN];
        src.copy_to_slice(&mut buf);
        match ProtocolHeader::parse(&buf) {
            Some(header) if header == ProtocolHeader::AMQP_1_0_0 => Ok(Some(header)),
            _ => Err(NegotiationError::ProtocolHeaderMismatch(buf)),
        }
    }
}
