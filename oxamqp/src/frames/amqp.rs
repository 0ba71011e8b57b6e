//! AMQP frame type and corresponding encoder and decoder

use bytes::{Buf, BufMut, BytesMut};
use oxamqp_codec::{to_vec, Deserializer};
use oxamqp_types::{
    definitions::MIN_MAX_FRAME_SIZE,
    performatives::{
        Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Performative, Transfer,
    },
};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::Payload;

use super::{Error, FRAME_HEADER_SIZE, FRAME_TYPE_AMQP};

/// AMQP frame
#[derive(Debug)]
pub struct Frame {
    /// AMQP frame channel
    pub channel: u16,

    /// AMQP frame body
    pub body: FrameBody,
}

impl Frame {
    /// Creates a new AMQP frame
    pub fn new(channel: impl Into<u16>, body: FrameBody) -> Self {
        Self {
            channel: channel.into(),
            body,
        }
    }

    /// Get the channel of the frame
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Get the body of the frame
    pub fn body(&self) -> &FrameBody {
        &self.body
    }

    /// Consume the frame to get the frame body
    pub fn into_body(self) -> FrameBody {
        self.body
    }

    /// Creates an emtpy frame. The empty frame is only used to reset
    /// the remote idle timeout
    pub fn empty() -> Self {
        Self {
            channel: 0,
            body: FrameBody::Empty,
        }
    }
}

/// AMQP frame body
pub enum FrameBody {
    // Frames handled by Link
    /// Attach performative
    Attach(Attach),

    /// Flow performative
    Flow(Flow),

    /// Transfer performative and payload
    Transfer {
        /// Transfer performative
        performative: Transfer,

        /// Binary payload
        payload: Payload,
    },

    /// Disposition performative
    Disposition(Disposition),

    /// Detach performative
    Detach(Detach),

    // Frames handled by Session
    /// Begin performative
    Begin(Begin),

    /// End performative
    End(End),

    // Frames handled by Connection
    /// Open performative
    Open(Open),

    /// Close performative
    Close(Close),

    /// An empty frame used only for resetting idle timeout
    Empty,
}

impl std::fmt::Debug for FrameBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attach(arg0) => f.debug_tuple("Attach").field(arg0).finish(),
            Self::Flow(arg0) => f.debug_tuple("Flow").field(arg0).finish(),
            Self::Transfer {
                performative,
                payload,
            } => f
                .debug_struct("Transfer")
                .field("performative", performative)
                .field("payload.len", &payload.len())
                .finish(),
            Self::Disposition(arg0) => f.debug_tuple("Disposition").field(arg0).finish(),
            Self::Detach(arg0) => f.debug_tuple("Detach").field(arg0).finish(),
            Self::Begin(arg0) => f.debug_tuple("Begin").field(arg0).finish(),
            Self::End(arg0) => f.debug_tuple("End").field(arg0).finish(),
            Self::Open(arg0) => f.debug_tuple("Open").field(arg0).finish(),
            Self::Close(arg0) => f.debug_tuple("Close").field(arg0).finish(),
            Self::Empty => write!(f, "Empty"),
        }
    }
}

impl From<Performative> for FrameBody {
    fn from(performative: Performative) -> Self {
        match performative {
            Performative::Open(p) => FrameBody::Open(p),
            Performative::Begin(p) => FrameBody::Begin(p),
            Performative::Attach(p) => FrameBody::Attach(p),
            Performative::Flow(p) => FrameBody::Flow(p),
            Performative::Transfer(p) => FrameBody::Transfer {
                performative: p,
                payload: Payload::new(),
            },
            Performative::Disposition(p) => FrameBody::Disposition(p),
            Performative::Detach(p) => FrameBody::Detach(p),
            Performative::End(p) => FrameBody::End(p),
            Performative::Close(p) => FrameBody::Close(p),
        }
    }
}

/// Encoder and decoder of length prefixed AMQP frames.
///
/// Incoming frames are limited by the local max frame size, outgoing frames
/// by the max frame size the peer announced in its open. Until the peer's
/// open arrives the outgoing limit is [`MIN_MAX_FRAME_SIZE`].
#[derive(Debug)]
pub struct FrameCodec {
    max_frame_size: usize,
    remote_max_frame_size: usize,
}

fn write_header(dst: &mut BytesMut, channel: u16) {
    // Outgoing frames never carry an extended header, thus doff is always 2
    dst.put_u8(2); // doff
    dst.put_u8(FRAME_TYPE_AMQP); // frame type
    dst.put_u16(channel);
}

fn write_frame(dst: &mut BytesMut, channel: u16, performative: &[u8], payload: &[u8]) {
    let size = FRAME_HEADER_SIZE + performative.len() + payload.len();
    dst.reserve(size);
    dst.put_u32(size as u32);
    write_header(dst, channel);
    dst.put_slice(performative);
    dst.put_slice(payload);
}

fn encode_performative<T: Serialize>(performative: &T) -> Result<Vec<u8>, Error> {
    to_vec(performative).map_err(Error::Encode)
}

impl FrameCodec {
    /// Creates a codec that accepts incoming frames up to `max_frame_size`
    pub fn new(max_frame_size: u32) -> Self {
        Self {
            max_frame_size: std::cmp::max(MIN_MAX_FRAME_SIZE, max_frame_size as usize),
            remote_max_frame_size: MIN_MAX_FRAME_SIZE,
        }
    }

    /// Limit of incoming frames
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Limit of outgoing frames
    pub fn remote_max_frame_size(&self) -> usize {
        self.remote_max_frame_size
    }

    /// Sets the limit of outgoing frames. Values below [`MIN_MAX_FRAME_SIZE`]
    /// are raised to it.
    pub fn set_remote_max_frame_size(&mut self, max_frame_size: u32) {
        self.remote_max_frame_size = std::cmp::max(MIN_MAX_FRAME_SIZE, max_frame_size as usize);
    }

    /// Number of payload bytes left in a frame after the header and `performative_len`
    fn room_for_payload(&self, performative_len: usize) -> Result<usize, Error> {
        let max_body_size = self.remote_max_frame_size - FRAME_HEADER_SIZE;
        match max_body_size.checked_sub(performative_len) {
            Some(room) if room > 0 => Ok(room),
            _ => Err(Error::FrameSizeTooSmall {
                required: FRAME_HEADER_SIZE + performative_len,
                max: self.remote_max_frame_size,
            }),
        }
    }

    /// Writes a transfer, splitting the payload over as many frames as the
    /// remote max frame size requires. All but the last frame carry
    /// `more = true`. Returns the number of frames written.
    pub(crate) fn encode_transfer(
        &self,
        dst: &mut BytesMut,
        channel: u16,
        mut transfer: Transfer,
        mut payload: Payload,
    ) -> Result<u32, Error> {
        let max_body_size = self.remote_max_frame_size - FRAME_HEADER_SIZE;

        // First test the size
        let whole = encode_performative(&transfer)?;
        if whole.len() + payload.len() <= max_body_size {
            write_frame(dst, channel, &whole, &payload);
            return Ok(1);
        }

        // Send first frame
        let orig_more = transfer.more;
        transfer.more = true;
        let first = encode_performative(&transfer)?;
        let split_index = self.room_for_payload(first.len())?;
        let partial = payload.split_to(split_index);
        write_frame(dst, channel, &first, &partial);
        let mut count = 1;

        // Continuation frames only need the handle and the more flag
        transfer.delivery_id = None;
        transfer.delivery_tag = None;
        transfer.message_format = None;
        transfer.settled = None;
        transfer.rcv_settle_mode = None;
        let middle = encode_performative(&transfer)?;
        let split_index = self.room_for_payload(middle.len())?;
        while middle.len() + payload.len() > max_body_size {
            let partial = payload.split_to(split_index);
            write_frame(dst, channel, &middle, &partial);
            count += 1;
        }

        // Send last frame
        transfer.more = orig_more;
        let last = encode_performative(&transfer)?;
        write_frame(dst, channel, &last, &payload);
        Ok(count + 1)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let channel = item.channel;
        let performative = match item.body {
            FrameBody::Transfer {
                performative,
                payload,
            } => {
                return self
                    .encode_transfer(dst, channel, performative, payload)
                    .map(|_| ())
            }
            FrameBody::Empty => {
                write_frame(dst, channel, &[], &[]);
                return Ok(());
            }
            FrameBody::Open(p) => encode_performative(&p)?,
            FrameBody::Begin(p) => encode_performative(&p)?,
            FrameBody::Attach(p) => encode_performative(&p)?,
            FrameBody::Flow(p) => encode_performative(&p)?,
            FrameBody::Disposition(p) => encode_performative(&p)?,
            FrameBody::Detach(p) => encode_performative(&p)?,
            FrameBody::End(p) => encode_performative(&p)?,
            FrameBody::Close(p) => encode_performative(&p)?,
        };

        let size = FRAME_HEADER_SIZE + performative.len();
        if size > self.remote_max_frame_size {
            return Err(Error::FrameSizeTooSmall {
                required: size,
                max: self.remote_max_frame_size,
            });
        }
        write_frame(dst, channel, &performative, &[]);
        Ok(())
    }
}

fn decode_body(mut frame: BytesMut) -> Result<FrameBody, Error> {
    let mut deserializer = Deserializer::new(&frame[..]);
    let performative = Performative::deserialize(&mut deserializer)?;
    let consumed = deserializer.consumed();

    let body = match performative {
        Performative::Transfer(performative) => {
            frame.advance(consumed);
            FrameBody::Transfer {
                performative,
                payload: frame.freeze(),
            }
        }
        performative if consumed < frame.len() => {
            return Err(Error::Decode(oxamqp_codec::Error::InvalidValue(format!(
                "{} bytes after {} performative",
                frame.len() - consumed,
                performative.name()
            ))))
        }
        performative => FrameBody::from(performative),
    };
    Ok(body)
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        let size = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if (size as usize) < FRAME_HEADER_SIZE {
            return Err(Error::InvalidFrameSize(size));
        }
        let size = size as usize;
        if size > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(size);
        frame.advance(4);
        let doff = frame.get_u8();
        let ftype = frame.get_u8();
        let channel = frame.get_u16();

        let body_offset = doff as usize * 4;
        if body_offset < FRAME_HEADER_SIZE || body_offset > size {
            return Err(Error::InvalidDataOffset(doff));
        }
        if ftype != FRAME_TYPE_AMQP {
            return Err(Error::UnsupportedFrameType(ftype));
        }

        // extended header is ignored
        frame.advance(body_offset - FRAME_HEADER_SIZE);

        let body = if frame.is_empty() {
            FrameBody::Empty
        } else {
            decode_body(frame)?
        };
        Ok(Some(Frame { channel, body }))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(Error::Truncated {
                buffered: buf.len(),
            }),
        }
    }
}
