//! Sans-io connection engine
//!
//! The engine owns the connection, its sessions and their links. Bytes read
//! from the transport go in through [`ConnectionEngine::feed`], bytes to be
//! written come out of [`ConnectionEngine::write_buffer`], and every meaningful
//! transition is queued as an [`Event`]. Nothing in here blocks or performs IO.

use std::{
    collections::BTreeMap,
    io,
    time::{Duration, Instant},
};

use bytes::{Buf, BytesMut};
use oxamqp_codec::EncodeBuffer;
use oxamqp_types::{
    definitions::{
        self, AmqpError, ConnectionError, DeliveryNumber, DeliveryTag, Role, SequenceNo,
        SessionError,
    },
    messaging::{Message, Target},
    performatives::{
        Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Transfer,
    },
    states::{ConnectionState, LinkState, SessionState},
};
use slab::Slab;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, instrument, trace};

use crate::{
    dispatch::{self, Handler},
    event::{Event, EventQueue, Level},
    frames::{
        self,
        amqp::{Frame, FrameBody, FrameCodec},
    },
    link::{DeliveryStatus, DeliveryUpdate, LinkHandle, SendError, UnsettledDelivery},
    session::{Session, SessionHandle},
    transport::protocol_header::{ProtocolHeader, ProtocolHeaderCodec},
    Error, Payload,
};

use super::{
    builder::{Builder, WithContainerId, WithoutContainerId},
    heartbeat::{HeartBeat, IdleTimeout},
    Connection,
};

/// Drives one AMQP connection without doing any IO.
///
/// # Example
///
/// ```rust
/// use oxamqp::{ConnectionEngine, Event};
///
/// let mut engine = ConnectionEngine::builder().container_id("c1").build();
/// assert_eq!(engine.next_event(), Some(Event::ConnectionInit));
///
/// // The protocol header is the first thing written
/// assert_eq!(engine.write_buffer(), b"AMQP\x00\x01\x00\x00");
/// ```
#[derive(Debug)]
pub struct ConnectionEngine {
    connection: Connection,
    sessions: Slab<Session>,
    session_by_incoming_channel: BTreeMap<u16, usize>,
    session_window: u32,

    header_codec: ProtocolHeaderCodec,
    header_received: bool,
    frame_codec: FrameCodec,
    input: BytesMut,
    output: BytesMut,
    events: EventQueue,

    // Reused by every send
    message_buffer: EncodeBuffer,

    heartbeat: HeartBeat,
    idle_timeout: IdleTimeout,

    // transport state
    read_closed: bool,
    write_closed: bool,
    condition: Option<definitions::Error>,
    closed_emitted: bool,
}

impl ConnectionEngine {
    /// Creates a [`Builder`] for the engine
    pub fn builder() -> Builder<WithoutContainerId> {
        Builder::new()
    }

    pub(crate) fn new(builder: Builder<WithContainerId>) -> Self {
        let local_open = builder.local_open();
        let idle_time_out = local_open
            .idle_time_out
            .map(|millis| Duration::from_millis(millis as u64));

        let mut engine = Self {
            frame_codec: FrameCodec::new(local_open.max_frame_size.0),
            connection: Connection::new(local_open),
            sessions: Slab::new(),
            session_by_incoming_channel: BTreeMap::new(),
            session_window: builder.session_window,
            header_codec: ProtocolHeaderCodec::new(),
            header_received: false,
            input: BytesMut::new(),
            output: BytesMut::new(),
            events: EventQueue::new(),
            message_buffer: EncodeBuffer::new(builder.buffer_size, builder.buffer_limit),
            heartbeat: HeartBeat::never(),
            idle_timeout: IdleTimeout::new(idle_time_out),
            read_closed: false,
            write_closed: false,
            condition: None,
            closed_emitted: false,
        };

        if let Err(err) = engine
            .header_codec
            .encode(ProtocolHeader::amqp(), &mut engine.output)
        {
            engine.transport_error(err.condition());
        }
        engine.events.push(Event::ConnectionInit);
        engine
    }

    /* ---------------------------------------------------------------- */
    /*                           Transport side                         */
    /* ---------------------------------------------------------------- */

    /// Hands bytes read from the transport to the engine.
    ///
    /// Incomplete frames stay buffered until more bytes arrive. Malformed
    /// input raises [`Event::TransportError`] and closes the read side.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.read_closed {
            return;
        }
        self.input.extend_from_slice(bytes);

        if !self.header_received {
            match self.header_codec.decode(&mut self.input) {
                Ok(Some(header)) => {
                    trace!(?header, "protocol header received");
                    self.header_received = true;
                    self.connection.on_header_received();
                    self.idle_timeout.on_frame_received();
                }
                Ok(None) => return,
                Err(err) => {
                    self.transport_error(err.condition());
                    self.update_transport();
                    return;
                }
            }
        }

        while !self.read_closed {
            match self.frame_codec.decode(&mut self.input) {
                Ok(Some(frame)) => {
                    self.idle_timeout.on_frame_received();
                    if let Err(err) = self.on_incoming_frame(frame) {
                        error!(%err, "closing connection");
                        self.local_close(err.condition());
                    }
                }
                Ok(None) => break,
                Err(err) => self.transport_error(err.condition()),
            }
            self.update_transport();
        }
        self.update_transport();
    }

    /// Bytes waiting to be written to the transport
    pub fn write_buffer(&self) -> &[u8] {
        if self.write_closed {
            return &[];
        }
        &self.output[..]
    }

    /// Removes `n` written bytes from the front of the write buffer
    pub fn write_done(&mut self, n: usize) {
        let n = std::cmp::min(n, self.output.len());
        self.output.advance(n);
        self.update_transport();
    }

    /// The transport reached end of stream.
    ///
    /// Unless the close handshake has completed this is a transport error.
    pub fn read_close(&mut self) {
        if self.read_closed {
            return;
        }

        if !self.input.is_empty() {
            let err = frames::Error::Truncated {
                buffered: self.input.len(),
            };
            self.transport_error(err.condition());
        } else if self.connection.state != ConnectionState::End {
            self.transport_error(definitions::Error::new(
                ConnectionError::ConnectionForced,
                Some(String::from("connection aborted")),
                None,
            ));
        } else {
            self.read_closed = true;
        }
        self.update_transport();
    }

    /// The transport can no longer be written to
    pub fn write_close(&mut self) {
        if self.write_closed {
            return;
        }
        self.write_closed = true;
        self.output.clear();
        if self.connection.state != ConnectionState::End && self.condition.is_none() {
            self.transport_error(definitions::Error::new(
                ConnectionError::ConnectionForced,
                Some(String::from("connection aborted")),
                None,
            ));
        }
        self.update_transport();
    }

    /// The transport failed. Both directions are closed.
    pub fn disconnected(&mut self, err: io::Error) {
        self.write_closed = true;
        self.output.clear();
        if self.condition.is_none() {
            self.transport_error(definitions::Error::new(
                ConnectionError::ConnectionForced,
                Some(err.to_string()),
                None,
            ));
        }
        self.read_closed = true;
        self.update_transport();
    }

    /// Whether the read side is closed
    pub fn is_read_closed(&self) -> bool {
        self.read_closed
    }

    /// Whether the write side is closed
    pub fn is_write_closed(&self) -> bool {
        self.write_closed
    }

    /// Whether both directions of the transport are closed
    pub fn is_closed(&self) -> bool {
        self.read_closed && self.write_closed
    }

    /// Whether the transport is closed and every event has been taken
    pub fn is_finished(&self) -> bool {
        self.is_closed() && self.events.is_empty()
    }

    /// The condition the local side failed or closed the connection with
    pub fn condition(&self) -> Option<&definitions::Error> {
        self.condition
            .as_ref()
            .or(self.connection.local_error.as_ref())
    }

    /// The condition the peer closed the connection with
    pub fn remote_condition(&self) -> Option<&definitions::Error> {
        self.connection.remote_error.as_ref()
    }

    /// Processes heartbeat and idle timeout deadlines.
    ///
    /// Returns when `tick` needs to be called next, or `None` if there is no
    /// deadline.
    pub fn tick(&mut self, now: Instant) -> Option<Instant> {
        if self.is_closed() {
            return None;
        }

        let idle_deadline = match self.idle_timeout.tick(now) {
            Ok(deadline) => deadline,
            Err(()) => {
                self.transport_error(definitions::Error::new(
                    AmqpError::ResourceLimitExceeded,
                    Some(String::from("local-idle-timeout expired")),
                    None,
                ));
                self.update_transport();
                return None;
            }
        };

        let (due, heartbeat_deadline) = self.heartbeat.tick(now);
        if due && self.may_write() {
            if let Err(err) = self.send_frame(Frame::empty()) {
                self.transport_error(err.condition());
            }
        }

        self.update_transport();
        [idle_deadline, heartbeat_deadline].into_iter().flatten().min()
    }

    /* ---------------------------------------------------------------- */
    /*                               Events                             */
    /* ---------------------------------------------------------------- */

    /// Takes the oldest event
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop()
    }

    /// Whether events are waiting to be taken
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Drains the event queue into `handler`. Returns the number of events
    /// dispatched.
    pub fn dispatch<H: Handler + ?Sized>(&mut self, handler: &mut H) -> usize {
        dispatch::dispatch_all(self, handler)
    }

    /* ---------------------------------------------------------------- */
    /*                         Endpoint operations                      */
    /* ---------------------------------------------------------------- */

    /// State of the connection endpoint
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state
    }

    /// The local container id
    pub fn container_id(&self) -> &str {
        &self.connection.local_open.container_id
    }

    /// The agreed channel max
    pub fn channel_max(&self) -> u16 {
        self.connection.channel_max()
    }

    /// Sends the local open
    pub fn open(&mut self) -> Result<(), Error> {
        let open = self.connection.open()?;
        self.send_frame(Frame::new(0u16, FrameBody::Open(open)))?;
        self.flush_pending()
    }

    /// Closes the connection, sending an open first if none was sent.
    ///
    /// Returns `false` if a close has already been sent.
    pub fn close(&mut self, error: Option<definitions::Error>) -> bool {
        if self.connection.close_sent() || self.write_closed {
            return false;
        }
        if !self.connection.open_sent() {
            if let Err(err) = self.open() {
                error!(%err, "cannot open connection before closing");
                return false;
            }
        }

        let close = match self.connection.close(error) {
            Ok(close) => close,
            Err(err) => {
                debug!(%err);
                return false;
            }
        };
        if let Err(err) = self.send_frame(Frame::new(0u16, FrameBody::Close(close))) {
            self.transport_error(err.condition());
        }
        self.update_transport();
        true
    }

    /// Allocates a session. The begin is sent as soon as the connection is
    /// open.
    pub fn begin_session(&mut self) -> Result<SessionHandle, Error> {
        if self.connection.close_sent() {
            return Err(Error::illegal_state("connection is closing"));
        }

        let entry = self.sessions.vacant_entry();
        let key = entry.key();
        if key > self.connection.channel_max() as usize {
            return Err(Error::ChannelMaxReached);
        }
        entry.insert(Session::new(
            key as u16,
            self.session_window,
            self.session_window,
        ));
        self.flush_pending()?;
        Ok(SessionHandle(key))
    }

    /// State of a session
    pub fn session_state(&self, session: SessionHandle) -> Option<SessionState> {
        self.sessions.get(session.0).map(|s| s.state)
    }

    /// Allocates a sending link on `session`. The attach is sent as soon as
    /// the session is mapped.
    pub fn attach_sender(
        &mut self,
        session: SessionHandle,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<LinkHandle, Error> {
        let s = self
            .sessions
            .get_mut(session.0)
            .ok_or(Error::UnknownSession)?;
        let link = s.allocate_link(name.into(), Target::new(address))?;
        self.flush_pending()?;
        Ok(LinkHandle {
            session: session.0,
            link,
        })
    }

    /// State of a link
    pub fn link_state(&self, link: LinkHandle) -> Option<LinkState> {
        self.sessions
            .get(link.session)
            .and_then(|s| s.links.get(link.link))
            .map(|l| l.state)
    }

    /// Current credit of a link. Unknown links have none.
    pub fn credit(&self, link: LinkHandle) -> u32 {
        self.sessions
            .get(link.session)
            .and_then(|s| s.links.get(link.link))
            .map(|l| l.flow_state.link_credit())
            .unwrap_or(0)
    }

    /// Delivery count of a link
    pub fn delivery_count(&self, link: LinkHandle) -> Option<SequenceNo> {
        self.sessions
            .get(link.session)
            .and_then(|s| s.links.get(link.link))
            .map(|l| l.flow_state.delivery_count())
    }

    /// Number of deliveries on a link waiting for an outcome
    pub fn unsettled_count(&self, link: LinkHandle) -> usize {
        self.sessions
            .get(link.session)
            .and_then(|s| s.links.get(link.link))
            .map(|l| l.unsettled.len())
            .unwrap_or(0)
    }

    /// Whether the receiver asked the link to use up its credit
    pub fn drain_requested(&self, link: LinkHandle) -> bool {
        self.sessions
            .get(link.session)
            .and_then(|s| s.links.get(link.link))
            .map(|l| l.flow_state.drain())
            .unwrap_or(false)
    }

    /// Sends a message with the next tag of the link's tag generator
    ///
    /// The tag is only taken from the generator once the transfer is written.
    pub fn send(&mut self, link: LinkHandle, message: Message) -> Result<DeliveryTag, SendError> {
        let delivery_tag = self
            .sessions
            .get(link.session)
            .and_then(|s| s.links.get(link.link))
            .map(|l| l.tag_generator.peek_tag())
            .ok_or(SendError::UnknownLink)?;
        self.send_with_tag(link, delivery_tag.clone(), message)?;
        if let Some(sender) = self
            .sessions
            .get_mut(link.session)
            .and_then(|s| s.links.get_mut(link.link))
        {
            sender.tag_generator.advance();
        }
        Ok(delivery_tag)
    }

    /// Sends a message with a caller chosen tag.
    ///
    /// Fails without touching any state unless the connection is open, the
    /// link is attached with credit, the peer's session window is open and
    /// the tag is not used by an unsettled delivery.
    #[instrument(name = "SEND", skip_all)]
    pub fn send_with_tag(
        &mut self,
        link: LinkHandle,
        delivery_tag: DeliveryTag,
        message: Message,
    ) -> Result<DeliveryNumber, SendError> {
        if !self.connection.is_opened() || self.write_closed {
            return Err(SendError::IllegalState("connection is not open"));
        }

        let session = self
            .sessions
            .get_mut(link.session)
            .ok_or(SendError::UnknownLink)?;
        if session.state != SessionState::Mapped {
            return Err(SendError::IllegalState("session is not mapped"));
        }
        if !session.can_send_transfer() {
            return Err(SendError::SessionWindowExhausted);
        }

        let sender = session
            .links
            .get_mut(link.link)
            .ok_or(SendError::UnknownLink)?;
        if sender.state != LinkState::Attached {
            return Err(SendError::IllegalState("link is not attached"));
        }
        if !sender.flow_state.can_send() {
            return Err(SendError::InsufficientCredit);
        }
        if sender.is_tag_in_use(&delivery_tag) {
            return Err(SendError::DuplicateDeliveryTag(delivery_tag));
        }

        let payload = Payload::copy_from_slice(self.message_buffer.encode(&message)?);
        if let Some(max) = sender.max_message_size {
            if payload.len() as u64 > max {
                return Err(SendError::MessageSizeExceeded {
                    size: payload.len() as u64,
                    max,
                });
            }
        }

        let delivery_id = session.next_delivery_id;
        let transfer = Transfer::new(sender.output_handle, delivery_id, delivery_tag.clone());
        let channel = session.outgoing_channel;
        trace!(channel, frame = ?transfer, payload.len = payload.len());
        let frame_count =
            self.frame_codec
                .encode_transfer(&mut self.output, channel, transfer, payload)?;

        sender.flow_state.consume()?;
        sender.unsettled.insert(
            delivery_tag.clone(),
            UnsettledDelivery {
                delivery_id,
                status: DeliveryStatus::Unsettled,
            },
        );
        session.allocate_delivery_id();
        session.delivery_map.insert(delivery_id, (link.link, delivery_tag));
        session.on_outgoing_transfers(frame_count);
        self.heartbeat.on_frame_written();
        Ok(delivery_id)
    }

    /// Uses up the remaining credit of a link after the receiver asked for a
    /// drain, and reports the new link state to the receiver.
    ///
    /// Returns `false` if no drain was requested.
    pub fn drained(&mut self, link: LinkHandle) -> bool {
        let may_write = self.may_write();
        let session = match self.sessions.get_mut(link.session) {
            Some(session) => session,
            None => return false,
        };
        let drained = match session.links.get_mut(link.link) {
            Some(sender) => sender.flow_state.drained(),
            None => false,
        };
        if !drained || !may_write {
            return drained;
        }

        let mut flow = session.flow();
        if let Some(sender) = session.links.get(link.link) {
            sender.write_flow(&mut flow);
        }
        let frame = Frame::new(session.outgoing_channel, FrameBody::Flow(flow));
        if let Err(err) = self.send_frame(frame) {
            self.transport_error(err.condition());
        }
        true
    }

    /* ---------------------------------------------------------------- */
    /*                          Internal helpers                        */
    /* ---------------------------------------------------------------- */

    fn may_write(&self) -> bool {
        !self.write_closed && !self.connection.close_sent()
    }

    #[instrument(name = "SEND", skip_all)]
    fn send_frame(&mut self, frame: Frame) -> Result<(), Error> {
        trace!(channel = frame.channel, frame = ?frame.body);
        self.frame_codec.encode(frame, &mut self.output)?;
        self.heartbeat.on_frame_written();
        Ok(())
    }

    /// Sends the begins and attaches that were waiting for their parent
    /// endpoint to open
    fn flush_pending(&mut self) -> Result<(), Error> {
        if !self.connection.is_opened() || !self.may_write() {
            return Ok(());
        }

        let mut pending = Vec::new();
        for (_, session) in self.sessions.iter_mut() {
            if session.state == SessionState::Unmapped {
                let begin = session.begin()?;
                pending.push(Frame::new(session.outgoing_channel, FrameBody::Begin(begin)));
            }
            if session.state != SessionState::Mapped {
                continue;
            }
            for (_, link) in session.links.iter_mut() {
                if link.state == LinkState::Unattached {
                    let attach = link.attach()?;
                    pending.push(Frame::new(
                        session.outgoing_channel,
                        FrameBody::Attach(attach),
                    ));
                }
            }
        }

        for frame in pending {
            self.send_frame(frame)?;
        }
        Ok(())
    }

    fn session_key(&self, channel: u16) -> Result<usize, Error> {
        self.session_by_incoming_channel
            .get(&channel)
            .copied()
            .ok_or(Error::UnknownSession)
    }

    /// Closes the connection because of a local error. The peer's close is
    /// still awaited.
    fn local_close(&mut self, condition: definitions::Error) {
        if !self.close(Some(condition.clone())) && self.condition.is_none() {
            // The close handshake cannot carry the error any more
            self.transport_error(condition);
        }
    }

    fn transport_error(&mut self, condition: definitions::Error) {
        error!(
            condition = condition.condition.as_str(),
            description = ?condition.description,
            "transport error"
        );
        if self.condition.is_none() {
            self.condition = Some(condition.clone());
        }
        self.events.push(Event::TransportError(condition.clone()));

        if self.connection.open_sent() && self.may_write() {
            match self.connection.close(Some(condition)) {
                Ok(close) => {
                    if let Err(err) = self.send_frame(Frame::new(0u16, FrameBody::Close(close))) {
                        error!(%err, "cannot send close");
                        self.output.clear();
                        self.write_closed = true;
                    }
                }
                Err(err) => debug!(%err),
            }
        }

        self.read_closed = true;
        self.input.clear();
    }

    /// Closes transport directions whose work is done
    fn update_transport(&mut self) {
        if self.connection.state == ConnectionState::End && !self.read_closed {
            self.read_closed = true;
            self.input.clear();
        }
        if self.connection.state == ConnectionState::End {
            for (_, session) in self.sessions.iter_mut() {
                session.state = SessionState::Ended;
                for (_, link) in session.links.iter_mut() {
                    link.state = LinkState::Detached;
                }
            }
        }

        if !self.write_closed
            && self.output.is_empty()
            && (self.connection.state == ConnectionState::End || self.condition.is_some())
        {
            self.write_closed = true;
        }

        if self.is_closed() && !self.closed_emitted {
            self.closed_emitted = true;
            self.events.push(Event::TransportClosed);
        }
    }

    /* ---------------------------------------------------------------- */
    /*                          Incoming frames                         */
    /* ---------------------------------------------------------------- */

    fn on_incoming_frame(&mut self, frame: Frame) -> Result<(), Error> {
        let channel = frame.channel;
        let body = frame.body;

        let opened = self.connection.remote_open.is_some();
        if !opened && !matches!(body, FrameBody::Open(_) | FrameBody::Empty) {
            return Err(Error::illegal_state("expecting an open"));
        }

        match body {
            FrameBody::Open(open) => self.on_incoming_open(channel, open),
            FrameBody::Begin(begin) => self.on_incoming_begin(channel, begin),
            FrameBody::Attach(attach) => self.on_incoming_attach(channel, attach),
            FrameBody::Flow(flow) => self.on_incoming_flow(channel, flow),
            FrameBody::Transfer { performative, .. } => {
                trace!(channel, frame = ?performative);
                Err(Error::amqp_error(
                    AmqpError::NotAllowed,
                    String::from("transfer received on a sending link"),
                ))
            }
            FrameBody::Disposition(disposition) => {
                self.on_incoming_disposition(channel, disposition)
            }
            FrameBody::Detach(detach) => self.on_incoming_detach(channel, detach),
            FrameBody::End(end) => self.on_incoming_end(channel, end),
            FrameBody::Close(close) => self.on_incoming_close(channel, close),
            FrameBody::Empty => {
                trace!(channel, "heartbeat");
                Ok(())
            }
        }
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_open(&mut self, channel: u16, open: Open) -> Result<(), Error> {
        trace!(channel, frame = ?open);
        let max_frame_size = open.max_frame_size.0;
        let idle_time_out = open.idle_time_out;
        self.connection.on_incoming_open(open)?;

        self.frame_codec.set_remote_max_frame_size(max_frame_size);
        // Never let the peer observe silence longer than half its timeout
        if let Some(millis) = idle_time_out.filter(|millis| *millis > 0) {
            self.heartbeat = HeartBeat::new(Duration::from_millis(millis as u64 / 2));
        }

        self.events.push(Event::ConnectionRemoteOpen);
        self.flush_pending()
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_close(&mut self, channel: u16, close: Close) -> Result<(), Error> {
        trace!(channel, frame = ?close);
        self.connection.on_incoming_close(close)?;

        let condition = self.connection.remote_error.clone();
        self.events.push(Event::RemoteClose {
            level: Level::Connection,
            condition,
        });

        if !self.connection.close_sent() && !self.write_closed {
            let close = self.connection.close(None)?;
            self.send_frame(Frame::new(0u16, FrameBody::Close(close)))?;
        }
        Ok(())
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_begin(&mut self, channel: u16, begin: Begin) -> Result<(), Error> {
        trace!(channel, frame = ?begin);
        let outgoing = begin.remote_channel.ok_or_else(|| {
            Error::amqp_error(
                AmqpError::NotImplemented,
                String::from("remotely initiated sessions are not supported"),
            )
        })? as usize;
        if self.session_by_incoming_channel.contains_key(&channel) {
            return Err(Error::illegal_state("channel is already in use"));
        }

        let session = self
            .sessions
            .get_mut(outgoing)
            .ok_or(Error::UnknownSession)?;
        session.on_incoming_begin(channel, begin)?;
        self.session_by_incoming_channel.insert(channel, outgoing);

        self.events.push(Event::SessionRemoteOpen(SessionHandle(outgoing)));
        self.flush_pending()
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_end(&mut self, channel: u16, end: End) -> Result<(), Error> {
        trace!(channel, frame = ?end);
        let key = self.session_key(channel)?;
        let may_write = self.may_write();
        let session = self.sessions.get_mut(key).ok_or(Error::UnknownSession)?;
        session.on_incoming_end(end)?;
        self.session_by_incoming_channel.remove(&channel);

        let condition = session.remote_error.clone();
        self.events.push(Event::RemoteClose {
            level: Level::Session(SessionHandle(key)),
            condition,
        });

        // Ending a session detaches its links
        for (_, link) in session.links.iter_mut() {
            link.state = LinkState::Detached;
        }
        session.link_by_input_handle.clear();

        if session.state == SessionState::EndReceived && may_write {
            let end = session.end(None)?;
            let frame = Frame::new(session.outgoing_channel, FrameBody::End(end));
            self.send_frame(frame)?;
        }
        Ok(())
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_attach(&mut self, channel: u16, attach: Attach) -> Result<(), Error> {
        trace!(channel, frame = ?attach);
        let key = self.session_key(channel)?;
        let session = self.sessions.get_mut(key).ok_or(Error::UnknownSession)?;

        let link_key = session
            .link_by_name
            .get(&attach.name)
            .copied()
            .ok_or_else(|| {
                Error::amqp_error(
                    AmqpError::NotImplemented,
                    String::from("remotely initiated links are not supported"),
                )
            })?;
        if session.link_by_input_handle.contains_key(&attach.handle) {
            return Err(Error::amqp_error(
                SessionError::HandleInUse,
                format!("handle {} is already attached", attach.handle.0),
            ));
        }

        let input_handle = attach.handle;
        let sender = session
            .links
            .get_mut(link_key)
            .ok_or_else(|| Error::illegal_state("link was removed"))?;
        sender.on_incoming_attach(attach)?;
        session.link_by_input_handle.insert(input_handle, link_key);

        self.events.push(Event::LinkRemoteOpen(LinkHandle {
            session: key,
            link: link_key,
        }));
        Ok(())
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_flow(&mut self, channel: u16, flow: Flow) -> Result<(), Error> {
        trace!(channel, frame = ?flow);
        let key = self.session_key(channel)?;
        let may_write = self.may_write();
        let session = self.sessions.get_mut(key).ok_or(Error::UnknownSession)?;
        let window_was_closed = !session.can_send_transfer();
        session.on_incoming_flow(&flow);

        // Links that were only blocked by the session window may send again
        if window_was_closed && session.can_send_transfer() {
            for (link_key, sender) in session.links.iter() {
                let flowed = flow
                    .handle
                    .map_or(false, |h| sender.input_handle == Some(h));
                if sender.state == LinkState::Attached && sender.flow_state.can_send() && !flowed {
                    self.events.push(Event::LinkFlow(LinkHandle {
                        session: key,
                        link: link_key,
                    }));
                }
            }
        }

        let reply = match flow.handle {
            Some(handle) => {
                let link_key = session
                    .link_by_input_handle
                    .get(&handle)
                    .copied()
                    .ok_or_else(|| {
                        Error::amqp_error(
                            SessionError::UnattachedHandle,
                            format!("flow on unattached handle {}", handle.0),
                        )
                    })?;
                let echo = match session.links.get_mut(link_key) {
                    Some(sender) => sender.on_incoming_flow(&flow),
                    None => false,
                };
                self.events.push(Event::LinkFlow(LinkHandle {
                    session: key,
                    link: link_key,
                }));

                match echo {
                    true => {
                        let mut reply = session.flow();
                        if let Some(sender) = session.links.get(link_key) {
                            sender.write_flow(&mut reply);
                        }
                        Some(reply)
                    }
                    false => None,
                }
            }
            None => flow.echo.then(|| session.flow()),
        };

        match reply {
            Some(reply) if may_write => {
                let frame = Frame::new(session.outgoing_channel, FrameBody::Flow(reply));
                self.send_frame(frame)
            }
            _ => Ok(()),
        }
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_disposition(
        &mut self,
        channel: u16,
        disposition: Disposition,
    ) -> Result<(), Error> {
        trace!(channel, frame = ?disposition);
        let key = self.session_key(channel)?;
        let may_write = self.may_write();
        let session = self.sessions.get_mut(key).ok_or(Error::UnknownSession)?;

        // Only deliveries sent by this side can be updated by a receiver
        if disposition.role != Role::Receiver {
            return Ok(());
        }

        let status = DeliveryStatus::from(disposition.state.as_ref());
        let deliveries: Vec<(DeliveryNumber, usize, DeliveryTag)> = session
            .delivery_map
            .range(disposition.range())
            .map(|(id, (link, tag))| (*id, *link, tag.clone()))
            .collect();

        let mut to_settle = Vec::new();
        for (delivery_id, link_key, delivery_tag) in deliveries {
            let sender = match session.links.get_mut(link_key) {
                Some(sender) => sender,
                None => continue,
            };
            if let Some(unsettled) = sender.unsettled.get_mut(&delivery_tag) {
                unsettled.status = status.clone();
            }

            self.events.push(Event::Delivery(DeliveryUpdate {
                link: LinkHandle {
                    session: key,
                    link: link_key,
                },
                delivery_id,
                delivery_tag: delivery_tag.clone(),
                status: status.clone(),
                remote_settled: disposition.settled,
            }));

            if disposition.settled || status.is_terminal() {
                if !disposition.settled {
                    to_settle.push(delivery_id);
                }
                sender.unsettled.remove(&delivery_tag);
                session.delivery_map.remove(&delivery_id);
            }
        }

        if !may_write {
            return Ok(());
        }
        let frames: Vec<Frame> = contiguous_ranges(&to_settle)
            .into_iter()
            .map(|(first, last)| {
                let settle = Disposition {
                    role: Role::Sender,
                    first,
                    last: (last != first).then(|| last),
                    settled: true,
                    state: disposition.state.clone(),
                    batchable: false,
                };
                Frame::new(session.outgoing_channel, FrameBody::Disposition(settle))
            })
            .collect();
        for frame in frames {
            self.send_frame(frame)?;
        }
        Ok(())
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_detach(&mut self, channel: u16, detach: Detach) -> Result<(), Error> {
        trace!(channel, frame = ?detach);
        let key = self.session_key(channel)?;
        let may_write = self.may_write();
        let session = self.sessions.get_mut(key).ok_or(Error::UnknownSession)?;

        let link_key = session
            .link_by_input_handle
            .remove(&detach.handle)
            .ok_or_else(|| {
                Error::amqp_error(
                    SessionError::UnattachedHandle,
                    format!("detach on unattached handle {}", detach.handle.0),
                )
            })?;
        let sender = session
            .links
            .get_mut(link_key)
            .ok_or_else(|| Error::illegal_state("link was removed"))?;
        sender.on_incoming_detach(detach)?;

        let condition = sender.remote_error.clone();
        self.events.push(Event::RemoteClose {
            level: Level::Link(LinkHandle {
                session: key,
                link: link_key,
            }),
            condition,
        });

        if sender.state == LinkState::DetachReceived && may_write {
            let detach = sender.detach(None)?;
            let frame = Frame::new(session.outgoing_channel, FrameBody::Detach(detach));
            self.send_frame(frame)?;
        }
        Ok(())
    }
}

/// Groups sorted delivery ids into inclusive ranges of consecutive ids
fn contiguous_ranges(ids: &[DeliveryNumber]) -> Vec<(DeliveryNumber, DeliveryNumber)> {
    let mut ranges: Vec<(DeliveryNumber, DeliveryNumber)> = Vec::new();
    for &id in ids {
        match ranges.last_mut() {
            Some((_, last)) if last.wrapping_add(1) == id => *last = id,
            _ => ranges.push((id, id)),
        }
    }
    ranges
}
