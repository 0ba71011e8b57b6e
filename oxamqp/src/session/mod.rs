//! Implements the session endpoint

use std::collections::BTreeMap;

use oxamqp_types::{
    definitions::{self, DeliveryNumber, DeliveryTag, Handle, TransferNumber},
    messaging::Target,
    performatives::{Begin, End, Flow},
    states::SessionState,
};
use slab::Slab;

use crate::{link::SenderLink, Error};

/// Default incoming and outgoing window of a session
pub const DEFAULT_WINDOW: u32 = 2048;

/// Identifies a session of a [`ConnectionEngine`](crate::ConnectionEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(pub(crate) usize);

impl SessionHandle {
    /// The outgoing channel of the session
    pub fn channel(&self) -> u16 {
        self.0 as u16
    }
}

#[derive(Debug)]
pub(crate) struct Session {
    pub state: SessionState,
    pub outgoing_channel: u16,
    pub incoming_channel: Option<u16>,

    // local amqp states
    initial_outgoing_id: TransferNumber,
    pub next_outgoing_id: TransferNumber,
    pub incoming_window: u32,
    pub outgoing_window: u32,
    pub handle_max: Handle,
    pub next_delivery_id: DeliveryNumber,

    // remote amqp states
    pub next_incoming_id: Option<TransferNumber>,
    pub remote_incoming_window: u32,
    pub remote_outgoing_window: u32,

    // local links
    pub links: Slab<SenderLink>,
    pub link_by_name: BTreeMap<String, usize>,
    pub link_by_input_handle: BTreeMap<Handle, usize>,
    pub delivery_map: BTreeMap<DeliveryNumber, (usize, DeliveryTag)>,

    pub local_error: Option<definitions::Error>,
    pub remote_error: Option<definitions::Error>,
}

impl Session {
    pub fn new(outgoing_channel: u16, incoming_window: u32, outgoing_window: u32) -> Self {
        Self {
            state: SessionState::Unmapped,
            outgoing_channel,
            incoming_channel: None,
            initial_outgoing_id: 0,
            next_outgoing_id: 0,
            incoming_window,
            outgoing_window,
            handle_max: Handle::default(),
            next_delivery_id: 0,
            next_incoming_id: None,
            remote_incoming_window: 0,
            remote_outgoing_window: 0,
            links: Slab::new(),
            link_by_name: BTreeMap::new(),
            link_by_input_handle: BTreeMap::new(),
            delivery_map: BTreeMap::new(),
            local_error: None,
            remote_error: None,
        }
    }

    pub fn begin(&mut self) -> Result<Begin, Error> {
        match self.state {
            SessionState::Unmapped => self.state = SessionState::BeginSent,
            SessionState::BeginReceived => self.state = SessionState::Mapped,
            _ => return Err(Error::illegal_state("session has already begun")),
        }

        Ok(Begin {
            remote_channel: self.incoming_channel,
            next_outgoing_id: self.next_outgoing_id,
            incoming_window: self.incoming_window,
            outgoing_window: self.outgoing_window,
            handle_max: self.handle_max,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        })
    }

    pub fn on_incoming_begin(&mut self, channel: u16, begin: Begin) -> Result<(), Error> {
        match self.state {
            SessionState::Unmapped => self.state = SessionState::BeginReceived,
            SessionState::BeginSent => self.state = SessionState::Mapped,
            _ => return Err(Error::illegal_state("unexpected begin")),
        }

        self.incoming_channel = Some(channel);
        self.next_incoming_id = Some(begin.next_outgoing_id);
        self.remote_incoming_window = begin.incoming_window;
        self.remote_outgoing_window = begin.outgoing_window;
        self.handle_max = std::cmp::min(self.handle_max, begin.handle_max);
        Ok(())
    }

    pub fn end(&mut self, error: Option<definitions::Error>) -> Result<End, Error> {
        match self.state {
            SessionState::BeginSent | SessionState::Mapped => self.state = SessionState::EndSent,
            SessionState::EndReceived => self.state = SessionState::Ended,
            _ => return Err(Error::illegal_state("session is not mapped")),
        }

        self.local_error = error.clone();
        Ok(End { error })
    }

    pub fn on_incoming_end(&mut self, end: End) -> Result<(), Error> {
        match self.state {
            SessionState::BeginSent | SessionState::Mapped => {
                self.state = SessionState::EndReceived
            }
            SessionState::EndSent => self.state = SessionState::Ended,
            _ => return Err(Error::illegal_state("unexpected end")),
        }

        self.remote_error = end.error;
        Ok(())
    }

    pub fn on_incoming_flow(&mut self, flow: &Flow) {
        self.next_incoming_id = Some(flow.next_outgoing_id);
        self.remote_outgoing_window = flow.outgoing_window;

        // Transfers the peer had not seen when it sent the flow still count
        // against its window
        let base = flow.next_incoming_id.unwrap_or(self.initial_outgoing_id);
        let in_flight = self.next_outgoing_id.wrapping_sub(base);
        self.remote_incoming_window = flow.incoming_window.saturating_sub(in_flight);
    }

    /// A flow carrying only the session fields
    pub fn flow(&self) -> Flow {
        Flow {
            next_incoming_id: self.next_incoming_id,
            incoming_window: self.incoming_window,
            next_outgoing_id: self.next_outgoing_id,
            outgoing_window: self.outgoing_window,
            ..Default::default()
        }
    }

    pub fn can_send_transfer(&self) -> bool {
        self.state == SessionState::Mapped && self.remote_incoming_window > 0
    }

    /// Accounts for transfer frames written on this session
    pub fn on_outgoing_transfers(&mut self, frames: u32) {
        self.next_outgoing_id = self.next_outgoing_id.wrapping_add(frames);
        self.remote_incoming_window = self.remote_incoming_window.saturating_sub(frames);
    }

    pub fn allocate_delivery_id(&mut self) -> DeliveryNumber {
        let id = self.next_delivery_id;
        self.next_delivery_id = self.next_delivery_id.wrapping_add(1);
        id
    }

    pub fn allocate_link(&mut self, name: String, target: Target) -> Result<usize, Error> {
        if self.link_by_name.contains_key(&name) {
            return Err(Error::illegal_state("link name is already in use"));
        }

        let entry = self.links.vacant_entry();
        let key = entry.key();
        let handle = Handle(key as u32);
        if key > self.handle_max.0 as usize {
            return Err(Error::HandleMaxReached);
        }
        entry.insert(SenderLink::new(name.clone(), handle, target));
        self.link_by_name.insert(name, key);
        Ok(key)
    }
}
