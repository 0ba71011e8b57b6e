//! Events produced by the connection engine

use std::collections::VecDeque;

use oxamqp_types::definitions;

use crate::{
    link::{DeliveryUpdate, LinkHandle},
    session::SessionHandle,
};

/// The endpoint a remote close refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// The peer sent a close
    Connection,

    /// The peer sent an end
    Session(SessionHandle),

    /// The peer sent a detach
    Link(LinkHandle),
}

/// State transitions and inbound performatives the application may react to
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The engine was created. This is always the first event.
    ConnectionInit,

    /// The peer's open arrived
    ConnectionRemoteOpen,

    /// The peer answered a begin
    SessionRemoteOpen(SessionHandle),

    /// The peer answered an attach
    LinkRemoteOpen(LinkHandle),

    /// A flow updated the credit of a link
    LinkFlow(LinkHandle),

    /// The peer updated the state of a delivery
    Delivery(DeliveryUpdate),

    /// The transport failed with a condition. The engine has stopped
    /// reading input.
    TransportError(definitions::Error),

    /// The peer closed an endpoint, possibly with an error condition
    RemoteClose {
        /// The closed endpoint
        level: Level,

        /// The condition the peer reported
        condition: Option<definitions::Error>,
    },

    /// Both directions of the transport are closed. This is always the last
    /// event.
    TransportClosed,
}

impl Event {
    /// Name of the event for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::ConnectionInit => "connection_init",
            Event::ConnectionRemoteOpen => "connection_remote_open",
            Event::SessionRemoteOpen(_) => "session_remote_open",
            Event::LinkRemoteOpen(_) => "link_remote_open",
            Event::LinkFlow(_) => "link_flow",
            Event::Delivery(_) => "delivery",
            Event::TransportError(_) => "transport_error",
            Event::RemoteClose { .. } => "remote_close",
            Event::TransportClosed => "transport_closed",
        }
    }
}

/// First in first out queue of events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Removes the oldest event
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, EventQueue};

    #[test]
    fn events_come_out_in_arrival_order() {
        let mut queue = EventQueue::new();
        queue.push(Event::ConnectionInit);
        queue.push(Event::ConnectionRemoteOpen);
        queue.push(Event::TransportClosed);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(Event::ConnectionInit));
        assert_eq!(queue.pop(), Some(Event::ConnectionRemoteOpen));
        assert_eq!(queue.pop(), Some(Event::TransportClosed));
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }
}
