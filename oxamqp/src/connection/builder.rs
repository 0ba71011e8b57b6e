//! Connection builder

use std::marker::PhantomData;

use oxamqp_codec::{
    buffer::{DEFAULT_INITIAL_SIZE, DEFAULT_LIMIT},
    primitives::{Array, Symbol},
};
use oxamqp_types::{
    definitions::{Fields, Milliseconds, MIN_MAX_FRAME_SIZE},
    performatives::Open,
};

use crate::session::DEFAULT_WINDOW;

use super::{ConnectionEngine, DEFAULT_CHANNEL_MAX, DEFAULT_MAX_FRAME_SIZE};

/// Type state of a builder without a container id
#[derive(Debug)]
pub struct WithoutContainerId {}

/// Type state of a builder with a container id
#[derive(Debug)]
pub struct WithContainerId {}

/// Connection builder
#[derive(Debug)]
pub struct Builder<Mode> {
    /// Container id announced in the open
    pub container_id: String,

    /// Name of the host the connection is for
    pub hostname: Option<String>,

    /// Largest incoming frame. Defaults to [`DEFAULT_MAX_FRAME_SIZE`].
    pub max_frame_size: u32,

    /// Highest channel number. Defaults to [`DEFAULT_CHANNEL_MAX`].
    pub channel_max: u16,

    /// The peer must send a frame at least this often. Defaults to no timeout.
    pub idle_time_out: Option<Milliseconds>,

    /// Capabilities offered to the peer
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// Capabilities desired from the peer
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// Connection properties
    pub properties: Option<Fields>,

    /// Incoming and outgoing window of sessions. Defaults to [`DEFAULT_WINDOW`].
    pub session_window: u32,

    /// Initial size of the buffer messages are encoded into
    pub buffer_size: usize,

    /// Size the message buffer may grow to
    pub buffer_limit: usize,

    // type state marker
    marker: PhantomData<Mode>,
}

impl Default for Builder<WithoutContainerId> {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder<WithoutContainerId> {
    /// Creates a builder with default values
    pub fn new() -> Self {
        Self {
            container_id: String::new(),
            hostname: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            channel_max: DEFAULT_CHANNEL_MAX,
            idle_time_out: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
            session_window: DEFAULT_WINDOW,
            buffer_size: DEFAULT_INITIAL_SIZE,
            buffer_limit: DEFAULT_LIMIT,
            marker: PhantomData,
        }
    }
}

impl<Mode> Builder<Mode> {
    /// Sets the container id
    pub fn container_id(self, id: impl Into<String>) -> Builder<WithContainerId> {
        Builder::<WithContainerId> {
            container_id: id.into(),
            hostname: self.hostname,
            max_frame_size: self.max_frame_size,
            channel_max: self.channel_max,
            idle_time_out: self.idle_time_out,
            offered_capabilities: self.offered_capabilities,
            desired_capabilities: self.desired_capabilities,
            properties: self.properties,
            session_window: self.session_window,
            buffer_size: self.buffer_size,
            buffer_limit: self.buffer_limit,
            marker: PhantomData,
        }
    }

    /// Sets the hostname
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Sets the max frame size. Values below 512 are raised to 512.
    pub fn max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = std::cmp::max(MIN_MAX_FRAME_SIZE as u32, max_frame_size);
        self
    }

    /// Sets the highest channel number
    pub fn channel_max(mut self, channel_max: u16) -> Self {
        self.channel_max = channel_max;
        self
    }

    /// Sets the idle timeout in milliseconds
    pub fn idle_time_out(mut self, idle_time_out: impl Into<Milliseconds>) -> Self {
        self.idle_time_out = Some(idle_time_out.into());
        self
    }

    /// Adds an offered capability
    pub fn add_offered_capabilities(mut self, capability: impl Into<Symbol>) -> Self {
        self.offered_capabilities
            .get_or_insert_with(Vec::new)
            .push(capability.into());
        self
    }

    /// Adds a desired capability
    pub fn add_desired_capabilities(mut self, capability: impl Into<Symbol>) -> Self {
        self.desired_capabilities
            .get_or_insert_with(Vec::new)
            .push(capability.into());
        self
    }

    /// Sets the connection properties
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Sets the incoming and outgoing window of sessions
    pub fn session_window(mut self, window: u32) -> Self {
        self.session_window = window;
        self
    }

    /// Sets the initial size of the message buffer
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets the size the message buffer may grow to
    pub fn buffer_limit(mut self, buffer_limit: usize) -> Self {
        self.buffer_limit = buffer_limit;
        self
    }
}

impl Builder<WithContainerId> {
    pub(crate) fn local_open(&self) -> Open {
        Open {
            container_id: self.container_id.clone(),
            hostname: self.hostname.clone(),
            max_frame_size: self.max_frame_size.into(),
            channel_max: self.channel_max.into(),
            idle_time_out: self.idle_time_out,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: self.offered_capabilities.clone().map(Array::from),
            desired_capabilities: self.desired_capabilities.clone().map(Array::from),
            properties: self.properties.clone(),
        }
    }

    /// Creates the engine. The protocol header is written immediately and
    /// [`Event::ConnectionInit`](crate::Event::ConnectionInit) is queued.
    pub fn build(self) -> ConnectionEngine {
        ConnectionEngine::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::Builder;

    #[test]
    fn defaults() {
        let builder = Builder::new().container_id("c1");
        assert_eq!(builder.max_frame_size, 256 * 1024);
        assert_eq!(builder.channel_max, 255);
        assert_eq!(builder.idle_time_out, None);
        assert_eq!(builder.buffer_size, 128);

        let open = builder.local_open();
        assert_eq!(open.container_id, "c1");
        assert_eq!(u32::from(open.max_frame_size), 256 * 1024);
        assert!(open.offered_capabilities.is_none());
    }

    #[test]
    fn max_frame_size_has_a_lower_bound() {
        let builder = Builder::new().max_frame_size(16);
        assert_eq!(builder.max_frame_size, 512);
    }

    #[test]
    fn capabilities_are_sent_as_arrays() {
        let open = Builder::new()
            .container_id("c1")
            .add_offered_capabilities("ANONYMOUS-RELAY")
            .add_offered_capabilities("DELAYED_DELIVERY")
            .local_open();
        let offered = open.offered_capabilities.unwrap();
        assert_eq!(offered.len(), 2);
        assert_eq!(offered[1].as_str(), "DELAYED_DELIVERY");
    }
}
