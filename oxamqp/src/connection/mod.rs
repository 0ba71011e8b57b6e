//! Implements the connection endpoint and the connection engine

use oxamqp_types::{
    definitions,
    performatives::{Close, Open},
    states::ConnectionState,
};

use crate::Error;

pub mod builder;
mod endpoint;
mod engine;
mod heartbeat;

pub use builder::Builder;
pub use endpoint::Endpoint;
pub use engine::ConnectionEngine;

/// Default max frame size
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 256 * 1024;

/// Default channel max
pub const DEFAULT_CHANNEL_MAX: u16 = 255;

/// Local and remote view of the connection endpoint
#[derive(Debug)]
pub(crate) struct Connection {
    pub state: ConnectionState,
    pub local_open: Open,
    pub remote_open: Option<Open>,
    agreed_channel_max: u16,
    close_sent: bool,

    pub local_error: Option<definitions::Error>,
    pub remote_error: Option<definitions::Error>,
}

impl Connection {
    pub fn new(local_open: Open) -> Self {
        let agreed_channel_max = local_open.channel_max.0;
        Self {
            state: ConnectionState::Start,
            local_open,
            remote_open: None,
            agreed_channel_max,
            close_sent: false,
            local_error: None,
            remote_error: None,
        }
    }

    /// The peer's protocol header arrived
    pub fn on_header_received(&mut self) {
        if let ConnectionState::Start = self.state {
            self.state = ConnectionState::HeaderExchange
        }
    }

    pub fn open(&mut self) -> Result<Open, Error> {
        match self.state {
            ConnectionState::Start | ConnectionState::HeaderExchange => {
                self.state = ConnectionState::OpenSent
            }
            ConnectionState::OpenReceived => self.state = ConnectionState::Opened,
            _ => return Err(Error::illegal_state("connection is already open")),
        }
        Ok(self.local_open.clone())
    }

    pub fn on_incoming_open(&mut self, open: Open) -> Result<(), Error> {
        match self.state {
            ConnectionState::HeaderExchange => self.state = ConnectionState::OpenReceived,
            ConnectionState::OpenSent => self.state = ConnectionState::Opened,
            _ => return Err(Error::illegal_state("unexpected open")),
        }

        // The channel-max is the minimum of what both peers announce
        self.agreed_channel_max = std::cmp::min(self.local_open.channel_max.0, open.channel_max.0);
        self.remote_open = Some(open);
        Ok(())
    }

    pub fn close(&mut self, error: Option<definitions::Error>) -> Result<Close, Error> {
        match self.state {
            ConnectionState::OpenSent | ConnectionState::Opened => {
                self.state = ConnectionState::CloseSent
            }
            ConnectionState::CloseReceived => self.state = ConnectionState::End,
            _ => return Err(Error::illegal_state("connection cannot be closed")),
        }

        self.close_sent = true;
        self.local_error = error.clone();
        Ok(Close { error })
    }

    pub fn on_incoming_close(&mut self, close: Close) -> Result<(), Error> {
        match self.state {
            ConnectionState::OpenSent | ConnectionState::Opened => {
                self.state = ConnectionState::CloseReceived
            }
            ConnectionState::CloseSent => self.state = ConnectionState::End,
            _ => return Err(Error::illegal_state("unexpected close")),
        }

        self.remote_error = close.error;
        Ok(())
    }

    pub fn close_sent(&self) -> bool {
        self.close_sent
    }

    pub fn open_sent(&self) -> bool {
        !matches!(
            self.state,
            ConnectionState::Start | ConnectionState::HeaderExchange | ConnectionState::OpenReceived
        )
    }

    pub fn is_opened(&self) -> bool {
        matches!(self.state, ConnectionState::Opened)
    }

    pub fn channel_max(&self) -> u16 {
        self.agreed_channel_max
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_types::{
        definitions::ConnectionError,
        performatives::{ChannelMax, Close, Open},
        states::ConnectionState,
    };

    use super::Connection;

    fn connection() -> Connection {
        let mut open = Open::new("local");
        open.channel_max = ChannelMax(255);
        Connection::new(open)
    }

    #[test]
    fn local_open_first() {
        let mut conn = connection();
        conn.open().unwrap();
        assert_eq!(conn.state, ConnectionState::OpenSent);
        conn.on_header_received();
        assert_eq!(conn.state, ConnectionState::OpenSent);

        let mut remote = Open::new("remote");
        remote.channel_max = ChannelMax(7);
        conn.on_incoming_open(remote).unwrap();
        assert_eq!(conn.state, ConnectionState::Opened);
        assert_eq!(conn.channel_max(), 7);
        assert!(conn.open().is_err());
    }

    #[test]
    fn remote_open_first() {
        let mut conn = connection();
        assert!(conn.on_incoming_open(Open::new("remote")).is_err());
        conn.on_header_received();
        conn.on_incoming_open(Open::new("remote")).unwrap();
        assert_eq!(conn.state, ConnectionState::OpenReceived);
        assert!(!conn.open_sent());
        conn.open().unwrap();
        assert!(conn.is_opened());
        assert_eq!(conn.channel_max(), 255);
    }

    #[test]
    fn close_handshake() {
        let mut conn = connection();
        conn.on_header_received();
        conn.open().unwrap();
        conn.on_incoming_open(Open::new("remote")).unwrap();

        conn.close(None).unwrap();
        assert_eq!(conn.state, ConnectionState::CloseSent);
        assert!(conn.close_sent());
        assert!(conn.close(None).is_err());

        conn.on_incoming_close(Close::new(Some(ConnectionError::ConnectionForced.into())))
            .unwrap();
        assert_eq!(conn.state, ConnectionState::End);
        assert!(conn.remote_error.is_some());
    }

    #[test]
    fn states_never_move_backwards() {
        let mut conn = connection();
        let mut ranks = vec![conn.state.rank()];
        conn.on_header_received();
        ranks.push(conn.state.rank());
        conn.open().unwrap();
        ranks.push(conn.state.rank());
        conn.on_incoming_open(Open::new("remote")).unwrap();
        ranks.push(conn.state.rank());
        conn.on_incoming_close(Close::new(None)).unwrap();
        ranks.push(conn.state.rank());
        conn.close(None).unwrap();
        ranks.push(conn.state.rank());

        assert!(ranks.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(conn.state, ConnectionState::End);
        assert!(conn.on_incoming_open(Open::new("again")).is_err());
    }
}
