//! Definition of connection, session and link states

/// Connection states as defined in the AMQP 1.0 Protocol Part 2.4.6
///
/// Protocol header states collapse into [`ConnectionState::Start`] until the
/// header exchange completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// In this state a connection exists, but nothing has been sent or received. This is the state an
    /// implementation would be in immediately after performing a socket connect or socket accept
    Start,

    /// In this state the connection header has been sent to the peer and a connection header has
    /// been received from the peer.
    HeaderExchange,

    /// In this state the connection headers have been exchanged. An open frame has been received
    /// from the peer but an open frame has not been sent.
    OpenReceived,

    /// In this state the connection headers have been exchanged. An open frame has been sent
    /// to the peer but no open frame has yet been received.
    OpenSent,

    /// In this state the connection header and the open frame have been both sent and received.
    Opened,

    /// In this state a close frame has been received indicating that the peer has initiated an AMQP
    /// close. No further frames are expected to arrive on the connection; however, frames can still
    /// be sent.
    CloseReceived,

    /// In this state a close frame has been sent to the peer. It is illegal to write anything more
    /// onto the connection, however there could potentially still be incoming frames.
    CloseSent,

    /// In this state it is illegal for either endpoint to write anything more onto the connection. The
    /// connection can be safely closed and discarded.
    End,
}

impl ConnectionState {
    /// Position of the state in the lifecycle. States never move to a lower rank.
    pub fn rank(&self) -> u8 {
        match self {
            ConnectionState::Start => 0,
            ConnectionState::HeaderExchange => 1,
            ConnectionState::OpenReceived | ConnectionState::OpenSent => 2,
            ConnectionState::Opened => 3,
            ConnectionState::CloseReceived | ConnectionState::CloseSent => 4,
            ConnectionState::End => 5,
        }
    }
}

/// 2.5.5 Session States
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// UNMAPPED
    Unmapped,

    /// BEGIN SENT
    BeginSent,

    /// BEGIN RCVD
    BeginReceived,

    /// MAPPED
    Mapped,

    /// END SENT
    EndSent,

    /// END RCVD
    EndReceived,

    /// Both ends have been exchanged
    Ended,
}

impl SessionState {
    /// Position of the state in the lifecycle. States never move to a lower rank.
    pub fn rank(&self) -> u8 {
        match self {
            SessionState::Unmapped => 0,
            SessionState::BeginSent | SessionState::BeginReceived => 1,
            SessionState::Mapped => 2,
            SessionState::EndSent | SessionState::EndReceived => 3,
            SessionState::Ended => 4,
        }
    }
}

/// Link states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The initial state after initialization
    Unattached,

    /// An attach frame has been sent
    AttachSent,

    /// An attach frame has been received
    AttachReceived,

    /// The link is attached
    Attached,

    /// A detach frame has been sent
    DetachSent,

    /// A detach frame has been received
    DetachReceived,

    /// The link is detached
    Detached,
}

impl LinkState {
    /// Position of the state in the lifecycle. States never move to a lower rank.
    pub fn rank(&self) -> u8 {
        match self {
            LinkState::Unattached => 0,
            LinkState::AttachSent | LinkState::AttachReceived => 1,
            LinkState::Attached => 2,
            LinkState::DetachSent | LinkState::DetachReceived => 3,
            LinkState::Detached => 4,
        }
    }
}
