/// the IANA assigned port number for AMQP.
/// The standard AMQP port number that has been assigned
/// by IANA for TCP, UDP, and SCTP.
pub const PORT: u16 = 5672;

/// major protocol version.
pub const MAJOR: u8 = 1;

///  minor protocol version.
pub const MINOR: u8 = 0;

/// protocol revision
pub const REVISION: u8 = 0;

/// the lower bound for the agreed maximum frame size (in
/// bytes).
/// During the initial connection negotiation, the two peers
/// MUST agree upon a maximum frame size. This constant
/// defines the minimum value to which the maximum frame
/// size can be set.
pub const MIN_MAX_FRAME_SIZE: usize = 512;
