use std::{convert::TryFrom, fmt::Display};

use oxamqp_codec::primitives::Symbol;
use serde::{de, ser, Deserialize, Serialize};

macro_rules! condition_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $symbol:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// The symbolic name of the condition
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $symbol,)*
                }
            }
        }

        impl<'a> TryFrom<&'a str> for $name {
            type Error = &'a str;

            fn try_from(value: &'a str) -> Result<Self, Self::Error> {
                match value {
                    $($symbol => Ok($name::$variant),)*
                    _ => Err(value),
                }
            }
        }

        impl From<$name> for ErrorCondition {
            fn from(err: $name) -> Self {
                ErrorCondition::$name(err)
            }
        }
    };
}

condition_enum! {
    /// 2.8.15 AMQP Error
    ///
    /// Shared error conditions.
    AmqpError {
        /// An internal error occurred.
        InternalError => "amqp:internal-error",
        /// A peer attempted to work with a remote entity that does not exist.
        NotFound => "amqp:not-found",
        /// A peer attempted to work with a remote entity to which it has no access.
        UnauthorizedAccess => "amqp:unauthorized-access",
        /// Data could not be decoded.
        DecodeError => "amqp:decode-error",
        /// A peer exceeded its resource allocation.
        ResourceLimitExceeded => "amqp:resource-limit-exceeded",
        /// The peer tried to use a frame in a manner that is inconsistent with the semantics
        /// defined in the specification.
        NotAllowed => "amqp:not-allowed",
        /// An invalid field was passed in a frame body.
        InvalidField => "amqp:invalid-field",
        /// The peer tried to use functionality that is not implemented in its partner.
        NotImplemented => "amqp:not-implemented",
        /// The client attempted to work with a server entity to which it has no access.
        ResourceLocked => "amqp:resource-locked",
        /// The client made a request that was not allowed because some precondition failed.
        PreconditionFailed => "amqp:precondition-failed",
        /// A server entity the client is working with has been deleted.
        ResourceDeleted => "amqp:resource-deleted",
        /// The peer sent a frame that is not permitted in the current state.
        IllegalState => "amqp:illegal-state",
        /// The peer cannot send a frame because the smallest encoding of the performative with
        /// the currently valid values would be too large to fit within a frame of the agreed
        /// maximum frame size.
        FrameSizeTooSmall => "amqp:frame-size-too-small",
    }
}

condition_enum! {
    /// 2.8.16 Connection Error
    ///
    /// Symbols used to indicate connection error conditions.
    ConnectionError {
        /// An operator intervened to close the connection for some reason.
        ConnectionForced => "amqp:connection:forced",
        /// A valid frame header cannot be formed from the incoming byte stream.
        FramingError => "amqp:connection:framing-error",
        /// The container is no longer available on the current connection.
        Redirect => "amqp:connection:redirect",
    }
}

condition_enum! {
    /// 2.8.17 Session Error
    ///
    /// Symbols used to indicate session error conditions.
    SessionError {
        /// The peer violated incoming window for the session.
        WindowViolation => "amqp:session:window-violation",
        /// Input was received for a link that was detached with an error.
        ErrantLink => "amqp:session:errant-link",
        /// An attach was received using a handle that is already in use for an attached link.
        HandleInUse => "amqp:session:handle-in-use",
        /// A frame (other than attach) was received referencing a handle which is not
        /// currently in use of an attached link.
        UnattachedHandle => "amqp:session:unattached-handle",
    }
}

condition_enum! {
    /// 2.8.18 Link Error
    ///
    /// Symbols used to indicate link error conditions.
    LinkError {
        /// An operator intervened to detach for some reason.
        DetachForced => "amqp:link:detach-forced",
        /// The peer sent more message transfers than currently allowed on the link.
        TransferLimitExceeded => "amqp:link:transfer-limit-exceeded",
        /// The peer sent a larger message than is supported on the link.
        MessageSizeExceeded => "amqp:link:message-size-exceeded",
        /// The address provided cannot be resolved to a terminus at the current container.
        Redirect => "amqp:link:redirect",
        /// The link has been attached elsewhere, causing the existing attachment to be forcibly closed.
        Stolen => "amqp:link:stolen",
    }
}

/// The `condition` field of [`Error`](super::Error)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorCondition {
    AmqpError(AmqpError),
    ConnectionError(ConnectionError),
    SessionError(SessionError),
    LinkError(LinkError),
    Custom(Symbol),
}

impl ErrorCondition {
    /// The symbolic name of the condition
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCondition::AmqpError(e) => e.as_str(),
            ErrorCondition::ConnectionError(e) => e.as_str(),
            ErrorCondition::SessionError(e) => e.as_str(),
            ErrorCondition::LinkError(e) => e.as_str(),
            ErrorCondition::Custom(s) => s.as_str(),
        }
    }
}

impl Display for ErrorCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Symbol> for ErrorCondition {
    fn from(symbol: Symbol) -> Self {
        let s = symbol.as_str();
        if let Ok(e) = AmqpError::try_from(s) {
            return e.into();
        }
        if let Ok(e) = ConnectionError::try_from(s) {
            return e.into();
        }
        if let Ok(e) = SessionError::try_from(s) {
            return e.into();
        }
        if let Ok(e) = LinkError::try_from(s) {
            return e.into();
        }
        ErrorCondition::Custom(symbol)
    }
}

impl ser::Serialize for ErrorCondition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            ErrorCondition::Custom(symbol) => symbol.serialize(serializer),
            other => Symbol::from(other.as_str()).serialize(serializer),
        }
    }
}

impl<'de> de::Deserialize<'de> for ErrorCondition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        Symbol::deserialize(deserializer).map(ErrorCondition::from)
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, primitives::Symbol, to_vec};

    use super::{AmqpError, ErrorCondition, LinkError};

    #[test]
    fn known_symbols_map_to_variants() {
        let mut buf = vec![0xa3, 16];
        buf.extend_from_slice(b"amqp:link:stolen");
        let cond: ErrorCondition = from_slice(&buf).unwrap();
        assert_eq!(cond, ErrorCondition::LinkError(LinkError::Stolen));
    }

    #[test]
    fn unknown_symbols_are_custom() {
        let cond = ErrorCondition::from(Symbol::from("com:vendor:oops"));
        assert_eq!(cond, ErrorCondition::Custom(Symbol::from("com:vendor:oops")));
        assert_eq!(cond.to_string(), "com:vendor:oops");
    }

    #[test]
    fn condition_encodes_as_symbol() {
        let buf = to_vec(&ErrorCondition::from(AmqpError::DecodeError)).unwrap();
        assert_eq!(buf, to_vec(&Symbol::from("amqp:decode-error")).unwrap());
        assert_eq!(buf[0], 0xa3);
    }
}
