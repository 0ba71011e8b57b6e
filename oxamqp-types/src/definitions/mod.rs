//! Types defined in AMQP 1.0 specification Part 2.8: Definitions

use oxamqp_codec::{
    primitives::{Binary, OrderedMap, Symbol},
    Value,
};
use serde::{de, ser, Deserialize, Serialize};

/// 2.8.14 Error
mod error;
pub use error::Error;

/// 2.8.15 - 2.8.18 Error conditions
mod error_cond;
pub use error_cond::{AmqpError, ConnectionError, ErrorCondition, LinkError, SessionError};

/// 2.8.19 Constant definition
mod constant_def;
pub use constant_def::{MAJOR, MINOR, MIN_MAX_FRAME_SIZE, PORT, REVISION};

/// 2.8.1 Role
///
/// Link endpoint role. Encoded as a boolean, `false` for sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// <choice name="sender" value="false"/>
    Sender,

    /// <choice name="receiver" value="true"/>
    Receiver,
}

impl ser::Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_bool(matches!(self, Role::Receiver))
    }
}

impl<'de> de::Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        match bool::deserialize(deserializer)? {
            false => Ok(Role::Sender),
            true => Ok(Role::Receiver),
        }
    }
}

/// 2.8.2 Sender Settle Mode
///
/// Settlement policy for a sender.
/// <type name="sender-settle-mode" class="restricted" source="ubyte">
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderSettleMode {
    /// <choice name="unsettled" value="0"/>
    Unsettled,
    /// <choice name="settled" value="1"/>
    Settled,
    /// <choice name="mixed" value="2"/>
    #[default]
    Mixed,
}

impl From<SenderSettleMode> for u8 {
    fn from(mode: SenderSettleMode) -> Self {
        match mode {
            SenderSettleMode::Unsettled => 0,
            SenderSettleMode::Settled => 1,
            SenderSettleMode::Mixed => 2,
        }
    }
}

impl ser::Serialize for SenderSettleMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        u8::from(*self).serialize(serializer)
    }
}

impl<'de> de::Deserialize<'de> for SenderSettleMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            0 => Ok(SenderSettleMode::Unsettled),
            1 => Ok(SenderSettleMode::Settled),
            2 => Ok(SenderSettleMode::Mixed),
            v => Err(de::Error::custom(format!(
                "invalid sender-settle-mode {}",
                v
            ))),
        }
    }
}

/// 2.8.3 Receiver Settle Mode
///
/// Settlement policy for a receiver.
/// <type name="receiver-settle-mode" class="restricted" source="ubyte">
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverSettleMode {
    /// <choice name="first" value="0"/>
    #[default]
    First,
    /// <choice name="second" value="1"/>
    Second,
}

impl From<ReceiverSettleMode> for u8 {
    fn from(mode: ReceiverSettleMode) -> Self {
        match mode {
            ReceiverSettleMode::First => 0,
            ReceiverSettleMode::Second => 1,
        }
    }
}

impl ser::Serialize for ReceiverSettleMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        u8::from(*self).serialize(serializer)
    }
}

impl<'de> de::Deserialize<'de> for ReceiverSettleMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            0 => Ok(ReceiverSettleMode::First),
            1 => Ok(ReceiverSettleMode::Second),
            v => Err(de::Error::custom(format!(
                "invalid receiver-settle-mode {}",
                v
            ))),
        }
    }
}

/// 2.8.4 Handle
///
/// The handle MUST NOT be used for a link that is not attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(pub u32);

impl Default for Handle {
    fn default() -> Self {
        Handle(u32::MAX)
    }
}

impl From<u32> for Handle {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<Handle> for u32 {
    fn from(val: Handle) -> Self {
        val.0
    }
}

/// 2.8.5 Seconds
pub type Seconds = u32;

/// 2.8.6 Milliseconds
pub type Milliseconds = u32;

/// 2.8.7 Delivery Tag
/// A delivery-tag can be up to 32 octets of binary data
pub type DeliveryTag = Binary;

/// 2.8.8 Delivery Number
pub type DeliveryNumber = SequenceNo;

/// 2.8.9 Transfer Number
pub type TransferNumber = SequenceNo;

/// 2.8.10 Sequence No
///
/// Serial number arithmetic (RFC-1982) with 32 bits: wraps around on overflow.
pub type SequenceNo = u32;

/// 2.8.11 Message Format
pub type MessageFormat = u32;

/// 2.8.13 Fields
pub type Fields = OrderedMap<Symbol, Value>;

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use super::{Handle, ReceiverSettleMode, Role, SenderSettleMode};

    #[test]
    fn role_is_a_boolean() {
        assert_eq!(to_vec(&Role::Sender).unwrap(), vec![0x42]);
        assert_eq!(from_slice::<Role>(&[0x41]).unwrap(), Role::Receiver);
        assert_eq!(from_slice::<Role>(&[0x56, 0x01]).unwrap(), Role::Receiver);
    }

    #[test]
    fn settle_modes_are_ubytes() {
        assert_eq!(to_vec(&SenderSettleMode::Mixed).unwrap(), vec![0x50, 0x02]);
        assert_eq!(
            from_slice::<ReceiverSettleMode>(&[0x50, 0x01]).unwrap(),
            ReceiverSettleMode::Second
        );
        assert!(from_slice::<SenderSettleMode>(&[0x50, 0x03]).is_err());
    }

    #[test]
    fn default_handle_is_max() {
        assert_eq!(Handle::default(), Handle(u32::MAX));
        assert_eq!(to_vec(&Handle(0)).unwrap(), vec![0x43]);
    }
}
