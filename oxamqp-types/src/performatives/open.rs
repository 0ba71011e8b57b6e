use oxamqp_codec::{
    primitives::{Array, Symbol},
    DeserializeComposite, SerializeComposite,
};
use serde::{Deserialize, Serialize};

use crate::definitions::{Fields, Milliseconds};

/// Negotiate connection parameters.
/// <type name="open" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:open:list" code="0x00000000:0x00000010"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:open:list",
    code = 0x0000_0000_0000_0010,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Open {
    /// <field name="container-id" type="string" mandatory="true"/>
    pub container_id: String,

    /// <field name="hostname" type="string"/>
    pub hostname: Option<String>,

    /// <field name="max-frame-size" type="uint" default="4294967295"/>
    ///
    /// The largest frame size that the sending peer is able to accept on this
    /// connection.
    #[amqp_contract(default)]
    pub max_frame_size: MaxFrameSize,

    /// <field name="channel-max" type="ushort" default="65535"/>
    ///
    /// The channel-max value is the highest channel number that can be used on
    /// the connection.
    #[amqp_contract(default)]
    pub channel_max: ChannelMax,

    /// <field name="idle-time-out" type="milliseconds"/>
    pub idle_time_out: Option<Milliseconds>,

    /// <field name="outgoing-locales" type="ietf-language-tag" multiple="true"/>
    pub outgoing_locales: Option<Array<Symbol>>,

    /// <field name="incoming-locales" type="ietf-language-tag" multiple="true"/>
    pub incoming_locales: Option<Array<Symbol>>,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Array<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Array<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Open {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0010;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:open:list";

    /// Creates an open with every optional field left to its default
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            hostname: None,
            max_frame_size: MaxFrameSize::default(),
            channel_max: ChannelMax::default(),
            idle_time_out: None,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }
}

/// Proposed maximum frame size, `u32::MAX` when the peer imposes no limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxFrameSize(pub u32);

impl Default for MaxFrameSize {
    fn default() -> Self {
        MaxFrameSize(u32::MAX)
    }
}

impl From<u32> for MaxFrameSize {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<MaxFrameSize> for u32 {
    fn from(value: MaxFrameSize) -> Self {
        value.0
    }
}

/// The maximum channel number that may be used on the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMax(pub u16);

impl Default for ChannelMax {
    fn default() -> Self {
        ChannelMax(u16::MAX)
    }
}

impl From<u16> for ChannelMax {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<ChannelMax> for u16 {
    fn from(value: ChannelMax) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, primitives::Symbol, to_vec};

    use super::{ChannelMax, MaxFrameSize, Open};

    #[test]
    fn test_serialize_open_omits_defaults() {
        let open = Open::new("1234");
        let buf = to_vec(&open).unwrap();
        // described(smallulong 0x10) list8 [str8 "1234"]
        assert_eq!(
            buf,
            vec![0x00, 0x53, 0x10, 0xc0, 0x07, 0x01, 0xa1, 0x04, b'1', b'2', b'3', b'4']
        );
    }

    #[test]
    fn test_deserialize_open() {
        let mut open = Open::new("peer");
        open.max_frame_size = MaxFrameSize(512);
        open.channel_max = ChannelMax(9);
        open.idle_time_out = Some(30_000);
        open.offered_capabilities = Some(vec![Symbol::from("ANONYMOUS-RELAY")].into());
        let buf = to_vec(&open).unwrap();
        let decoded: Open = from_slice(&buf).unwrap();
        assert_eq!(decoded, open);
    }

    #[test]
    fn null_before_a_set_field_reads_as_default() {
        // container-id, null hostname, null max-frame-size, channel-max 7
        let buf = [
            0x00, 0x53, 0x10, 0xc0, 0x09, 0x04, 0xa1, 0x01, b'a', 0x40, 0x40, 0x60, 0x00, 0x07,
        ];
        let open: Open = from_slice(&buf).unwrap();
        assert_eq!(open.hostname, None);
        assert_eq!(open.max_frame_size, MaxFrameSize(u32::MAX));
        assert_eq!(open.channel_max, ChannelMax(7));
    }

    #[test]
    fn open_without_container_id_is_rejected() {
        let buf = [0x00, 0x53, 0x10, 0x45];
        assert!(from_slice::<Open>(&buf).is_err());
    }
}
