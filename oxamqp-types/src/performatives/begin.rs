use oxamqp_codec::{
    primitives::{Array, Symbol},
    DeserializeComposite, SerializeComposite,
};

use crate::definitions::{Fields, Handle, TransferNumber};

/// 2.7.2 Begin
/// Begin a session on a channel.
/// <type name="begin" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:begin:list" code="0x00000000:0x00000011"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:begin:list",
    code = 0x0000_0000_0000_0011,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Begin {
    /// <field name="remote-channel" type="ushort"/>
    ///
    /// If a session is locally initiated, the remote-channel MUST NOT be set.
    /// When an endpoint responds to a remotely initiated session, the
    /// remote-channel MUST be set to the channel on which the remote session
    /// sent the begin.
    pub remote_channel: Option<u16>,

    /// <field name="next-outgoing-id" type="transfer-number" mandatory="true"/>
    pub next_outgoing_id: TransferNumber,

    /// <field name="incoming-window" type="uint" mandatory="true"/>
    pub incoming_window: u32,

    /// <field name="outgoing-window" type="uint" mandatory="true"/>
    pub outgoing_window: u32,

    /// <field name="handle-max" type="handle" default="4294967295"/>
    #[amqp_contract(default)]
    pub handle_max: Handle,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Array<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Array<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Begin {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0011;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:begin:list";
}
