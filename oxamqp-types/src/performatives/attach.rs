use oxamqp_codec::{
    primitives::{Array, OrderedMap, Symbol},
    DeserializeComposite, SerializeComposite, Value,
};

use crate::{
    definitions::{Fields, Handle, ReceiverSettleMode, Role, SenderSettleMode, SequenceNo},
    messaging::{Source, Target},
};

/// 2.7.3 Attach
/// Attach a link to a session.
/// <type name="attach" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:attach:list" code="0x00000000:0x00000012"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:attach:list",
    code = 0x0000_0000_0000_0012,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Attach {
    /// <field name="name" type="string" mandatory="true"/>
    ///
    /// This name uniquely identifies the link from the container of the source
    /// to the container of the target node
    pub name: String,

    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="role" type="role" mandatory="true"/>
    pub role: Role,

    /// <field name="snd-settle-mode" type="sender-settle-mode" default="mixed"/>
    #[amqp_contract(default)]
    pub snd_settle_mode: SenderSettleMode,

    /// <field name="rcv-settle-mode" type="receiver-settle-mode" default="first"/>
    #[amqp_contract(default)]
    pub rcv_settle_mode: ReceiverSettleMode,

    /// <field name="source" type="*" requires="source"/>
    pub source: Option<Source>,

    /// <field name="target" type="*" requires="target"/>
    pub target: Option<Target>,

    /// <field name="unsettled" type="map"/>
    pub unsettled: Option<OrderedMap<Value, Value>>,

    /// <field name="incomplete-unsettled" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub incomplete_unsettled: bool,

    /// <field name="initial-delivery-count" type="sequence-no"/>
    ///
    /// This MUST NOT be null if role is sender, and it is ignored if the role
    /// is receiver.
    pub initial_delivery_count: Option<SequenceNo>,

    /// <field name="max-message-size" type="ulong"/>
    pub max_message_size: Option<u64>,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Array<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Array<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Attach {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0012;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:attach:list";
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use crate::{
        definitions::{Handle, ReceiverSettleMode, Role, SenderSettleMode},
        messaging::{Source, Target},
    };

    use super::Attach;

    #[test]
    fn test_serde_attach() {
        let attach = Attach {
            name: "my_sender".into(),
            handle: Handle(0),
            role: Role::Sender,
            snd_settle_mode: SenderSettleMode::Unsettled,
            rcv_settle_mode: ReceiverSettleMode::First,
            source: Some(Source::default()),
            target: Some(Target::new("example")),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: Some(0),
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        let buf = to_vec(&attach).unwrap();
        let decoded = from_slice::<Attach>(&buf).unwrap();
        assert_eq!(decoded, attach);
    }

    #[test]
    fn default_settle_modes_are_left_out() {
        let attach = Attach {
            name: "l".into(),
            handle: Handle(1),
            role: Role::Sender,
            snd_settle_mode: SenderSettleMode::default(),
            rcv_settle_mode: ReceiverSettleMode::default(),
            source: None,
            target: None,
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: None,
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        let buf = to_vec(&attach).unwrap();
        // name, handle, role
        assert_eq!(
            buf,
            vec![0x00, 0x53, 0x12, 0xc0, 0x07, 0x03, 0xa1, 0x01, b'l', 0x52, 0x01, 0x42]
        );
    }
}
