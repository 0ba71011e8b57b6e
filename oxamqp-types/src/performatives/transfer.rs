use oxamqp_codec::{DeserializeComposite, SerializeComposite};

use crate::{
    definitions::{DeliveryNumber, DeliveryTag, Handle, MessageFormat, ReceiverSettleMode},
    messaging::DeliveryState,
};

/// 2.7.5 Transfer
/// Transfer a message.
/// <type name="transfer" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:transfer:list" code="0x00000000:0x00000014"/>
/// </type>
///
/// The payload of the transfer follows the performative in the frame body and
/// is not part of this type.
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:transfer:list",
    code = 0x0000_0000_0000_0014,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Transfer {
    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="delivery-id" type="delivery-number"/>
    ///
    /// The delivery-id MUST be supplied on the first transfer of a multi-transfer
    /// delivery.
    pub delivery_id: Option<DeliveryNumber>,

    /// <field name="delivery-tag" type="delivery-tag"/>
    ///
    /// Uniquely identifies the delivery attempt for a given message on this link.
    /// This field MUST be specified for the first transfer of a multi-transfer
    /// message and can only be omitted for continuation transfers.
    pub delivery_tag: Option<DeliveryTag>,

    /// <field name="message-format" type="message-format"/>
    pub message_format: Option<MessageFormat>,

    /// <field name="settled" type="boolean"/>
    pub settled: Option<bool>,

    /// <field name="more" type="boolean" default="false"/>
    ///
    /// Note that if both the more and aborted fields are set to true, the
    /// aborted flag takes precedence.
    #[amqp_contract(default)]
    pub more: bool,

    /// <field name="rcv-settle-mode" type="receiver-settle-mode"/>
    pub rcv_settle_mode: Option<ReceiverSettleMode>,

    /// <field name="state" type="*" requires="delivery-state"/>
    pub state: Option<DeliveryState>,

    /// <field name="resume" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub resume: bool,

    /// <field name="aborted" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub aborted: bool,

    /// <field name="batchable" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub batchable: bool,
}

impl Transfer {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0014;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:transfer:list";

    /// The first transfer of a delivery
    pub fn new(handle: Handle, delivery_id: DeliveryNumber, delivery_tag: DeliveryTag) -> Self {
        Self {
            handle,
            delivery_id: Some(delivery_id),
            delivery_tag: Some(delivery_tag),
            message_format: Some(0),
            settled: None,
            more: false,
            rcv_settle_mode: None,
            state: None,
            resume: false,
            aborted: false,
            batchable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, primitives::Binary, to_vec};

    use crate::definitions::Handle;

    use super::Transfer;

    #[test]
    fn test_serialize_first_transfer() {
        let transfer = Transfer::new(Handle(0), 0, Binary::from(vec![0, 0, 0, 0, 0, 0, 0, 1]));
        let buf = to_vec(&transfer).unwrap();
        let expected = vec![
            0x00, 0x53, 0x14, // descriptor
            0xc0, 0x0e, 0x04, // list8, size, count
            0x43, 0x43, // handle, delivery-id
            0xa0, 0x08, 0, 0, 0, 0, 0, 0, 0, 1, // delivery-tag
            0x43, // message-format
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn settled_transfer_keeps_its_flags() {
        let mut transfer = Transfer::new(Handle(3), 9, Binary::from(vec![7]));
        transfer.settled = Some(true);
        transfer.batchable = true;
        let buf = to_vec(&transfer).unwrap();
        let decoded: Transfer = from_slice(&buf).unwrap();
        assert_eq!(decoded, transfer);
        assert!(!decoded.more);
    }
}
