use oxamqp_codec::{DeserializeComposite, SerializeComposite};

use crate::definitions::{Fields, Handle, SequenceNo, TransferNumber};

/// 2.7.4 Flow
/// Update link state.
/// <type name="flow" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:flow:list" code="0x00000000:0x00000013"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:flow:list",
    code = 0x0000_0000_0000_0013,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Flow {
    /// <field name="next-incoming-id" type="transfer-number"/>
    ///
    /// Identifies the expected transfer-id of the next incoming transfer frame.
    pub next_incoming_id: Option<TransferNumber>,

    /// <field name="incoming-window" type="uint" mandatory="true"/>
    ///
    /// Defines the maximum number of incoming transfer frames that the endpoint
    /// can currently receive.
    pub incoming_window: u32,

    /// <field name="next-outgoing-id" type="transfer-number" mandatory="true"/>
    ///
    /// The transfer-id that will be assigned to the next outgoing transfer frame.
    pub next_outgoing_id: TransferNumber,

    /// <field name="outgoing-window" type="uint" mandatory="true"/>
    pub outgoing_window: u32,

    /// <field name="handle" type="handle"/>
    ///
    /// If set, indicates that the flow frame carries flow state information for
    /// the local link endpoint associated with the given handle. If not set,
    /// the flow frame is carrying only information pertaining to the session endpoint.
    pub handle: Option<Handle>,

    /// <field name="delivery-count" type="sequence-no"/>
    ///
    /// When the handle field is not set, this field MUST NOT be set.
    pub delivery_count: Option<SequenceNo>,

    /// <field name="link-credit" type="uint"/>
    ///
    /// The current maximum number of messages that can be handled at the
    /// receiver endpoint of the link.
    pub link_credit: Option<u32>,

    /// <field name="available" type="uint"/>
    pub available: Option<u32>,

    /// <field name="drain" type="boolean" default="false"/>
    ///
    /// When flow state is sent from the receiver to the sender, this field
    /// contains the desired drain mode of the receiver.
    #[amqp_contract(default)]
    pub drain: bool,

    /// <field name="echo" type="boolean" default="false"/>
    ///
    /// Request state from partner
    #[amqp_contract(default)]
    pub echo: bool,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl Flow {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0013;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:flow:list";
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use super::Flow;

    #[test]
    fn test_deserialize_flow_from_wide_encoding() {
        // list32 with next-incoming-id=1, incoming-window=2048,
        // next-outgoing-id=1, outgoing-window=2048, handle=0,
        // delivery-count=0, link-credit=100
        let buf = [
            0x00, 0x53, 0x13, 0xd0, 0x00, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x07, 0x52, 0x01,
            0x70, 0x00, 0x00, 0x08, 0x00, 0x52, 0x01, 0x70, 0x00, 0x00, 0x08, 0x00, 0x43, 0x43,
            0x70, 0x00, 0x00, 0x00, 0x64,
        ];
        let flow = from_slice::<Flow>(&buf).unwrap();
        assert_eq!(flow.next_incoming_id, Some(1));
        assert_eq!(flow.incoming_window, 2048);
        assert_eq!(flow.handle.map(|h| h.0), Some(0));
        assert_eq!(flow.link_credit, Some(100));
        assert!(!flow.drain);
        assert!(!flow.echo);
    }

    #[test]
    fn drain_is_written_only_when_set() {
        let mut flow = Flow {
            incoming_window: 10,
            outgoing_window: 10,
            ..Default::default()
        };
        let buf = to_vec(&flow).unwrap();
        // next-incoming-id, incoming-window, next-outgoing-id, outgoing-window
        assert_eq!(buf[3..6], [0xc0, 0x07, 0x04]);

        flow.drain = true;
        let buf = to_vec(&flow).unwrap();
        assert_eq!(buf[5], 9);
        assert_eq!(buf.last(), Some(&0x41));
        assert_eq!(from_slice::<Flow>(&buf).unwrap(), flow);
    }
}
