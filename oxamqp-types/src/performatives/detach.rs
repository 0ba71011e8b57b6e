use oxamqp_codec::{DeserializeComposite, SerializeComposite};

use crate::definitions::{Error, Handle};

/// 2.7.7 Detach
/// Detach the link endpoint from the session.
/// <type name="detach" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:detach:list" code="0x00000000:0x00000016"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:detach:list",
    code = 0x0000_0000_0000_0016,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Detach {
    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="closed" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub closed: bool,

    /// <field name="error" type="error"/>
    pub error: Option<Error>,
}

impl Detach {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0016;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:detach:list";
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use crate::definitions::{Handle, LinkError};

    use super::Detach;

    #[test]
    fn closing_detach_with_error() {
        let detach = Detach {
            handle: Handle(2),
            closed: true,
            error: Some(LinkError::DetachForced.into()),
        };
        let buf = to_vec(&detach).unwrap();
        assert_eq!(from_slice::<Detach>(&buf).unwrap(), detach);
    }

    #[test]
    fn missing_closed_reads_as_false() {
        // described(0x16) list8 [smalluint 2]
        let buf = [0x00, 0x53, 0x16, 0xc0, 0x03, 0x01, 0x52, 0x02];
        let detach: Detach = from_slice(&buf).unwrap();
        assert_eq!(detach.handle, Handle(2));
        assert!(!detach.closed);
        assert!(detach.error.is_none());
    }
}
