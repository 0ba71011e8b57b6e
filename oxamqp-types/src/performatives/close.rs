use oxamqp_codec::{DeserializeComposite, SerializeComposite};

use crate::definitions::Error;

/// 2.7.9 Close
/// Signal a connection close.
/// <type name="close" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:close:list" code="0x00000000:0x00000018"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:close:list",
    code = 0x0000_0000_0000_0018,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Close {
    /// <field name="error" type="error"/>
    ///
    /// If set, this field indicates that the connection is being closed due
    /// to an error condition.
    pub error: Option<Error>,
}

impl Close {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0018;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:close:list";

    /// Creates a new close
    pub fn new(error: Option<Error>) -> Self {
        Self { error }
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use crate::definitions::{AmqpError, Error};

    use super::Close;

    #[test]
    fn test_serialize_empty_close() {
        let buf = to_vec(&Close::new(None)).unwrap();
        assert_eq!(buf, vec![0x00, 0x53, 0x18, 0x45]);
    }

    #[test]
    fn close_carries_error() {
        let close = Close::new(Some(Error::from(AmqpError::InternalError)));
        let buf = to_vec(&close).unwrap();
        assert_eq!(from_slice::<Close>(&buf).unwrap(), close);
    }
}
