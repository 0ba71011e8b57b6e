use std::fmt::Display;

use oxamqp_codec::{DeserializeComposite, SerializeComposite};

use super::{ErrorCondition, Fields};

/// <type name="error" class="composite" source="list">
/// <descriptor name="amqp:error:list" code="0x00000000:0x0000001d"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:error:list",
    code = 0x0000_0000_0000_001d,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Error {
    /// <field name="condition" type="symbol" requires="error-condition" mandatory="true"/>
    pub condition: ErrorCondition,

    /// <field name="description" type="string"/>
    pub description: Option<String>,

    /// <field name="info" type="fields"/>
    pub info: Option<Fields>,
}

impl Error {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_001d;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:error:list";

    /// Creates a new error
    pub fn new(
        condition: impl Into<ErrorCondition>,
        description: Option<String>,
        info: Option<Fields>,
    ) -> Self {
        Self {
            condition: condition.into(),
            description,
            info,
        }
    }
}

impl<T> From<T> for Error
where
    T: Into<ErrorCondition>,
{
    fn from(condition: T) -> Self {
        Self {
            condition: condition.into(),
            description: None,
            info: None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.condition, description),
            None => write!(f, "{}", self.condition),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use crate::definitions::{AmqpError, ConnectionError, ErrorCondition};

    use super::Error;

    #[test]
    fn test_serde_error() {
        let expected = Error::new(AmqpError::DecodeError, Some(String::from("bad frame")), None);
        let serialized = to_vec(&expected).unwrap();
        let deserialized: Error = from_slice(&serialized).unwrap();
        assert_eq!(expected, deserialized)
    }

    #[test]
    fn error_without_condition_is_rejected() {
        // described(0x1d) list8 [null]
        let buf = [0x00, 0x53, 0x1d, 0xc0, 0x02, 0x01, 0x40];
        assert!(from_slice::<Error>(&buf).is_err());
    }

    #[test]
    fn vendor_condition_is_kept() {
        let mut buf = vec![0x00, 0x53, 0x1d, 0xc0, 0x0c, 0x01, 0xa3, 0x09];
        buf.extend_from_slice(b"x:vendor1");
        let err: Error = from_slice(&buf).unwrap();
        assert_eq!(err.condition, ErrorCondition::Custom("x:vendor1".into()));
    }

    #[test]
    fn display_includes_description() {
        let err = Error::new(ConnectionError::ConnectionForced, Some(String::from("shutdown")), None);
        assert_eq!(err.to_string(), "amqp:connection:forced: shutdown");
    }
}
