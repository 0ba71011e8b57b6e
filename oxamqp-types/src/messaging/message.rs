//! 3.2 Message format

use oxamqp_codec::{
    __constants::DESCRIBED_BASIC,
    described::Described,
    primitives::{Binary, Symbol, Timestamp, Uuid},
    DeserializeComposite, Deserializer, Error as CodecError, SerializeComposite, Value,
};
use serde::{
    de,
    ser::{self, SerializeStruct},
    Deserialize, Serialize,
};

/// 3.2.11 Message ID
///
/// <type name="message-id-ulong" class="restricted" source="ulong" provides="message-id"/>
/// <type name="message-id-uuid" class="restricted" source="uuid" provides="message-id"/>
/// <type name="message-id-binary" class="restricted" source="binary" provides="message-id"/>
/// <type name="message-id-string" class="restricted" source="string" provides="message-id"/>
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// 3.2.11 Message ID ULong
    ULong(u64),

    /// 3.2.12 Message ID UUID
    Uuid(Uuid),

    /// 3.2.13 Message ID Binary
    Binary(Binary),

    /// 3.2.14 Message ID String
    String(String),
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        MessageId::ULong(id)
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        MessageId::Uuid(id)
    }
}

impl From<Binary> for MessageId {
    fn from(id: Binary) -> Self {
        MessageId::Binary(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        MessageId::String(id)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        MessageId::String(id.to_string())
    }
}

impl ser::Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            MessageId::ULong(id) => id.serialize(serializer),
            MessageId::Uuid(id) => id.serialize(serializer),
            MessageId::Binary(id) => id.serialize(serializer),
            MessageId::String(id) => id.serialize(serializer),
        }
    }
}

// The format code decides the variant
impl<'de> de::Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::ULong(id) => Ok(MessageId::ULong(id)),
            Value::Uuid(id) => Ok(MessageId::Uuid(id)),
            Value::Binary(id) => Ok(MessageId::Binary(id)),
            Value::String(id) => Ok(MessageId::String(id)),
            other => Err(de::Error::custom(format!(
                "a message id cannot be {}",
                other.type_name()
            ))),
        }
    }
}

/// 3.2.4 Properties
/// Immutable properties of the message.
/// <type name="properties" class="composite" source="list" provides="section">
///     <descriptor name="amqp:properties:list" code="0x00000000:0x00000073"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:properties:list",
    code = 0x0000_0000_0000_0073,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Properties {
    /// <field name="message-id" type="*" requires="message-id"/>
    pub message_id: Option<MessageId>,

    /// <field name="user-id" type="binary"/>
    pub user_id: Option<Binary>,

    /// <field name="to" type="*" requires="address"/>
    pub to: Option<String>,

    /// <field name="subject" type="string"/>
    pub subject: Option<String>,

    /// <field name="reply-to" type="*" requires="address"/>
    pub reply_to: Option<String>,

    /// <field name="correlation-id" type="*" requires="message-id"/>
    pub correlation_id: Option<MessageId>,

    /// <field name="content-type" type="symbol"/>
    pub content_type: Option<Symbol>,

    /// <field name="content-encoding" type="symbol"/>
    pub content_encoding: Option<Symbol>,

    /// <field name="absolute-expiry-time" type="timestamp"/>
    pub absolute_expiry_time: Option<Timestamp>,

    /// <field name="creation-time" type="timestamp"/>
    pub creation_time: Option<Timestamp>,

    /// <field name="group-id" type="string"/>
    pub group_id: Option<String>,

    /// <field name="group-sequence" type="sequence-no"/>
    pub group_sequence: Option<u32>,

    /// <field name="reply-to-group-id" type="string"/>
    pub reply_to_group_id: Option<String>,
}

/// 3.2.6 Data
/// <type name="data" class="restricted" source="binary" provides="section">
///     <descriptor name="amqp:data:binary" code="0x00000000:0x00000075"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:data:binary",
    code = 0x0000_0000_0000_0075,
    encoding = "basic"
)]
pub struct Data(pub Binary);

impl Data {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0075;
}

/// 3.2.8 AMQP Value
/// <type name="amqp-value" class="restricted" source="*" provides="section">
///     <descriptor name="amqp:amqp-value:*" code="0x00000000:0x00000077"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:amqp-value:*",
    code = 0x0000_0000_0000_0077,
    encoding = "basic"
)]
pub struct AmqpValue(pub Value);

impl AmqpValue {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0077;
}

/// Body of a message
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// 3.2.8 AMQP Value, a single AMQP value
    Value(Value),

    /// 3.2.6 Data, opaque binary data
    Data(Binary),

    /// No body section
    #[default]
    Empty,
}

/// An AMQP 1.0 message made of an optional properties section and a body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Properties section
    pub properties: Option<Properties>,

    /// Body section
    pub body: Body,
}

impl Message {
    /// Creates a builder for [`Message`]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Decode a message from the payload of a delivery.
    ///
    /// Header, annotation, application property, sequence and footer
    /// sections are skipped. Consecutive data sections are joined.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CodecError> {
        let mut de = Deserializer::new(slice);
        let mut message = Message::default();
        let mut data: Option<Vec<u8>> = None;

        while !de.remaining().is_empty() {
            match Section::deserialize(&mut de)? {
                Section::Properties(properties) => message.properties = Some(properties),
                Section::Data(Data(bytes)) => {
                    data.get_or_insert_with(Vec::new).extend_from_slice(&bytes)
                }
                Section::AmqpValue(AmqpValue(value)) => message.body = Body::Value(value),
                Section::Skipped => {}
            }
        }

        if let Some(data) = data {
            message.body = Body::Data(Binary::from(data));
        }
        Ok(message)
    }
}

// The sections follow each other without any framing
impl ser::Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut state = serializer.serialize_struct(DESCRIBED_BASIC, 2)?;
        if let Some(properties) = &self.properties {
            state.serialize_field("properties", properties)?;
        }
        match &self.body {
            Body::Value(value) => {
                state.serialize_field("body", &Described::new(AmqpValue::CODE, value))?
            }
            Body::Data(data) => {
                state.serialize_field("body", &Described::new(Data::CODE, data))?
            }
            Body::Empty => {}
        }
        state.end()
    }
}

/// A section of a received message
enum Section {
    Properties(Properties),
    Data(Data),
    AmqpValue(AmqpValue),
    Skipped,
}

mod section_impl {
    use serde::de::{self, IgnoredAny, VariantAccess};

    use super::Section;

    enum Field {
        Properties,
        Data,
        AmqpValue,
        Skipped,
    }

    struct FieldVisitor {}

    impl<'de> de::Visitor<'de> for FieldVisitor {
        type Value = Field;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("message section descriptor")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let val = match v {
                "amqp:properties:list" => Field::Properties,
                "amqp:data:binary" => Field::Data,
                "amqp:amqp-value:*" => Field::AmqpValue,
                "amqp:header:list"
                | "amqp:delivery-annotations:map"
                | "amqp:message-annotations:map"
                | "amqp:application-properties:map"
                | "amqp:amqp-sequence:list"
                | "amqp:footer:map" => Field::Skipped,
                _ => {
                    return Err(de::Error::custom(format!(
                        "unknown message section {}",
                        v
                    )))
                }
            };
            Ok(val)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let val = match v {
                0x0000_0000_0000_0073 => Field::Properties,
                0x0000_0000_0000_0075 => Field::Data,
                0x0000_0000_0000_0077 => Field::AmqpValue,
                0x0000_0000_0000_0070..=0x0000_0000_0000_0072
                | 0x0000_0000_0000_0074
                | 0x0000_0000_0000_0076
                | 0x0000_0000_0000_0078 => Field::Skipped,
                _ => {
                    return Err(de::Error::custom(format!(
                        "unknown message section {:#x}",
                        v
                    )))
                }
            };
            Ok(val)
        }
    }

    impl<'de> de::Deserialize<'de> for Field {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            deserializer.deserialize_identifier(FieldVisitor {})
        }
    }

    struct Visitor {}

    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Section;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("message section")
        }

        fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
        where
            A: de::EnumAccess<'de>,
        {
            let (val, variant) = data.variant()?;
            let section = match val {
                Field::Properties => Section::Properties(variant.newtype_variant()?),
                Field::Data => Section::Data(variant.newtype_variant()?),
                Field::AmqpValue => Section::AmqpValue(variant.newtype_variant()?),
                Field::Skipped => {
                    variant.newtype_variant::<IgnoredAny>()?;
                    Section::Skipped
                }
            };
            Ok(section)
        }
    }

    impl<'de> de::Deserialize<'de> for Section {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            const VARIANTS: &[&str] = &[
                "amqp:properties:list",
                "amqp:data:binary",
                "amqp:amqp-value:*",
            ];
            deserializer.deserialize_enum("Section", VARIANTS, Visitor {})
        }
    }
}

/// Builder for [`Message`]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    properties: Option<Properties>,
    body: Body,
}

impl Builder {
    fn properties_mut(&mut self) -> &mut Properties {
        self.properties.get_or_insert_with(Properties::default)
    }

    /// Set the whole properties section
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Set the message-id property
    pub fn message_id(mut self, id: impl Into<MessageId>) -> Self {
        self.properties_mut().message_id = Some(id.into());
        self
    }

    /// Set the to property
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.properties_mut().to = Some(to.into());
        self
    }

    /// Set the subject property
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.properties_mut().subject = Some(subject.into());
        self
    }

    /// Use an AMQP value as the body
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.body = Body::Value(value.into());
        self
    }

    /// Use opaque binary data as the body
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.body = Body::Data(Binary::from(data.into()));
        self
    }

    /// Build the message
    pub fn build(self) -> Message {
        Message {
            properties: self.properties,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{
        primitives::{Binary, OrderedMap},
        to_vec, Value,
    };

    use super::{Body, Message, MessageId};

    fn sequence_message(n: i32) -> Message {
        let mut map = OrderedMap::new();
        map.insert(Value::from("sequence"), Value::Int(n));
        Message::builder()
            .message_id(n as u64)
            .value(Value::Map(map))
            .build()
    }

    #[test]
    fn test_serialize_value_body() {
        let message = Message::builder().value(Value::UInt(1)).build();
        let buf = to_vec(&message).unwrap();
        assert_eq!(buf, vec![0x00, 0x53, 0x77, 0x52, 0x01]);
    }

    #[test]
    fn properties_come_before_the_body() {
        let message = Message::builder().message_id(5u64).data(vec![0xab]).build();
        let buf = to_vec(&message).unwrap();
        let expected = vec![
            0x00, 0x53, 0x73, 0xc0, 0x03, 0x01, 0x53, 0x05, // properties
            0x00, 0x53, 0x75, 0xa0, 0x01, 0xab, // data
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn map_message_decodes_to_same_message() {
        let message = sequence_message(7);
        let buf = to_vec(&message).unwrap();
        assert_eq!(Message::from_slice(&buf).unwrap(), message);
    }

    #[test]
    fn data_sections_are_concatenated() {
        let buf = [
            0x00, 0x53, 0x75, 0xa0, 0x02, b'h', b'e', // data
            0x00, 0x53, 0x75, 0xa0, 0x02, b'l', b'o', // data
        ];
        let message = Message::from_slice(&buf).unwrap();
        assert_eq!(message.body, Body::Data(Binary::from(b"helo".to_vec())));
    }

    #[test]
    fn header_section_is_skipped() {
        let buf = [
            0x00, 0x53, 0x70, 0x45, // header
            0x00, 0x53, 0x77, 0x40, // amqp-value null
        ];
        let message = Message::from_slice(&buf).unwrap();
        assert_eq!(message.body, Body::Value(Value::Null));
        assert!(message.properties.is_none());
    }

    #[test]
    fn unknown_section_is_an_error() {
        let buf = [0x00, 0x53, 0x79, 0x40];
        assert!(Message::from_slice(&buf).is_err());
    }

    #[test]
    fn message_id_string() {
        let message = Message::builder().message_id("abc").build();
        let properties = message.properties.unwrap();
        assert_eq!(properties.message_id, Some(MessageId::String("abc".into())));
    }

    #[test]
    fn message_id_must_be_an_id_type() {
        let buf = [0x00, 0x53, 0x73, 0xc0, 0x02, 0x01, 0x41];
        assert!(Message::from_slice(&buf).is_err());
    }
}
