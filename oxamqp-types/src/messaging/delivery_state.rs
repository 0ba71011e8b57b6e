//! Part 3.4 delivery state

use oxamqp_codec::{DeserializeComposite, SerializeComposite};

use crate::definitions::{Error, Fields};

/// 3.4 Delivery State
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryState {
    /// 3.4.1 Received
    Received(Received),

    /// 3.4.2 Accepted
    Accepted(Accepted),

    /// 3.4.3 Rejected
    Rejected(Rejected),

    /// 3.4.4 Released
    Released(Released),

    /// 3.4.5 Modified
    Modified(Modified),
}

impl DeliveryState {
    /// Whether a state is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryState::Received(_))
    }

    /// Whether the state is [`DeliveryState::Accepted`]
    pub fn is_accepted(&self) -> bool {
        matches!(self, DeliveryState::Accepted(_))
    }
}

/// 3.4.1 Received
/// <type name="received" class="composite" source="list" provides="delivery-state">
///     <descriptor name="amqp:received:list" code="0x00000000:0x00000023"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:received:list",
    code = 0x0000_0000_0000_0023,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Received {
    /// <field name="section-number" type="uint" mandatory="true"/>
    pub section_number: u32,

    /// <field name="section-offset" type="ulong" mandatory="true"/>
    pub section_offset: u64,
}

/// 3.4.2 Accepted
/// <type name="accepted" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:accepted:list" code="0x00000000:0x00000024"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:accepted:list",
    code = 0x0000_0000_0000_0024,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Accepted {}

/// 3.4.3 Rejected
/// <type name="rejected" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:rejected:list" code="0x00000000:0x00000025"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:rejected:list",
    code = 0x0000_0000_0000_0025,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Rejected {
    /// <field name="error" type="error"/>
    pub error: Option<Error>,
}

/// 3.4.4 Released
/// <type name="released" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:released:list" code="0x00000000:0x00000026"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:released:list",
    code = 0x0000_0000_0000_0026,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Released {}

/// 3.4.5 Modified
/// <type name="modified" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:modified:list" code="0x00000000:0x00000027"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:modified:list",
    code = 0x0000_0000_0000_0027,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Modified {
    /// <field name="delivery-failed" type="boolean"/>
    pub delivery_failed: Option<bool>,

    /// <field name="undeliverable-here" type="boolean"/>
    pub undeliverable_here: Option<bool>,

    /// <field name="message-annotations" type="fields"/>
    pub message_annotations: Option<Fields>,
}

mod delivery_state_impl {
    use serde::{
        de::{self, VariantAccess},
        ser,
    };

    use super::DeliveryState;

    impl ser::Serialize for DeliveryState {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: ser::Serializer,
        {
            match self {
                DeliveryState::Received(value) => value.serialize(serializer),
                DeliveryState::Accepted(value) => value.serialize(serializer),
                DeliveryState::Rejected(value) => value.serialize(serializer),
                DeliveryState::Released(value) => value.serialize(serializer),
                DeliveryState::Modified(value) => value.serialize(serializer),
            }
        }
    }

    enum Field {
        Received,
        Accepted,
        Rejected,
        Released,
        Modified,
    }

    struct FieldVisitor {}

    impl<'de> de::Visitor<'de> for FieldVisitor {
        type Value = Field;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("delivery state descriptor")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let val = match v {
                "amqp:received:list" => Field::Received,
                "amqp:accepted:list" => Field::Accepted,
                "amqp:rejected:list" => Field::Rejected,
                "amqp:released:list" => Field::Released,
                "amqp:modified:list" => Field::Modified,
                _ => return Err(de::Error::custom("Wrong symbol value for descriptor")),
            };
            Ok(val)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let val = match v {
                0x0000_0000_0000_0023 => Field::Received,
                0x0000_0000_0000_0024 => Field::Accepted,
                0x0000_0000_0000_0025 => Field::Rejected,
                0x0000_0000_0000_0026 => Field::Released,
                0x0000_0000_0000_0027 => Field::Modified,
                _ => {
                    return Err(de::Error::custom(format!(
                        "Wrong code value for descriptor, found {:#x?}",
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
        type Value = DeliveryState;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("enum DeliveryState")
        }

        fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
        where
            A: de::EnumAccess<'de>,
        {
            let (val, variant) = data.variant()?;
            let state = match val {
                Field::Received => DeliveryState::Received(variant.newtype_variant()?),
                Field::Accepted => DeliveryState::Accepted(variant.newtype_variant()?),
                Field::Rejected => DeliveryState::Rejected(variant.newtype_variant()?),
                Field::Released => DeliveryState::Released(variant.newtype_variant()?),
                Field::Modified => DeliveryState::Modified(variant.newtype_variant()?),
            };
            Ok(state)
        }
    }

    impl<'de> de::Deserialize<'de> for DeliveryState {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            const VARIANTS: &[&str] = &[
                "amqp:received:list",
                "amqp:accepted:list",
                "amqp:rejected:list",
                "amqp:released:list",
                "amqp:modified:list",
            ];
            deserializer.deserialize_enum("DeliveryState", VARIANTS, Visitor {})
        }
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use crate::definitions::{AmqpError, Error};

    use super::{Accepted, DeliveryState, Received, Rejected, Released};

    #[test]
    fn test_serialize_accepted() {
        let buf = to_vec(&DeliveryState::Accepted(Accepted {})).unwrap();
        assert_eq!(buf, vec![0x00, 0x53, 0x24, 0x45]);
    }

    #[test]
    fn rejected_keeps_error() {
        let state = DeliveryState::Rejected(Rejected {
            error: Some(Error::from(AmqpError::NotAllowed)),
        });
        let buf = to_vec(&state).unwrap();
        assert_eq!(from_slice::<DeliveryState>(&buf).unwrap(), state);
    }

    #[test]
    fn received_is_not_terminal() {
        let state = DeliveryState::Received(Received {
            section_number: 0,
            section_offset: 0,
        });
        assert!(!state.is_terminal());
        assert!(DeliveryState::Released(Released {}).is_terminal());
    }

    #[test]
    fn unknown_outcome_is_an_error() {
        // amqp:declared:list belongs to transactions
        let buf = [0x00, 0x53, 0x33, 0x45];
        assert!(from_slice::<DeliveryState>(&buf).is_err());
    }
}
