use std::convert::TryFrom;

use serde::{
    de::{self, VariantAccess},
    ser,
};

use crate::{__constants::DESCRIPTOR, format_code::EncodingCodes, primitives::Symbol};

/// Descriptor of a described type
///
/// Performatives and message sections are identified by numeric codes,
/// but a peer is free to send the symbolic name instead.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Descriptor {
    /// Symbolic descriptor, e.g. `amqp:open:list`
    Name(Symbol),

    /// Numeric descriptor, `domain-id << 32 | descriptor-id`
    Code(u64),
}

impl Descriptor {
    /// Creates a symbolic descriptor
    pub fn name(name: impl Into<Symbol>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a numeric descriptor
    pub fn code(code: u64) -> Self {
        Self::Code(code)
    }

    /// Whether the descriptor identifies the type with the given code or name
    pub fn matches(&self, code: u64, name: &str) -> bool {
        match self {
            Descriptor::Code(c) => *c == code,
            Descriptor::Name(n) => n.as_str() == name,
        }
    }
}

impl From<u64> for Descriptor {
    fn from(code: u64) -> Self {
        Self::Code(code)
    }
}

impl From<Symbol> for Descriptor {
    fn from(name: Symbol) -> Self {
        Self::Name(name)
    }
}

impl ser::Serialize for Descriptor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Descriptor::Name(value) => {
                serializer.serialize_newtype_variant(DESCRIPTOR, 0, "Name", value)
            }
            Descriptor::Code(value) => {
                serializer.serialize_newtype_variant(DESCRIPTOR, 1, "Code", value)
            }
        }
    }
}

// The variant is told apart by the format code, which is not consumed
enum Field {
    Name,
    Code,
}

struct FieldVisitor {}

impl<'de> de::Visitor<'de> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("variant identifier")
    }

    fn visit_u8<E>(self, v: u8) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match EncodingCodes::try_from(v).map_err(de::Error::custom)? {
            EncodingCodes::Sym32 | EncodingCodes::Sym8 => Ok(Field::Name),
            EncodingCodes::ULong | EncodingCodes::ULong0 | EncodingCodes::SmallULong => {
                Ok(Field::Code)
            }
            other => Err(de::Error::custom(format!(
                "descriptor must be ulong or symbol, found {}",
                other
            ))),
        }
    }
}

impl<'de> de::Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_identifier(FieldVisitor {})
    }
}

struct Visitor {}

impl<'de> de::Visitor<'de> for Visitor {
    type Value = Descriptor;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("enum Descriptor")
    }

    fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
    where
        A: de::EnumAccess<'de>,
    {
        let (field, variant) = data.variant()?;
        match field {
            Field::Name => variant.newtype_variant().map(Descriptor::Name),
            Field::Code => variant.newtype_variant().map(Descriptor::Code),
        }
    }
}

impl<'de> de::Deserialize<'de> for Descriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        const VARIANTS: &[&str] = &["Name", "Code"];
        deserializer.deserialize_enum(DESCRIPTOR, VARIANTS, Visitor {})
    }
}
