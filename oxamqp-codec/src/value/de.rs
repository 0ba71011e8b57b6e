use std::convert::TryFrom;

use ordered_float::OrderedFloat;
use serde::de::{self, VariantAccess};

use crate::{__constants::VALUE, format_code::EncodingCodes};

use super::Value;

const VARIANTS: &[&str] = &[
    "Described",
    "Null",
    "Bool",
    "UByte",
    "UShort",
    "UInt",
    "ULong",
    "Byte",
    "Short",
    "Int",
    "Long",
    "Float",
    "Double",
    "Decimal32",
    "Decimal64",
    "Decimal128",
    "Char",
    "Timestamp",
    "Uuid",
    "Binary",
    "String",
    "Symbol",
    "List",
    "Map",
    "Array",
];

enum Field {
    Described,
    Null,
    Bool,
    UByte,
    UShort,
    UInt,
    ULong,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal32,
    Decimal64,
    Decimal128,
    Char,
    Timestamp,
    Uuid,
    Binary,
    String,
    Symbol,
    List,
    Map,
    Array,
}

struct FieldVisitor {}

impl<'de> de::Visitor<'de> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("field of enum Value")
    }

    fn visit_u8<E>(self, v: u8) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        use EncodingCodes as C;
        let field = match C::try_from(v).map_err(de::Error::custom)? {
            C::DescribedType => Field::Described,
            C::Null => Field::Null,
            C::Boolean | C::BooleanTrue | C::BooleanFalse => Field::Bool,
            C::UByte => Field::UByte,
            C::UShort => Field::UShort,
            C::UInt | C::SmallUInt | C::UInt0 => Field::UInt,
            C::ULong | C::SmallULong | C::ULong0 => Field::ULong,
            C::Byte => Field::Byte,
            C::Short => Field::Short,
            C::Int | C::SmallInt => Field::Int,
            C::Long | C::SmallLong => Field::Long,
            C::Float => Field::Float,
            C::Double => Field::Double,
            C::Decimal32 => Field::Decimal32,
            C::Decimal64 => Field::Decimal64,
            C::Decimal128 => Field::Decimal128,
            C::Char => Field::Char,
            C::Timestamp => Field::Timestamp,
            C::Uuid => Field::Uuid,
            C::VBin8 | C::VBin32 => Field::Binary,
            C::Str8 | C::Str32 => Field::String,
            C::Sym8 | C::Sym32 => Field::Symbol,
            C::List0 | C::List8 | C::List32 => Field::List,
            C::Map8 | C::Map32 => Field::Map,
            C::Array8 | C::Array32 => Field::Array,
        };
        Ok(field)
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
    type Value = Value;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("enum Value")
    }

    fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
    where
        A: de::EnumAccess<'de>,
    {
        let (field, de) = data.variant()?;

        let value = match field {
            Field::Described => Value::Described(de.newtype_variant()?),
            Field::Null => {
                de.newtype_variant::<()>()?;
                Value::Null
            }
            Field::Bool => Value::Bool(de.newtype_variant()?),
            Field::UByte => Value::UByte(de.newtype_variant()?),
            Field::UShort => Value::UShort(de.newtype_variant()?),
            Field::UInt => Value::UInt(de.newtype_variant()?),
            Field::ULong => Value::ULong(de.newtype_variant()?),
            Field::Byte => Value::Byte(de.newtype_variant()?),
            Field::Short => Value::Short(de.newtype_variant()?),
            Field::Int => Value::Int(de.newtype_variant()?),
            Field::Long => Value::Long(de.newtype_variant()?),
            Field::Float => Value::Float(OrderedFloat(de.newtype_variant::<f32>()?)),
            Field::Double => Value::Double(OrderedFloat(de.newtype_variant::<f64>()?)),
            Field::Decimal32 => Value::Decimal32(de.newtype_variant()?),
            Field::Decimal64 => Value::Decimal64(de.newtype_variant()?),
            Field::Decimal128 => Value::Decimal128(de.newtype_variant()?),
            Field::Char => Value::Char(de.newtype_variant()?),
            Field::Timestamp => Value::Timestamp(de.newtype_variant()?),
            Field::Uuid => Value::Uuid(de.newtype_variant()?),
            Field::Binary => Value::Binary(de.newtype_variant()?),
            Field::String => Value::String(de.newtype_variant()?),
            Field::Symbol => Value::Symbol(de.newtype_variant()?),
            Field::List => Value::List(de.newtype_variant()?),
            Field::Map => Value::Map(de.newtype_variant()?),
            Field::Array => Value::Array(de.newtype_variant()?),
        };
        Ok(value)
    }
}

impl<'de> de::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_enum(VALUE, VARIANTS, Visitor {})
    }
}
