use crate::format_code::EncodingCodes;

/// Primitive that a newtype name asks the next `serialize_*` or
/// `deserialize_*` call to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum NewType {
    #[default]
    None,
    Symbol,
    Array,
    Uuid,
    Timestamp,
    Dec32,
    Dec64,
    Dec128,
}

impl NewType {
    pub(crate) fn from_name(name: &str) -> Self {
        use crate::__constants::*;
        match name {
            SYMBOL => NewType::Symbol,
            ARRAY => NewType::Array,
            UUID => NewType::Uuid,
            TIMESTAMP => NewType::Timestamp,
            DECIMAL32 => NewType::Dec32,
            DECIMAL64 => NewType::Dec64,
            DECIMAL128 => NewType::Dec128,
            _ => NewType::None,
        }
    }
}

/// Which enum `deserialize_identifier` is resolving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum EnumType {
    #[default]
    None,
    Value,
    Descriptor,
}

/// Position of a value inside an array.
///
/// Array elements share one constructor, written before the first element.
/// The following elements only write their bodies and must use the same
/// constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum IsArrayElement {
    #[default]
    False,
    FirstElement,
    OtherElement(EncodingCodes),
}
