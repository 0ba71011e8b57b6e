//! Value type for untyped AMQP1.0 data structures.

use ordered_float::OrderedFloat;

use crate::{
    described::Described,
    primitives::{Array, Binary, Dec128, Dec32, Dec64, OrderedMap, Symbol, Timestamp, Uuid},
};

mod convert;
mod de;
mod ser;

/// Primitive type definitions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Described type
    ///
    /// Box is used to reduce the memory size of the Value type.
    Described(Box<Described<Value>>),

    /// Indicates an empty value
    ///
    /// encoding code = 0x40,
    /// category = fixed, width = 0,
    /// label = "the null value"
    Null,

    /// Represents a true or false value
    ///
    /// encoding code = 0x56, 0x41 (true) or 0x42 (false)
    Bool(bool),

    /// Integer in the range 0 to 2^8-1 inclusive
    ///
    /// encoding code = 0x50,
    /// category = fixed, width = 1
    UByte(u8),

    /// Integer in the range 0 to 2^16-1 inclusive
    ///
    /// encoding code = 0x60,
    /// category = fixed, width = 2
    UShort(u16),

    /// Integer in the range 0 to 2^32-1 inclusive
    ///
    /// encoding code = 0x70 (uint), 0x52 (smalluint) or 0x43 (uint0)
    UInt(u32),

    /// Integer in the range 0 to 2^64-1 inclusive
    ///
    /// encoding code = 0x80 (ulong), 0x53 (smallulong) or 0x44 (ulong0)
    ULong(u64),

    /// Integer in the range -(2^7) to 2^7-1 inclusive
    ///
    /// encoding code = 0x51,
    /// category = fixed, width = 1
    Byte(i8),

    /// Integer in the range -(2^15) to 2^15-1 inclusive
    ///
    /// encoding code = 0x61,
    /// category = fixed, width = 2
    Short(i16),

    /// Integer in the range -(2^31) to 2^31-1 inclusive
    ///
    /// encoding code = 0x71 (int) or 0x54 (smallint)
    Int(i32),

    /// Integer in the range -(2^63) to 2^63-1 inclusive
    ///
    /// encoding code = 0x81 (long) or 0x55 (smalllong)
    Long(i64),

    /// 32-bit floating point number (IEEE 754-2008 binary32)
    ///
    /// encoding code = 0x72
    Float(OrderedFloat<f32>),

    /// 64-bit floating point number (IEEE 754-2008 binary64)
    ///
    /// encoding code = 0x82
    Double(OrderedFloat<f64>),

    /// encoding code = 0x74
    Decimal32(Dec32),

    /// encoding code = 0x84
    Decimal64(Dec64),

    /// encoding code = 0x94
    Decimal128(Dec128),

    /// A single Unicode character
    ///
    /// encoding code = 0x73,
    /// category = fixed, width = 4
    Char(char),

    /// An absolute point in time
    ///
    /// encoding code = 0x83
    Timestamp(Timestamp),

    /// A universally unique identifier
    ///
    /// encoding code = 0x98
    Uuid(Uuid),

    /// A sequence of octets
    ///
    /// encoding code = 0xa0 (vbin8) or 0xb0 (vbin32)
    Binary(Binary),

    /// A sequence of Unicode characters
    ///
    /// encoding code = 0xa1 (str8-utf8) or 0xb1 (str32-utf8)
    String(String),

    /// Symbolic values from a constrained domain
    ///
    /// encoding code = 0xa3 (sym8) or 0xb3 (sym32)
    Symbol(Symbol),

    /// A sequence of polymorphic values
    ///
    /// encoding code = 0x45 (list0), 0xc0 (list8) or 0xd0 (list32)
    List(Vec<Value>),

    /// A polymorphic mapping from distinct keys to values
    ///
    /// encoding code = 0xc1 (map8) or 0xd1 (map32)
    Map(OrderedMap<Value, Value>),

    /// A sequence of values of a single type
    ///
    /// encoding code = 0xe0 (array8) or 0xf0 (array32)
    Array(Array),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Whether the value is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Described(_) => "described",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::UByte(_) => "ubyte",
            Value::UShort(_) => "ushort",
            Value::UInt(_) => "uint",
            Value::ULong(_) => "ulong",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Decimal32(_) => "decimal32",
            Value::Decimal64(_) => "decimal64",
            Value::Decimal128(_) => "decimal128",
            Value::Char(_) => "char",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Binary(_) => "binary",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
        }
    }

    /// Whether both values would share one array element constructor
    pub fn same_type(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Described(a), Value::Described(b)) => {
                a.descriptor == b.descriptor && a.value.same_type(&b.value)
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// Borrow the string content of a string or a symbol
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Widen any integer value into an `i64` if it fits
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::UByte(v) => Some(v as i64),
            Value::UShort(v) => Some(v as i64),
            Value::UInt(v) => Some(v as i64),
            Value::ULong(v) => i64::try_from(v).ok(),
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }
}
