//! Conversions between [`Value`] and Rust types

use std::convert::TryFrom;

use ordered_float::OrderedFloat;

use crate::{
    described::Described,
    primitives::{Array, Binary, OrderedMap, Symbol, Timestamp, Uuid},
    Error,
};

use super::Value;

fn mismatch(expecting: &str, found: &Value) -> Error {
    Error::invalid_value(format!("expecting {}, found {}", expecting, found.type_name()))
}

macro_rules! impl_primitive_conversion {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = Error;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(stringify!($variant), &other)),
                    }
                }
            }
        )*
    };
}

impl_primitive_conversion! {
    Bool => bool,
    UByte => u8,
    UShort => u16,
    UInt => u32,
    ULong => u64,
    Byte => i8,
    Short => i16,
    Int => i32,
    Long => i64,
    Char => char,
    Timestamp => Timestamp,
    Uuid => Uuid,
    Binary => Binary,
    String => String,
    Symbol => Symbol,
    List => Vec<Value>,
    Map => OrderedMap<Value, Value>,
    Array => Array,
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(OrderedFloat(value))
    }
}

impl TryFrom<Value> for f32 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(v) => Ok(v.into_inner()),
            other => Err(mismatch("Float", &other)),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(OrderedFloat(value))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Double(v) => Ok(v.into_inner()),
            other => Err(mismatch("Double", &other)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Described<Value>> for Value {
    fn from(value: Described<Value>) -> Self {
        Value::Described(Box::new(value))
    }
}

impl TryFrom<Value> for Described<Value> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Described(d) => Ok(*d),
            other => Err(mismatch("Described", &other)),
        }
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use crate::{Error, Value};

    #[test]
    fn primitive_conversions() {
        assert_eq!(Value::from(5u32), Value::UInt(5));
        assert_eq!(u32::try_from(Value::UInt(5)).unwrap(), 5);
        assert_eq!(Value::from(None::<u32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::String("a".into()));
    }

    #[test]
    fn mismatched_conversion_reports_both_types() {
        let err = u32::try_from(Value::from("text")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidValue(msg) if msg == "expecting UInt, found string"
        ));
    }
}
