use std::{marker::PhantomData, ops::Deref};

use serde::{de, ser};

use crate::{__constants::ARRAY, value::Value, Error};

/// A sequence of values of a single type
///
/// encoding name = "array8", encoding code = 0xe0
/// category = array, width = 1,
/// label = "up to 2^8 - 1 array elements with total size less than 2^8 octets"
///
/// encoding name = "array32", encoding code = 0xf0,
/// category = array, width = 4
/// label = "up to 2^32 - 1 array elements with total size less than 2^32 octets"
///
/// All elements share one constructor on the wire. Serializing elements
/// that would need different constructors fails with
/// [`Error::HeterogeneousArray`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Array<T = Value>(pub Vec<T>);

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl Array<Value> {
    /// Creates an array of untyped values, checking that all elements share
    /// the same type
    pub fn new(values: Vec<Value>) -> Result<Self, Error> {
        if let Some(first) = values.first() {
            if !values.iter().all(|v| v.same_type(first)) {
                return Err(Error::HeterogeneousArray);
            }
        }
        Ok(Self(values))
    }
}

impl<T> Array<T> {
    /// Elements of the array
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// Consumes the array and returns the elements
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Array<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<Vec<T>> for Array<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(Vec::from_iter(iter))
    }
}

impl<T: ser::Serialize> ser::Serialize for Array<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_newtype_struct(ARRAY, &self.0)
    }
}

struct Visitor<T> {
    marker: PhantomData<T>,
}

impl<'de, T: de::Deserialize<'de>> de::Visitor<'de> for Visitor<T> {
    type Value = Array<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("struct Array")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(elem) = seq.next_element()? {
            vec.push(elem);
        }
        Ok(Array(vec))
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, T: de::Deserialize<'de>> de::Deserialize<'de> for Array<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_newtype_struct(
            ARRAY,
            Visitor {
                marker: PhantomData,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Array;
    use crate::{primitives::Symbol, Error, Value};

    #[test]
    fn untyped_array_requires_one_type() {
        assert!(Array::new(vec![Value::UInt(1), Value::UInt(2)]).is_ok());
        assert!(matches!(
            Array::new(vec![Value::UInt(1), Value::from("a")]),
            Err(Error::HeterogeneousArray)
        ));
    }

    #[test]
    fn typed_array_derefs_to_its_elements() {
        let array: Array<Symbol> = vec![Symbol::from("a")].into();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0].as_str(), "a");
    }
}
