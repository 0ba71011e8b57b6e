use std::marker::PhantomData;

use serde::{de, ser};

use crate::{
    __constants::{DESCRIBED_BASIC, DESCRIPTOR},
    descriptor::Descriptor,
};

/// A value annotated with a descriptor.
///
/// This should usually be avoided other than in Value type, where it is
/// boxed to keep the size of `Value` small.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Described<T> {
    /// Descriptor of the value
    pub descriptor: Descriptor,

    /// The described value
    pub value: T,
}

impl<T> Described<T> {
    /// Creates a described value
    pub fn new(descriptor: impl Into<Descriptor>, value: T) -> Self {
        Self {
            descriptor: descriptor.into(),
            value,
        }
    }
}

impl<T: ser::Serialize> ser::Serialize for Described<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use ser::SerializeStruct;
        let mut state = serializer.serialize_struct(DESCRIBED_BASIC, 2)?;
        state.serialize_field(DESCRIPTOR, &self.descriptor)?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

struct Visitor<T> {
    marker: PhantomData<T>,
}

impl<'de, T: de::Deserialize<'de>> de::Visitor<'de> for Visitor<T> {
    type Value = Described<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("struct Described")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let descriptor: Descriptor = match seq.next_element()? {
            Some(val) => val,
            None => return Err(de::Error::custom("Expecting descriptor")),
        };

        let value: T = match seq.next_element()? {
            Some(val) => val,
            None => {
                return Err(de::Error::custom(
                    "Insufficient number of elements. Expecting value",
                ))
            }
        };

        Ok(Described { descriptor, value })
    }
}

impl<'de, T: de::Deserialize<'de>> de::Deserialize<'de> for Described<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        const FIELDS: &[&str] = &[DESCRIPTOR, "value"];
        deserializer.deserialize_struct(
            DESCRIBED_BASIC,
            FIELDS,
            Visitor {
                marker: PhantomData,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{descriptor::Descriptor, from_slice, primitives::Symbol, to_vec};

    use super::Described;

    #[test]
    fn described_value_keeps_its_descriptor() {
        let described = Described::new(0x11u64, vec![1i32, 2]);
        let buf = to_vec(&described).unwrap();
        assert_eq!(&buf[..3], &[0x00, 0x53, 0x11]);
        let recovered: Described<Vec<i32>> = from_slice(&buf).unwrap();
        assert_eq!(recovered, described);
    }

    #[test]
    fn symbolic_descriptor_is_accepted() {
        let described = Described::new(Symbol::from("amqp:value:*"), String::from("x"));
        let buf = to_vec(&described).unwrap();
        let recovered: Described<String> = from_slice(&buf).unwrap();
        assert_eq!(recovered.descriptor, Descriptor::name("amqp:value:*"));
        assert_eq!(recovered.value, "x");
    }
}
