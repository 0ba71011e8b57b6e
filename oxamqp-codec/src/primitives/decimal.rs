//! Decimal numbers, kept as their raw IEEE 754-2008 bytes

use std::convert::TryFrom;

use serde::{de, ser};

use crate::{
    __constants::{DECIMAL128, DECIMAL32, DECIMAL64},
    Error,
};

macro_rules! impl_decimal {
    ($(#[$doc:meta])* $ty:ident, $width:literal, $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $ty(pub [u8; $width]);

        impl From<[u8; $width]> for $ty {
            fn from(bytes: [u8; $width]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $ty {
            type Error = Error;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                <[u8; $width]>::try_from(value)
                    .map(Self)
                    .map_err(|_| Error::InvalidLength)
            }
        }

        impl ser::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_newtype_struct($name, serde_bytes::Bytes::new(&self.0))
            }
        }

        impl<'de> de::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct Visitor {}

                impl<'de> de::Visitor<'de> for Visitor {
                    type Value = $ty;

                    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                        formatter.write_str(concat!("struct ", stringify!($ty)))
                    }

                    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                    where
                        E: de::Error,
                    {
                        $ty::try_from(v).map_err(de::Error::custom)
                    }

                    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
                    where
                        D: serde::Deserializer<'de>,
                    {
                        deserializer.deserialize_bytes(self)
                    }
                }

                deserializer.deserialize_newtype_struct($name, Visitor {})
            }
        }
    };
}

impl_decimal!(
    /// 32-bit decimal number (IEEE 754-2008 decimal32)
    ///
    /// encoding code = 0x74, category = fixed, width = 4
    Dec32,
    4,
    DECIMAL32
);

impl_decimal!(
    /// 64-bit decimal number (IEEE 754-2008 decimal64)
    ///
    /// encoding code = 0x84, category = fixed, width = 8
    Dec64,
    8,
    DECIMAL64
);

impl_decimal!(
    /// 128-bit decimal number (IEEE 754-2008 decimal128)
    ///
    /// encoding code = 0x94, category = fixed, width = 16
    Dec128,
    16,
    DECIMAL128
);

#[cfg(test)]
mod tests {
    use super::Dec64;
    use crate::{from_slice, to_vec};

    #[test]
    fn decimal_keeps_its_bytes() {
        let dec = Dec64([1, 2, 3, 4, 5, 6, 7, 8]);
        let buf = to_vec(&dec).unwrap();
        assert_eq!(buf, vec![0x84, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(from_slice::<Dec64>(&buf).unwrap(), dec);
    }
}
