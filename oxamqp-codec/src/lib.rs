//! A serde implementation of the self-describing AMQP 1.0 type system.
//!
//! Every encoded value starts with a one byte format code (see
//! [`format_code::EncodingCodes`]) so a decoder without any schema can
//! rebuild the structure of the value.
//!
//! ```rust
//! use oxamqp_codec::{from_slice, to_vec, primitives::OrderedMap, Value};
//!
//! let mut map = OrderedMap::new();
//! map.insert(Value::from("sequence"), Value::from(1i32));
//! let value = Value::Map(map);
//!
//! let buf = to_vec(&value).unwrap();
//! let decoded: Value = from_slice(&buf).unwrap();
//! assert_eq!(value, decoded);
//! ```
//!
//! # Described types
//!
//! With the `derive` feature, [`SerializeComposite`] and
//! [`DeserializeComposite`] turn a struct into a described list (or a
//! described single value), which is how performatives and message sections
//! are encoded.
//!
//! # Caller owned buffers
//!
//! [`write_to_slice`] never writes a partial value. When the slice is too
//! small it returns [`Error::Overflow`] and leaves the slice untouched, and
//! [`EncodeBuffer`] builds the "grow and retry" loop on top of that.

// Public mods
pub mod buffer;
pub mod de;
pub mod described;
pub mod descriptor;
pub mod error;
pub mod format_code;
pub mod primitives;
pub mod read;
pub mod ser;
pub mod value;

mod util;

#[doc(hidden)]
#[path = "constants.rs"]
pub mod __constants;

pub use buffer::EncodeBuffer;
pub use de::{from_slice, Deserializer};
pub use error::Error;
pub use ser::{to_vec, write_to_slice, Serializer};
pub use value::Value;

pub use serde;

#[cfg(feature = "derive")]
pub use oxamqp_derive::{DeserializeComposite, SerializeComposite};

/// Convenience re-exports
pub mod prelude {
    pub use super::{
        described::Described, descriptor::Descriptor, from_slice, primitives::*, to_vec,
        write_to_slice, Error, Value,
    };
}
