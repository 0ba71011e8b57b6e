//! Magic names the serializer and deserializer recognize in the serde data
//! model. They are used by the derive macros and the AMQP primitives and are
//! not meant to be used directly.

/// Struct name of a described type whose value is a list
pub const DESCRIBED_LIST: &str = "DESCRIBED_LIST";

/// Struct name of a described type whose value is encoded as is
pub const DESCRIBED_BASIC: &str = "DESCRIBED_BASIC";

/// Enum name and field name of a descriptor
pub const DESCRIPTOR: &str = "DESCRIPTOR";

/// Enum name of [`Value`](crate::Value)
pub const VALUE: &str = "VALUE";

/// Newtype name of [`Symbol`](crate::primitives::Symbol)
pub const SYMBOL: &str = "SYMBOL";

/// Newtype name of [`Array`](crate::primitives::Array)
pub const ARRAY: &str = "ARRAY";

/// Newtype name of [`Uuid`](crate::primitives::Uuid)
pub const UUID: &str = "UUID";

/// Newtype name of [`Timestamp`](crate::primitives::Timestamp)
pub const TIMESTAMP: &str = "TIMESTAMP";

/// Newtype name of [`Dec32`](crate::primitives::Dec32)
pub const DECIMAL32: &str = "DECIMAL32";

/// Newtype name of [`Dec64`](crate::primitives::Dec64)
pub const DECIMAL64: &str = "DECIMAL64";

/// Newtype name of [`Dec128`](crate::primitives::Dec128)
pub const DECIMAL128: &str = "DECIMAL128";
