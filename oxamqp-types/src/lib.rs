#![deny(missing_debug_implementations)]

//! Implements the AMQP1.0 types used on the send path as defined in the [specification](http://docs.oasis-open.org/amqp/core/v1.0/os/amqp-core-overview-v1.0-os.html).
//!
//! Composite types (performatives, message sections, delivery states) derive
//! their serde implementations with `SerializeComposite` and
//! `DeserializeComposite`. Trailing null fields are omitted on the wire and
//! missing fields decode as their default.

pub mod definitions;
pub mod messaging;
pub mod performatives;
pub mod states;
