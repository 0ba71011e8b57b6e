//! Performatives defined in AMQP 1.0 specification Part 2.7

mod attach;
mod begin;
mod close;
mod detach;
mod disposition;
mod end;
mod flow;
mod open;
mod transfer;

pub use attach::*;
pub use begin::*;
pub use close::*;
pub use detach::*;
pub use disposition::*;
pub use end::*;
pub use flow::*;
pub use open::*;
pub use transfer::*;

/// AMQP 1.0 Performatives
#[derive(Debug, Clone, PartialEq)]
pub enum Performative {
    /// Open
    Open(Open),

    /// Begin
    Begin(Begin),

    /// Attach
    Attach(Attach),

    /// Flow
    Flow(Flow),

    /// Transfer
    Transfer(Transfer),

    /// Disposition
    Disposition(Disposition),

    /// Detach
    Detach(Detach),

    /// End
    End(End),

    /// Close
    Close(Close),
}

impl Performative {
    /// Name of the performative for logging
    pub fn name(&self) -> &'static str {
        match self {
            Performative::Open(_) => "open",
            Performative::Begin(_) => "begin",
            Performative::Attach(_) => "attach",
            Performative::Flow(_) => "flow",
            Performative::Transfer(_) => "transfer",
            Performative::Disposition(_) => "disposition",
            Performative::Detach(_) => "detach",
            Performative::End(_) => "end",
            Performative::Close(_) => "close",
        }
    }
}

mod performative_impl {
    use serde::{
        de::{self, VariantAccess},
        ser,
    };

    use super::{Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Performative, Transfer};

    impl ser::Serialize for Performative {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: ser::Serializer,
        {
            match self {
                Performative::Open(value) => value.serialize(serializer),
                Performative::Begin(value) => value.serialize(serializer),
                Performative::Attach(value) => value.serialize(serializer),
                Performative::Flow(value) => value.serialize(serializer),
                Performative::Transfer(value) => value.serialize(serializer),
                Performative::Disposition(value) => value.serialize(serializer),
                Performative::Detach(value) => value.serialize(serializer),
                Performative::End(value) => value.serialize(serializer),
                Performative::Close(value) => value.serialize(serializer),
            }
        }
    }

    enum Field {
        Open,
        Begin,
        Attach,
        Flow,
        Transfer,
        Disposition,
        Detach,
        End,
        Close,
    }

    struct FieldVisitor {}

    impl<'de> de::Visitor<'de> for FieldVisitor {
        type Value = Field;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("performative descriptor")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let val = match v {
                Open::NAME => Field::Open,
                Begin::NAME => Field::Begin,
                Attach::NAME => Field::Attach,
                Flow::NAME => Field::Flow,
                Transfer::NAME => Field::Transfer,
                Disposition::NAME => Field::Disposition,
                Detach::NAME => Field::Detach,
                End::NAME => Field::End,
                Close::NAME => Field::Close,
                _ => {
                    return Err(de::Error::custom(format!(
                        "unknown performative {}",
                        v
                    )))
                }
            };
            Ok(val)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let val = match v {
                Open::CODE => Field::Open,
                Begin::CODE => Field::Begin,
                Attach::CODE => Field::Attach,
                Flow::CODE => Field::Flow,
                Transfer::CODE => Field::Transfer,
                Disposition::CODE => Field::Disposition,
                Detach::CODE => Field::Detach,
                End::CODE => Field::End,
                Close::CODE => Field::Close,
                _ => {
                    return Err(de::Error::custom(format!(
                        "unknown performative code {:#x}",
                        v
                    )))
                }
            };
            Ok(val)
        }
    }

    impl<'de> de::Deserialize<'de> for Field {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            deserializer.deserialize_identifier(FieldVisitor {})
        }
    }

    struct Visitor {}

    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Performative;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("enum Performative")
        }

        fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
        where
            A: de::EnumAccess<'de>,
        {
            let (val, variant) = data.variant()?;
            let performative = match val {
                Field::Open => Performative::Open(variant.newtype_variant()?),
                Field::Begin => Performative::Begin(variant.newtype_variant()?),
                Field::Attach => Performative::Attach(variant.newtype_variant()?),
                Field::Flow => Performative::Flow(variant.newtype_variant()?),
                Field::Transfer => Performative::Transfer(variant.newtype_variant()?),
                Field::Disposition => Performative::Disposition(variant.newtype_variant()?),
                Field::Detach => Performative::Detach(variant.newtype_variant()?),
                Field::End => Performative::End(variant.newtype_variant()?),
                Field::Close => Performative::Close(variant.newtype_variant()?),
            };
            Ok(performative)
        }
    }

    impl<'de> de::Deserialize<'de> for Performative {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            const VARIANTS: &[&str] = &[
                Open::NAME,
                Begin::NAME,
                Attach::NAME,
                Flow::NAME,
                Transfer::NAME,
                Disposition::NAME,
                Detach::NAME,
                End::NAME,
                Close::NAME,
            ];
            deserializer.deserialize_enum("Performative", VARIANTS, Visitor {})
        }
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::{from_slice, to_vec};

    use super::{Begin, End, Performative};
    use crate::definitions::Handle;

    #[test]
    fn symbolic_descriptor_decodes() {
        let mut buf = vec![0x00, 0xa3, 13];
        buf.extend_from_slice(b"amqp:end:list");
        buf.push(0x45);
        let performative: Performative = from_slice(&buf).unwrap();
        assert_eq!(performative, Performative::End(End { error: None }));
    }

    #[test]
    fn unknown_descriptor_is_an_error() {
        let buf = [0x00, 0x53, 0x70, 0x45];
        assert!(from_slice::<Performative>(&buf).is_err());
    }

    #[test]
    fn performative_encodes_as_its_body() {
        let begin = Begin {
            remote_channel: Some(0),
            next_outgoing_id: 1,
            incoming_window: 2048,
            outgoing_window: 2048,
            handle_max: Handle(255),
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        let buf = to_vec(&Performative::Begin(begin.clone())).unwrap();
        assert_eq!(buf, to_vec(&begin).unwrap());
        assert_eq!(
            from_slice::<Performative>(&buf).unwrap(),
            Performative::Begin(begin)
        );
    }
}
