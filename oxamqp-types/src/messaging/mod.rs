//! Types defined in AMQP 1.0 specification Part 3: Messaging

use oxamqp_codec::{
    primitives::{Array, Symbol},
    DeserializeComposite, SerializeComposite,
};

mod delivery_state;
pub use delivery_state::*;

mod message;
pub use message::*;

/// 3.5.3 Source
///
/// Only the fields a sending link needs are kept; the remaining fields of a
/// peer's source are skipped when decoding.
/// <type name="source" class="composite" source="list" provides="source">
///     <descriptor name="amqp:source:list" code="0x00000000:0x00000028"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:source:list",
    code = 0x0000_0000_0000_0028,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Source {
    /// <field name="address" type="*" requires="address"/>
    pub address: Option<String>,

    /// <field name="durable" type="terminus-durability" default="none"/>
    #[amqp_contract(default)]
    pub durable: u32,

    /// <field name="expiry-policy" type="terminus-expiry-policy" default="session-end"/>
    pub expiry_policy: Option<Symbol>,

    /// <field name="timeout" type="seconds" default="0"/>
    #[amqp_contract(default)]
    pub timeout: u32,

    /// <field name="dynamic" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub dynamic: bool,
}

impl Source {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0028;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:source:list";
}

/// 3.5.4 Target
/// <type name="target" class="composite" source="list" provides="target">
///     <descriptor name="amqp:target:list" code="0x00000000:0x00000029"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:target:list",
    code = 0x0000_0000_0000_0029,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Target {
    /// <field name="address" type="*" requires="address"/>
    pub address: Option<String>,

    /// <field name="durable" type="terminus-durability" default="none"/>
    #[amqp_contract(default)]
    pub durable: u32,

    /// <field name="expiry-policy" type="terminus-expiry-policy" default="session-end"/>
    pub expiry_policy: Option<Symbol>,

    /// <field name="timeout" type="seconds" default="0"/>
    #[amqp_contract(default)]
    pub timeout: u32,

    /// <field name="dynamic" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub dynamic: bool,

    /// <field name="capabilities" type="symbol" multiple="true"/>
    pub capabilities: Option<Array<Symbol>>,
}

impl Target {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0029;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:target:list";

    /// A target with the given address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}
