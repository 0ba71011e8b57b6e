use oxamqp_codec::{DeserializeComposite, SerializeComposite};

use crate::{
    definitions::{DeliveryNumber, Role},
    messaging::DeliveryState,
};

/// 2.7.6 Disposition
/// Inform remote peer of delivery state changes.
/// <type name="disposition" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:disposition:list" code="0x00000000:0x00000015"/>
/// </type>
#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:disposition:list",
    code = 0x0000_0000_0000_0015,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Disposition {
    /// <field name="role" type="role" mandatory="true"/>
    pub role: Role,

    /// <field name="first" type="delivery-number" mandatory="true"/>
    pub first: DeliveryNumber,

    /// <field name="last" type="delivery-number"/>
    ///
    /// If not set, this is taken to be the same as first.
    pub last: Option<DeliveryNumber>,

    /// <field name="settled" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub settled: bool,

    /// <field name="state" type="*" requires="delivery-state"/>
    pub state: Option<DeliveryState>,

    /// <field name="batchable" type="boolean" default="false"/>
    #[amqp_contract(default)]
    pub batchable: bool,
}

impl Disposition {
    /// Descriptor code
    pub const CODE: u64 = 0x0000_0000_0000_0015;

    /// Descriptor name
    pub const NAME: &'static str = "amqp:disposition:list";

    /// Delivery ids covered by this disposition. A `last` below `first` is
    /// treated as absent.
    pub fn range(&self) -> std::ops::RangeInclusive<DeliveryNumber> {
        let last = self.last.unwrap_or(self.first);
        self.first..=std::cmp::max(self.first, last)
    }
}
