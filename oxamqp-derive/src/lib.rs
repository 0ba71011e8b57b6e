//! Custom derive macros for the described types of `oxamqp-codec`

use darling::{FromDeriveInput, FromMeta};
use quote::quote;
use syn::DeriveInput;

mod de;
mod ser;
mod util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromMeta)]
enum EncodingType {
    /// The single field is the described value
    Basic,

    /// The fields form a described list
    List,
}

#[derive(Debug, Clone, FromDeriveInput)]
#[darling(attributes(amqp_contract))]
struct DescribedAttr {
    #[darling(default)]
    pub name: Option<String>,
    #[darling(default)]
    pub code: Option<u64>,
    #[darling(default)]
    pub encoding: Option<EncodingType>,
    #[darling(default)]
    pub rename_all: String,
}

#[derive(Debug, Default, FromMeta, PartialEq, Eq)]
struct FieldAttr {
    #[darling(default)]
    default: bool,
}

struct DescribedStructAttr {
    name: String,
    code: Option<u64>,
    encoding: EncodingType,
    rename_all: String,
}

#[proc_macro_derive(SerializeComposite, attributes(amqp_contract))]
pub fn derive_serialize_composite(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(item as DeriveInput);
    let output = match ser::expand_serialize(&input) {
        Ok(impl_ser) => quote! {
            const _: () = {
                #impl_ser
            };
        },
        Err(err) => err.to_compile_error(),
    };
    output.into()
}

#[proc_macro_derive(DeserializeComposite, attributes(amqp_contract))]
pub fn derive_deserialize_composite(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(item as DeriveInput);
    let output = match de::expand_deserialize(&input) {
        Ok(impl_de) => quote! {
            const _: () = {
                #impl_de
            };
        },
        Err(err) => err.to_compile_error(),
    };
    output.into()
}
