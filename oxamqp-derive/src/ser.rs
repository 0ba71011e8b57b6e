use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::{
    util::{
        collect_fields, macro_rules_buffer_if_eq_default, macro_rules_buffer_if_none,
        parse_described_struct_attr, struct_name,
    },
    DescribedStructAttr, EncodingType,
};

pub(crate) fn expand_serialize(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let attr = parse_described_struct_attr(input)?;
    match &input.data {
        syn::Data::Struct(data) => expand_serialize_struct(&attr, data, input),
        _ => Err(syn::Error::new(
            input.ident.span(),
            "SerializeComposite can only be derived for structs",
        )),
    }
}

pub(crate) fn descriptor(attr: &DescribedStructAttr) -> TokenStream {
    match attr.code {
        Some(code) => quote!(oxamqp_codec::descriptor::Descriptor::Code(#code)),
        None => {
            let name = &attr.name[..];
            quote!(oxamqp_codec::descriptor::Descriptor::Name(
                oxamqp_codec::primitives::Symbol::from(#name)
            ))
        }
    }
}

fn expand_serialize_struct(
    attr: &DescribedStructAttr,
    data: &syn::DataStruct,
    ctx: &DeriveInput,
) -> Result<TokenStream, syn::Error> {
    let ident = &ctx.ident;
    let descriptor = descriptor(attr);
    let struct_name = struct_name(attr.encoding);
    let (_, fields) = collect_fields(data, attr, ctx)?;
    let len = fields.len();

    let body = match attr.encoding {
        EncodingType::Basic => {
            let field_impls = fields.iter().map(|f| {
                let member = &f.member;
                let name = &f.name;
                quote!(state.serialize_field(#name, &self.#member)?;)
            });
            quote!(#( #field_impls )*)
        }
        EncodingType::List if fields.is_empty() => quote!(),
        EncodingType::List => {
            let buffer_if_none = macro_rules_buffer_if_none();
            let buffer_if_eq_default = match fields.iter().any(|f| f.default) {
                true => macro_rules_buffer_if_eq_default(),
                false => quote!(),
            };
            let field_impls = fields.iter().map(|f| {
                let member = &f.member;
                let name = &f.name;
                let ty = f.ty;
                match f.default {
                    true => quote!(buffer_if_eq_default!(state, nulls, &self.#member, #name, #ty);),
                    false => quote!(buffer_if_none!(state, nulls, &self.#member, #name, #ty);),
                }
            });
            quote! {
                #buffer_if_none
                #buffer_if_eq_default
                let mut nulls: Vec<&'static str> = Vec::new();
                #( #field_impls )*
            }
        }
    };

    Ok(quote! {
        #[automatically_derived]
        impl oxamqp_codec::serde::ser::Serialize for #ident {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: oxamqp_codec::serde::ser::Serializer,
            {
                use oxamqp_codec::serde::ser::SerializeStruct;
                // the descriptor takes one field as well
                let mut state = serializer.serialize_struct(#struct_name, #len + 1)?;
                state.serialize_field(oxamqp_codec::__constants::DESCRIPTOR, &#descriptor)?;
                #body
                state.end()
            }
        }
    })
}
