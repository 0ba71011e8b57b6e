use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::{
    util::{
        collect_fields, macro_rules_unwrap_or_default, macro_rules_unwrap_or_none,
        parse_described_struct_attr, struct_name, Shape,
    },
    DescribedStructAttr,
};

pub(crate) fn expand_deserialize(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let attr = parse_described_struct_attr(input)?;
    match &input.data {
        syn::Data::Struct(data) => expand_deserialize_struct(&attr, data, input),
        _ => Err(syn::Error::new(
            input.ident.span(),
            "DeserializeComposite can only be derived for structs",
        )),
    }
}

/// Either form of the descriptor is accepted
fn evaluate_descriptor(attr: &DescribedStructAttr) -> TokenStream {
    let name = &attr.name[..];
    let evaluate_code = match attr.code {
        Some(code) => quote! {
            oxamqp_codec::descriptor::Descriptor::Code(__c) => {
                if __c != #code {
                    return Err(oxamqp_codec::serde::de::Error::custom("Descriptor mismatch"))
                }
            }
        },
        None => quote! {
            oxamqp_codec::descriptor::Descriptor::Code(_) => {
                return Err(oxamqp_codec::serde::de::Error::custom("Descriptor mismatch"))
            }
        },
    };

    quote! {
        match __descriptor {
            oxamqp_codec::descriptor::Descriptor::Name(__symbol) => {
                if __symbol.into_inner() != #name {
                    return Err(oxamqp_codec::serde::de::Error::custom("Descriptor mismatch"))
                }
            },
            #evaluate_code
        }
    }
}

fn expand_deserialize_struct(
    attr: &DescribedStructAttr,
    data: &syn::DataStruct,
    ctx: &DeriveInput,
) -> Result<TokenStream, syn::Error> {
    let ident = &ctx.ident;
    let expecting = format!("struct {}", attr.name);
    let struct_name = struct_name(attr.encoding);
    let evaluate_descriptor = evaluate_descriptor(attr);
    let (shape, fields) = collect_fields(data, attr, ctx)?;

    let unwrap_or_default = match fields.iter().any(|f| f.default) {
        true => macro_rules_unwrap_or_default(),
        false => quote!(),
    };
    let unwrap_or_none = match fields.iter().any(|f| !f.default) {
        true => macro_rules_unwrap_or_none(),
        false => quote!(),
    };

    let field_impls = fields.iter().map(|f| {
        let binding = &f.binding;
        let ty = f.ty;
        match f.default {
            true => quote! {
                unwrap_or_default!(#binding, __seq.next_element::<Option<#ty>>()?.unwrap_or_default(), #ty);
            },
            false => quote! {
                unwrap_or_none!(#binding, __seq.next_element()?, #ty);
            },
        }
    });

    let bindings: Vec<&syn::Ident> = fields.iter().map(|f| &f.binding).collect();
    let construct = match shape {
        Shape::Named => quote!(#ident { #( #bindings, )* }),
        Shape::Tuple => quote!(#ident( #( #bindings, )* )),
        Shape::Unit => quote!(#ident),
    };
    let field_names = fields.iter().map(|f| &f.name);

    Ok(quote! {
        #unwrap_or_default
        #unwrap_or_none

        #[automatically_derived]
        impl<'de> oxamqp_codec::serde::de::Deserialize<'de> for #ident {
            fn deserialize<_D>(deserializer: _D) -> Result<Self, _D::Error>
            where
                _D: oxamqp_codec::serde::de::Deserializer<'de>,
            {
                struct Visitor {}

                impl<'de> oxamqp_codec::serde::de::Visitor<'de> for Visitor {
                    type Value = #ident;

                    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                        formatter.write_str(#expecting)
                    }

                    fn visit_seq<_A>(self, mut __seq: _A) -> Result<Self::Value, _A::Error>
                    where
                        _A: oxamqp_codec::serde::de::SeqAccess<'de>,
                    {
                        let __descriptor: oxamqp_codec::descriptor::Descriptor =
                            match __seq.next_element()? {
                                Some(val) => val,
                                None => {
                                    return Err(oxamqp_codec::serde::de::Error::custom(
                                        "Expecting descriptor",
                                    ))
                                }
                            };

                        #evaluate_descriptor

                        #( #field_impls )*

                        Ok(#construct)
                    }
                }

                const FIELDS: &[&str] = &[oxamqp_codec::__constants::DESCRIPTOR, #( #field_names, )*];
                deserializer.deserialize_struct(#struct_name, FIELDS, Visitor {})
            }
        }
    })
}
