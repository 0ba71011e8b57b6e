use darling::{FromDeriveInput, FromMeta};
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{spanned::Spanned, DeriveInput};

use crate::{DescribedAttr, DescribedStructAttr, EncodingType, FieldAttr};

const ATTR: &str = "amqp_contract";

pub(crate) fn parse_described_struct_attr(
    input: &DeriveInput,
) -> Result<DescribedStructAttr, syn::Error> {
    let attr = DescribedAttr::from_derive_input(input)
        .map_err(|err| syn::Error::new(attr_span(input), err))?;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "described types cannot be generic",
        ));
    }

    Ok(DescribedStructAttr {
        name: attr.name.unwrap_or_else(|| input.ident.to_string()),
        code: attr.code,
        encoding: attr.encoding.unwrap_or(EncodingType::List),
        rename_all: attr.rename_all,
    })
}

/// Span of the `amqp_contract` attribute, or of the type if there is none
pub(crate) fn attr_span(ctx: &DeriveInput) -> Span {
    ctx.attrs
        .iter()
        .find(|attr| attr.path().is_ident(ATTR))
        .map(|attr| attr.span())
        .unwrap_or_else(|| ctx.ident.span())
}

pub(crate) fn convert_to_case(
    case: &str,
    source: String,
    ctx: &DeriveInput,
) -> Result<String, syn::Error> {
    use convert_case::{Case, Casing};
    let s = match case {
        "" => source,
        "lowercase" => source.to_lowercase(),
        "UPPERCASE" => source.to_uppercase(),
        "PascalCase" => source.to_case(Case::Pascal),
        "camelCase" => source.to_case(Case::Camel),
        "snake_case" => source.to_case(Case::Snake),
        "SCREAMING_SNAKE_CASE" => source.to_case(Case::ScreamingSnake),
        "kebab-case" => source.to_case(Case::Kebab),
        other => {
            return Err(syn::Error::new(
                attr_span(ctx),
                format!("{} case is not implemented", other),
            ))
        }
    };
    Ok(s)
}

/// Shape of the struct, which decides how it is constructed
pub(crate) enum Shape {
    Named,
    Tuple,
    Unit,
}

pub(crate) struct FieldInfo<'a> {
    pub member: syn::Member,
    pub binding: syn::Ident,
    pub name: String,
    pub ty: &'a syn::Type,
    pub default: bool,
}

fn parse_field_attr(field: &syn::Field) -> Result<FieldAttr, syn::Error> {
    match field.attrs.iter().find(|attr| attr.path().is_ident(ATTR)) {
        Some(attr) => FieldAttr::from_meta(&attr.meta)
            .map_err(|err| syn::Error::new(attr.span(), err)),
        None => Ok(FieldAttr::default()),
    }
}

pub(crate) fn collect_fields<'a>(
    data: &'a syn::DataStruct,
    attr: &DescribedStructAttr,
    ctx: &DeriveInput,
) -> Result<(Shape, Vec<FieldInfo<'a>>), syn::Error> {
    let shape = match &data.fields {
        syn::Fields::Named(_) => Shape::Named,
        syn::Fields::Unnamed(_) => Shape::Tuple,
        syn::Fields::Unit => Shape::Unit,
    };

    let mut fields = Vec::with_capacity(data.fields.len());
    for (i, field) in data.fields.iter().enumerate() {
        let field_attr = parse_field_attr(field)?;
        let info = match &field.ident {
            Some(ident) => FieldInfo {
                member: syn::Member::Named(ident.clone()),
                binding: ident.clone(),
                name: convert_to_case(&attr.rename_all, ident.to_string(), ctx)?,
                ty: &field.ty,
                default: field_attr.default,
            },
            None => FieldInfo {
                member: syn::Member::Unnamed(syn::Index::from(i)),
                binding: format_ident!("field{}", i),
                name: i.to_string(),
                ty: &field.ty,
                default: field_attr.default,
            },
        };
        fields.push(info);
    }

    if attr.encoding == EncodingType::Basic && fields.len() != 1 {
        return Err(syn::Error::new(
            attr_span(ctx),
            "basic encoding needs exactly one field",
        ));
    }
    Ok((shape, fields))
}

pub(crate) fn struct_name(encoding: EncodingType) -> TokenStream {
    match encoding {
        EncodingType::Basic => quote!(oxamqp_codec::__constants::DESCRIBED_BASIC),
        EncodingType::List => quote!(oxamqp_codec::__constants::DESCRIBED_LIST),
    }
}

/// Trailing `None` fields are left out of the list. A `None` followed by a
/// field with a value is written as null.
pub(crate) fn macro_rules_buffer_if_none() -> TokenStream {
    quote! {
        macro_rules! buffer_if_none {
            ($state: ident, $nulls: ident, $fident: expr, $fname: expr, Option<$ftype: ty>) => {
                if $fident.is_some() {
                    for field_name in $nulls.drain(..) {
                        $state.serialize_field(field_name, &())?;
                    }
                    $state.serialize_field($fname, $fident)?;
                } else {
                    $nulls.push($fname);
                }
            };
            ($state: ident, $nulls: ident, $fident: expr, $fname: expr, $ftype: ty) => {
                for field_name in $nulls.drain(..) {
                    $state.serialize_field(field_name, &())?;
                }
                $state.serialize_field($fname, $fident)?;
            };
        }
    }
}

/// Fields equal to their default are treated like `None`
pub(crate) fn macro_rules_buffer_if_eq_default() -> TokenStream {
    quote! {
        macro_rules! buffer_if_eq_default {
            ($state: ident, $nulls: ident, $fident: expr, $fname: expr, $ftype: ty) => {
                if *$fident != <$ftype as Default>::default() {
                    for field_name in $nulls.drain(..) {
                        $state.serialize_field(field_name, &())?;
                    }
                    $state.serialize_field($fname, $fident)?;
                } else {
                    $nulls.push($fname);
                }
            };
        }
    }
}

pub(crate) fn macro_rules_unwrap_or_none() -> TokenStream {
    quote! {
        macro_rules! unwrap_or_none {
            ($fident: ident, $seq: expr, Option<$ftype: ty>) => {
                let $fident: Option<$ftype> = match $seq {
                    Some(val) => val,
                    None => None,
                };
            };
            ($fident: ident, $seq: expr, $ftype: ty) => {
                let $fident: $ftype = match $seq {
                    Some(val) => val,
                    None => {
                        return Err(oxamqp_codec::serde::de::Error::custom(
                            "Insufficient number of items",
                        ))
                    }
                };
            };
        }
    }
}

pub(crate) fn macro_rules_unwrap_or_default() -> TokenStream {
    quote! {
        macro_rules! unwrap_or_default {
            ($fident: ident, $seq: expr, $ftype: ty) => {
                let $fident: $ftype = match $seq {
                    Some(val) => val,
                    None => Default::default(),
                };
            };
        }
    }
}
