//! `#[derive(SqlEnum)]`: map a fieldless Rust enum onto a PostgreSQL enum type.

use crate::attr;
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(e) => &e.variants,
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "SqlEnum can only be derived for enums",
            ));
        }
    };

    let type_name = name.to_string();
    let db_type = match attr::string_value(&input.attrs, "db_type")? {
        Some(db_type) => quote! { ::std::option::Option::Some(#db_type) },
        None => quote! { ::std::option::Option::None },
    };

    let mut label_arms = Vec::new();
    let mut from_label_arms = Vec::new();

    for variant in variants {
        if !matches!(&variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "SqlEnum variants must be unit variants (no fields)",
            ));
        }

        let variant_ident = &variant.ident;
        let label = attr::string_value(&variant.attrs, "rename")?
            .unwrap_or_else(|| variant_ident.to_string().to_snake_case());

        label_arms.push(quote! {
            #name::#variant_ident => #label,
        });
        from_label_arms.push(quote! {
            #label => ::std::option::Option::Some(#name::#variant_ident),
        });
    }

    let tp = quote! { ::pgdao::__private::tokio_postgres::types };
    let box_error = quote! {
        ::std::boxed::Box<dyn ::std::error::Error + ::std::marker::Sync + ::std::marker::Send>
    };

    Ok(quote! {
        impl ::pgdao::SqlEnum for #name {
            const TYPE_NAME: &'static str = #type_name;
            const DB_TYPE: ::std::option::Option<&'static str> = #db_type;

            fn label(&self) -> &'static str {
                match self {
                    #(#label_arms)*
                }
            }

            fn from_label(label: &str) -> ::std::option::Option<Self> {
                match label {
                    #(#from_label_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl #tp::ToSql for #name {
            fn to_sql(
                &self,
                ty: &#tp::Type,
                out: &mut ::pgdao::__private::bytes::BytesMut,
            ) -> ::std::result::Result<#tp::IsNull, #box_error> {
                <::pgdao::EnumValue as #tp::ToSql>::to_sql(&::pgdao::SqlEnum::to_enum_value(self), ty, out)
            }

            fn accepts(ty: &#tp::Type) -> bool {
                <::pgdao::EnumValue as #tp::ToSql>::accepts(ty)
            }

            #tp::to_sql_checked!();
        }

        impl<'__pgdao_a> #tp::FromSql<'__pgdao_a> for #name {
            fn from_sql(
                ty: &#tp::Type,
                raw: &'__pgdao_a [u8],
            ) -> ::std::result::Result<Self, #box_error> {
                let label = <&str as #tp::FromSql>::from_sql(ty, raw)?;
                <#name as ::pgdao::SqlEnum>::from_label(label).ok_or_else(|| {
                    ::std::format!("unknown {} label: {:?}", #type_name, label).into()
                })
            }

            fn accepts(ty: &#tp::Type) -> bool {
                <::pgdao::param::EnumLabel as #tp::FromSql>::accepts(ty)
            }
        }
    })
}
