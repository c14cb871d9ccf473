//! FromRow derive macro implementation

use crate::attr;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "FromRow can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRow can only be derived for structs",
            ));
        }
    };

    let mut field_extracts = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let column_name = attr::string_value(&field.attrs, "column")?
            .unwrap_or_else(|| field_name.to_string());
        field_extracts.push(quote! {
            #field_name: row.try_get_column(#column_name)?
        });
    }

    Ok(quote! {
        impl #impl_generics ::pgdao::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::pgdao::__private::tokio_postgres::Row) -> ::pgdao::DaoResult<Self> {
                use ::pgdao::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
