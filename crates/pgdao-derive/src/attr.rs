//! `#[dao(key = "value")]` attribute parsing.

use syn::{Attribute, Expr, ExprLit, Lit, Meta, Result};

/// Value of `key` in the first `#[dao(...)]` attribute that sets it.
pub fn string_value(attrs: &[Attribute], key: &str) -> Result<Option<String>> {
    for attr in attrs {
        if !attr.path().is_ident("dao") {
            continue;
        }
        let nested = attr.parse_args_with(
            syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
        )?;
        for meta in &nested {
            let Meta::NameValue(nv) = meta else {
                return Err(syn::Error::new_spanned(meta, "expected `name = \"value\"`"));
            };
            if !nv.path.is_ident(key) {
                continue;
            }
            return match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Ok(Some(s.value())),
                other => Err(syn::Error::new_spanned(other, "expected a string literal")),
            };
        }
    }
    Ok(None)
}
