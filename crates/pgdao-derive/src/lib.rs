//! Derive macros for pgdao
//!
//! Provides `#[derive(FromRow)]` and `#[derive(SqlEnum)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attr;
mod from_row;
mod sql_enum;

/// Derive `FromRow` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use pgdao::FromRow;
///
/// #[derive(FromRow)]
/// struct Agent {
///     id: i32,
///     name: String,
///     #[dao(column = "licence_to_kill")]
///     licensed: Option<bool>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[dao(column = "name")]` - Map field to a different column name
#[proc_macro_derive(FromRow, attributes(dao))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `SqlEnum` for a fieldless enum.
///
/// # Example
///
/// ```ignore
/// use pgdao::SqlEnum;
///
/// #[derive(SqlEnum)]
/// enum DayOfWeek {
///     Monday,
///     #[dao(rename = "TUE")]
///     Tuesday,
/// }
/// ```
///
/// Values bind as `?::day_of_week` (the type name goes through the dialect's
/// enum translator) and read back from enum or text columns.
///
/// # Attributes
///
/// - `#[dao(db_type = "name")]` - Database type name, bypassing the translator
/// - `#[dao(rename = "label")]` on a variant - Database label (default: snake_case variant name)
#[proc_macro_derive(SqlEnum, attributes(dao))]
pub fn derive_sql_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    sql_enum::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
