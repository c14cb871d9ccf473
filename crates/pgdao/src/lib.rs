//! # pgdao
//!
//! Fluent, immutable SQL statement builders for PostgreSQL, with typed result
//! extraction and pagination.
//!
//! ## Features
//!
//! - **Immutable builders**: every call returns a new statement, so a partial
//!   statement can be reused for several continuations
//! - **Typestate**: each builder stage only offers the clauses that may follow it
//! - **Placeholders you can read**: statements are written with `?` markers and
//!   rendered to `$1`, `$2`, ... when executed
//! - **Result shapes**: scalars, options, lists, ordered maps and pages with a total count
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use pgdao::prelude::*;
//!
//! let ctx = DataAccessContext::connect(&url, ContextConfig::new()).await?;
//!
//! // SELECT
//! let names = ctx
//!     .select("name")
//!     .from("agent")
//!     .filter("age > ?", 30)
//!     .order_by("name")
//!     .get_list(&ctx, |row| row.try_get_column("name"))
//!     .await?;
//!
//! // PAGE
//! let page = ctx
//!     .select("*")
//!     .from("agent")
//!     .order_by("id")
//!     .only_page(2, 20)
//!     .get_page_as::<Agent>(&ctx)
//!     .await?;
//!
//! // UPSERT
//! ctx.insert_or_update_into("counter")
//!     .key("id", 123)
//!     .value("val", 15)
//!     .execute(&ctx)
//!     .await?;
//! ```

pub mod array;
pub mod clause;
pub mod client;
pub mod config;
pub mod context;
pub mod dao;
pub mod dialect;
pub mod error;
pub mod extract;
pub mod general;
pub mod insert;
pub mod page;
pub mod param;
pub mod row;
pub mod select;
pub mod statement;
pub mod update;

mod trace;

pub mod prelude;

pub use array::Array2;
pub use clause::{
    CompositeWhereClause, NamedParameter, NamedParameterList, OrderByClause, StatementModifier,
    WhereClause,
};
pub use client::{GenericClient, RowStream};
pub use config::ContextConfig;
pub use context::DataAccessContext;
pub use dao::Dao;
pub use dialect::{Dialect, EnumTypeTranslator, Postgres, SnakeCase, Verbatim};
pub use error::{DaoError, DaoResult};
pub use extract::Query;
pub use general::{GeneralStatement, ProcedureCall};
pub use insert::{InsertHeader, InsertStatement, UpsertHeader, UpsertStatement};
pub use page::{LimitedStatement, Page};
pub use param::{EnumValue, Parameter, SqlEnum};
pub use row::{FromRow, RowExt};
pub use select::{
    GroupedStatement, Intersection, OrderedStatement, RestrictedSelect, SelectHeader,
    SelectStatement,
};
pub use statement::{Statement, ToStatement, unique_id};
pub use update::{UpdateOrDeleteStatement, UpdateStatement};

#[cfg(feature = "derive")]
pub use pgdao_derive::{FromRow, SqlEnum};

// Re-export tokio_postgres for convenience
pub use tokio_postgres;

#[doc(hidden)]
pub mod __private {
    pub use bytes;
    pub use tokio_postgres;
}

/// `SELECT fields` with the default PostgreSQL dialect.
pub fn select(fields: &str) -> SelectHeader {
    Dao::default().select(fields)
}

/// The intersection of one or more selects.
pub fn intersection(branches: &[&SelectStatement]) -> DaoResult<Intersection> {
    Dao::default().intersection(branches)
}

pub fn insert_into(table: &str) -> InsertHeader {
    Dao::default().insert_into(table)
}

pub fn insert_or_update_into(table: &str) -> UpsertHeader {
    Dao::default().insert_or_update_into(table)
}

pub fn update(table: &str) -> UpdateStatement {
    Dao::default().update(table)
}

pub fn delete_from(table: &str) -> UpdateOrDeleteStatement {
    Dao::default().delete_from(table)
}

/// Arbitrary SQL with `?` markers.
pub fn sql(text: &str) -> GeneralStatement {
    Dao::default().sql(text)
}

pub fn call(call: &str) -> ProcedureCall {
    Dao::default().call(call)
}

pub fn composite_where() -> CompositeWhereClause {
    CompositeWhereClause::new()
}
