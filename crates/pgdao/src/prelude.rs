//! Convenient imports for typical `pgdao` usage.
//!
//! ```ignore
//! use pgdao::prelude::*;
//! ```

pub use crate::{
    CompositeWhereClause, ContextConfig, Dao, DaoError, DaoResult, DataAccessContext, FromRow,
    GenericClient, NamedParameterList, Page, Parameter, Query, RowExt, SqlEnum, StatementModifier,
    ToStatement, WhereClause,
};
