//! Select builders.
//!
//! Each stage only exposes the clauses that may legally follow it:
//!
//! ```text
//! SelectHeader ── from ──▶ SelectStatement ── group_by ──▶ GroupedStatement
//!      │                        │                               │
//!   no_from                  order_by ──────▶ OrderedStatement ◀── order_by
//!      ▼                                          │
//! RestrictedSelect                            only_page
//!                                                 ▼
//!                                          LimitedStatement
//! ```

use crate::client::GenericClient;
use crate::clause::{OrderByClause, StatementModifier, WhereClause};
use crate::dialect::Dialect;
use crate::error::{DaoError, DaoResult};
use crate::extract::{self, Query};
use crate::page::LimitedStatement;
use crate::param::Parameter;
use crate::statement::{Statement, ToStatement};
use futures_util::StreamExt;
use std::borrow::Cow;
use std::sync::Arc;

macro_rules! impl_order_by {
    ($ty:ty, $this:ident => $compound:expr) => {
        impl $ty {
            /// Start the ORDER BY list with an ascending field.
            pub fn order_by(&self, field: impl Into<String>) -> OrderedStatement {
                self.order_by_clause(OrderByClause::asc(field))
            }

            /// Start the ORDER BY list with a descending field.
            pub fn order_by_desc(&self, field: impl Into<String>) -> OrderedStatement {
                self.order_by_clause(OrderByClause::desc(field))
            }

            pub fn order_by_clause(&self, clause: OrderByClause) -> OrderedStatement {
                let $this = self;
                let compound = $compound;
                OrderedStatement {
                    stmt: self.stmt.append(&format!(" ORDER BY {}", clause.render())),
                    compound,
                }
            }
        }
    };
}

macro_rules! impl_query {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToStatement for $ty {
                fn to_statement(&self) -> Cow<'_, Statement> {
                    Cow::Borrowed(&self.stmt)
                }
            }

            impl Query for $ty {}
        )*
    };
}

/// `SELECT fields`, before the FROM clause.
#[derive(Debug, Clone)]
pub struct SelectHeader {
    stmt: Statement,
}

impl SelectHeader {
    pub(crate) fn new(fields: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            stmt: Statement::new(format!("SELECT {fields}"), dialect),
        }
    }

    /// Bind a parameter for a marker in the field list.
    pub fn parameter(&self, value: impl Into<Parameter>) -> Self {
        Self {
            stmt: self.stmt.bind(value.into()),
        }
    }

    pub fn from(&self, clause: &str) -> SelectStatement {
        SelectStatement {
            stmt: self.stmt.append(&format!(" FROM {clause}")),
            filtered: false,
        }
    }

    /// A select without FROM clause, e.g. to evaluate a function.
    pub fn no_from(&self) -> RestrictedSelect {
        RestrictedSelect {
            stmt: self.stmt.clone(),
        }
    }
}

/// A select that only supports extraction.
#[derive(Debug, Clone)]
pub struct RestrictedSelect {
    stmt: Statement,
}

/// `SELECT … FROM …` with optional where clauses.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    stmt: Statement,
    filtered: bool,
}

impl SelectStatement {
    /// Bind a parameter for a marker already present in the text.
    pub fn parameter(&self, value: impl Into<Parameter>) -> Self {
        Self {
            stmt: self.stmt.bind(value.into()),
            filtered: self.filtered,
        }
    }

    /// Add a where clause with one parameter. Without a marker in `clause`
    /// this is an equality test.
    pub fn filter(&self, clause: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.filter_clause(&WhereClause::new(clause, value))
    }

    /// Add a where clause without parameter.
    pub fn filter_raw(&self, clause: impl Into<String>) -> DaoResult<Self> {
        Ok(self.filter_clause(&WhereClause::raw(clause)?))
    }

    pub fn filter_clause(&self, clause: &WhereClause) -> Self {
        Self {
            stmt: self.stmt.condition(!self.filtered, " WHERE ", clause),
            filtered: true,
        }
    }

    /// Add every clause of a modifier, in order.
    pub fn filter_by(&self, modifier: &impl StatementModifier) -> Self {
        modifier
            .where_clauses()
            .iter()
            .fold(self.clone(), |acc, clause| acc.filter_clause(clause))
    }

    pub fn group_by(&self, fields: &str) -> GroupedStatement {
        GroupedStatement {
            stmt: self.stmt.append(&format!(" GROUP BY {fields}")),
            having: false,
        }
    }

    /// Whether the query returns no rows. Only the first row is fetched.
    pub async fn is_empty(&self, conn: &impl GenericClient) -> DaoResult<bool> {
        let stmt = self.stmt.append(self.stmt.dialect().first_row_only());
        let mut rows = extract::open(&stmt, conn).await?;
        match rows.next().await {
            Some(row) => row.map(|_| false),
            None => Ok(true),
        }
    }
}

impl_order_by!(SelectStatement, _this => false);

/// `… GROUP BY …` with optional having clauses.
#[derive(Debug, Clone)]
pub struct GroupedStatement {
    stmt: Statement,
    having: bool,
}

impl GroupedStatement {
    pub fn having(&self, clause: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.having_clause(&WhereClause::new(clause, value))
    }

    pub fn having_raw(&self, clause: impl Into<String>) -> DaoResult<Self> {
        Ok(self.having_clause(&WhereClause::raw(clause)?))
    }

    pub fn having_clause(&self, clause: &WhereClause) -> Self {
        Self {
            stmt: self.stmt.condition(!self.having, " HAVING ", clause),
            having: true,
        }
    }

    pub fn having_by(&self, modifier: &impl StatementModifier) -> Self {
        modifier
            .where_clauses()
            .iter()
            .fold(self.clone(), |acc, clause| acc.having_clause(clause))
    }
}

impl_order_by!(GroupedStatement, _this => false);

/// A query with a non-empty ORDER BY list.
#[derive(Debug, Clone)]
pub struct OrderedStatement {
    stmt: Statement,
    compound: bool,
}

impl OrderedStatement {
    /// Append an ascending field to the ORDER BY list.
    pub fn order_by(&self, field: impl Into<String>) -> Self {
        self.order_by_clause(OrderByClause::asc(field))
    }

    pub fn order_by_desc(&self, field: impl Into<String>) -> Self {
        self.order_by_clause(OrderByClause::desc(field))
    }

    pub fn order_by_clause(&self, clause: OrderByClause) -> Self {
        Self {
            stmt: self.stmt.append(&format!(", {}", clause.render())),
            compound: self.compound,
        }
    }

    /// Restrict to one page of results. Pages are numbered from zero.
    pub fn only_page(&self, page_nr: u32, page_size: u32) -> LimitedStatement {
        let offset = u64::from(page_nr) * u64::from(page_size);
        self.offset_limit(offset, Some(page_size))
    }

    /// Skip `offset` rows and return at most `limit` (all when `None`).
    pub fn offset_limit(&self, offset: u64, limit: Option<u32>) -> LimitedStatement {
        LimitedStatement::new(self.stmt.clone(), offset, limit, self.compound)
    }

    pub fn is_compound(&self) -> bool {
        self.compound
    }
}

/// The intersection of one or more selects.
#[derive(Debug, Clone)]
pub struct Intersection {
    stmt: Statement,
    compound: bool,
}

impl Intersection {
    /// Combine the branches with INTERSECT, keeping their parameters in order.
    /// A single branch is used as is.
    pub(crate) fn new(branches: &[&SelectStatement], dialect: Arc<dyn Dialect>) -> DaoResult<Self> {
        let stmts: Vec<&Statement> = branches.iter().map(|b| &b.stmt).collect();
        let text = match stmts.as_slice() {
            [] => {
                return Err(DaoError::usage(
                    "there must be at least one query to intersect",
                ));
            }
            [single] => single.text().to_string(),
            many => {
                let parts: Vec<&str> = many.iter().map(|s| s.text()).collect();
                format!("({})", parts.join(" INTERSECT "))
            }
        };
        Ok(Self {
            stmt: Statement::join(text, &stmts, dialect),
            compound: stmts.len() > 1,
        })
    }

    pub fn is_compound(&self) -> bool {
        self.compound
    }
}

impl_order_by!(Intersection, this => this.compound);

impl_query!(
    RestrictedSelect,
    SelectStatement,
    GroupedStatement,
    OrderedStatement,
    Intersection,
);

#[cfg(test)]
mod tests;
