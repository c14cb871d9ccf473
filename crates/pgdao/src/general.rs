//! Free-form statements and procedure calls.

use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::error::DaoResult;
use crate::extract::{self, Query};
use crate::param::Parameter;
use crate::statement::{Statement, ToStatement};
use std::borrow::Cow;
use std::sync::Arc;

/// Arbitrary SQL with `?` markers.
///
/// It can be executed for its effect or queried like any select.
#[derive(Debug, Clone)]
pub struct GeneralStatement {
    stmt: Statement,
}

impl GeneralStatement {
    pub(crate) fn new(text: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            stmt: Statement::new(text, dialect),
        }
    }

    /// Bind the value for the next marker.
    pub fn parameter(&self, value: impl Into<Parameter>) -> Self {
        Self {
            stmt: self.stmt.bind(value.into()),
        }
    }

    pub async fn execute(&self, conn: &impl GenericClient) -> DaoResult<u64> {
        extract::execute(&self.stmt, conn).await
    }
}

impl ToStatement for GeneralStatement {
    fn to_statement(&self) -> Cow<'_, Statement> {
        Cow::Borrowed(&self.stmt)
    }
}

impl Query for GeneralStatement {}

/// A call of a stored function, e.g. `call("refresh_stats(?)")`.
#[derive(Debug, Clone)]
pub struct ProcedureCall {
    stmt: Statement,
}

impl ProcedureCall {
    pub(crate) fn new(call: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            stmt: Statement::new(call, dialect),
        }
    }

    pub fn parameter(&self, value: impl Into<Parameter>) -> Self {
        Self {
            stmt: self.stmt.bind(value.into()),
        }
    }

    /// The call rendered in the dialect's call syntax.
    pub fn statement(&self) -> Statement {
        let text = self.stmt.dialect().procedure_call(self.stmt.text());
        self.stmt.with_text(text)
    }

    pub async fn execute(&self, conn: &impl GenericClient) -> DaoResult<()> {
        // the result rows of the call are not needed
        self.statement().for_each(conn, |_| Ok(())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;

    #[test]
    fn general_statement_binds_in_order() {
        let stmt = GeneralStatement::new("UPDATE t SET a = ? WHERE b = ?", Arc::new(Postgres::new()))
            .parameter(1)
            .parameter("x");
        let inner = stmt.to_statement();
        assert!(inner.validate().is_ok());
        assert_eq!(inner.to_sql(), "UPDATE t SET a = $1 WHERE b = $2");
    }

    #[test]
    fn call_uses_select_syntax() {
        let call = ProcedureCall::new("refresh_stats(?)", Arc::new(Postgres::new())).parameter(3);
        let stmt = call.statement();
        assert_eq!(stmt.text(), "SELECT * FROM refresh_stats(?) AS result");
        assert_eq!(stmt.params(), &[Parameter::from(3)]);
    }
}
