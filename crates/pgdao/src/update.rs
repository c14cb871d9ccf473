//! Update and delete builders.

use crate::clause::{NamedParameterList, StatementModifier, WhereClause};
use crate::client::GenericClient;
use crate::dialect::{Dialect, has_marker};
use crate::error::{DaoError, DaoResult};
use crate::extract;
use crate::param::Parameter;
use crate::statement::Statement;
use std::sync::Arc;

/// `UPDATE table SET …`, collecting assignments.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    stmt: Statement,
    sets: usize,
}

impl UpdateStatement {
    pub(crate) fn new(table: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            stmt: Statement::new(format!("UPDATE {table} SET "), dialect),
            sets: 0,
        }
    }

    fn separator(&self) -> &'static str {
        if self.sets > 0 { ", " } else { "" }
    }

    /// Assign a value. Without a marker in `name` this renders as `name=?`,
    /// otherwise `name` is used as is (e.g. `counter = counter + ?`).
    pub fn set(&self, name: &str, value: impl Into<Parameter>) -> Self {
        let value = value.into();
        let fragment = if has_marker(name) {
            name.to_string()
        } else {
            format!("{name}={}", value.placeholder(self.stmt.dialect()))
        };
        Self {
            stmt: self
                .stmt
                .append_with(&format!("{}{fragment}", self.separator()), Some(value)),
            sets: self.sets + 1,
        }
    }

    /// An assignment without parameter, such as `modified = now()`.
    pub fn set_raw(&self, clause: &str) -> DaoResult<Self> {
        if has_marker(clause) {
            return Err(DaoError::usage(format!(
                "set without parameter must not contain a question mark: {clause}"
            )));
        }
        Ok(Self {
            stmt: self.stmt.append(&format!("{}{clause}", self.separator())),
            sets: self.sets + 1,
        })
    }

    /// Assign every entry of the list, in order.
    pub fn set_all(&self, list: &NamedParameterList) -> Self {
        list.iter()
            .fold(self.clone(), |acc, named| acc.set(named.name(), named.parameter().clone()))
    }

    pub fn filter(&self, clause: impl Into<String>, value: impl Into<Parameter>) -> UpdateOrDeleteStatement {
        self.filter_clause(&WhereClause::new(clause, value))
    }

    pub fn filter_raw(&self, clause: impl Into<String>) -> DaoResult<UpdateOrDeleteStatement> {
        Ok(self.filter_clause(&WhereClause::raw(clause)?))
    }

    pub fn filter_clause(&self, clause: &WhereClause) -> UpdateOrDeleteStatement {
        self.unfiltered().filter_clause(clause)
    }

    pub fn filter_by(&self, modifier: &impl StatementModifier) -> UpdateOrDeleteStatement {
        self.unfiltered().filter_by(modifier)
    }

    fn unfiltered(&self) -> UpdateOrDeleteStatement {
        UpdateOrDeleteStatement {
            stmt: self.stmt.clone(),
            filtered: false,
        }
    }

    pub fn statement(&self) -> &Statement {
        &self.stmt
    }

    /// Update every row of the table.
    pub async fn execute(&self, conn: &impl GenericClient) -> DaoResult<u64> {
        extract::execute(&self.stmt, conn).await
    }
}

/// A filtered update, or a delete.
#[derive(Debug, Clone)]
pub struct UpdateOrDeleteStatement {
    stmt: Statement,
    filtered: bool,
}

impl UpdateOrDeleteStatement {
    /// `DELETE FROM table`
    pub(crate) fn delete_from(table: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            stmt: Statement::new(format!("DELETE FROM {table}"), dialect),
            filtered: false,
        }
    }

    pub fn filter(&self, clause: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.filter_clause(&WhereClause::new(clause, value))
    }

    pub fn filter_raw(&self, clause: impl Into<String>) -> DaoResult<Self> {
        Ok(self.filter_clause(&WhereClause::raw(clause)?))
    }

    pub fn filter_clause(&self, clause: &WhereClause) -> Self {
        Self {
            stmt: self.stmt.condition(!self.filtered, " WHERE ", clause),
            filtered: true,
        }
    }

    pub fn filter_by(&self, modifier: &impl StatementModifier) -> Self {
        modifier
            .where_clauses()
            .iter()
            .fold(self.clone(), |acc, clause| acc.filter_clause(clause))
    }

    pub fn statement(&self) -> &Statement {
        &self.stmt
    }

    /// Run the statement and return the number of affected rows.
    pub async fn execute(&self, conn: &impl GenericClient) -> DaoResult<u64> {
        extract::execute(&self.stmt, conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;

    fn update(table: &str) -> UpdateStatement {
        UpdateStatement::new(table, Arc::new(Postgres::new()))
    }

    #[test]
    fn sets_are_comma_separated() {
        let stmt = update("agent")
            .set("name", "Bond")
            .set("counter = counter + ?", 1)
            .set_raw("modified = now()")
            .expect("raw set")
            .filter("id", 7);
        assert_eq!(
            stmt.statement().text(),
            "UPDATE agent SET name=?, counter = counter + ?, modified = now() WHERE id = ?"
        );
        assert_eq!(
            stmt.statement().params(),
            &[Parameter::from("Bond"), Parameter::from(1), Parameter::from(7)]
        );
    }

    #[test]
    fn raw_set_with_marker_is_rejected() {
        assert!(update("agent").set_raw("name = ?").expect_err("marker").is_usage());
    }

    #[test]
    fn set_all_uses_the_list_order() {
        let list = NamedParameterList::new()
            .with("a", 1)
            .and_then(|l| l.with("b", "two"))
            .expect("list");
        let stmt = update("t").set_all(&list);
        assert_eq!(stmt.statement().text(), "UPDATE t SET a=?, b=?");
    }

    #[test]
    fn delete_with_conditions() {
        let stmt = UpdateOrDeleteStatement::delete_from("agent", Arc::new(Postgres::new()))
            .filter("id", 7)
            .filter_raw("retired")
            .expect("raw");
        assert_eq!(stmt.statement().text(), "DELETE FROM agent WHERE id = ? AND retired");
        assert_eq!(stmt.statement().params().len(), 1);
    }

    #[test]
    fn filter_by_applies_every_clause() {
        let keys = NamedParameterList::new()
            .with("a", 1)
            .and_then(|l| l.with("b", 2))
            .expect("keys");
        let stmt = update("t").set("c", 3).filter_by(&keys).filter("d > ?", 4);
        assert_eq!(stmt.statement().text(), "UPDATE t SET c=? WHERE a = ? AND b = ? AND d > ?");
        assert_eq!(stmt.statement().params().len(), 4);
    }
}
