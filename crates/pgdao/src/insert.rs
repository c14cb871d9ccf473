//! Insert and upsert builders.

use crate::clause::{NamedParameter, NamedParameterList};
use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::error::{DaoError, DaoResult};
use crate::extract::{self, exactly_one};
use crate::param::Parameter;
use crate::row::RowExt;
use crate::statement::Statement;
use std::sync::Arc;

/// Table name plus the ordered column/value pairs of an insert.
#[derive(Debug, Clone)]
struct Columns {
    table: String,
    dialect: Arc<dyn Dialect>,
    entries: Vec<(String, Parameter)>,
}

impl Columns {
    fn new(table: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            table: table.to_string(),
            dialect,
            entries: Vec::new(),
        }
    }

    fn with(&self, name: impl Into<String>, value: Parameter) -> Self {
        let mut next = self.clone();
        next.entries.push((name.into(), value));
        next
    }

    fn with_all(&self, list: &NamedParameterList) -> Self {
        let mut next = self.clone();
        next.entries.extend(
            list.iter()
                .map(|named| (named.name().to_string(), named.parameter().clone())),
        );
        next
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `INSERT INTO t (a, b) VALUES (?,?)`
    ///
    /// Column names follow the named parameter rule: a name with a marker is a
    /// usage error.
    fn insert(&self) -> DaoResult<Statement> {
        if self.entries.is_empty() {
            return Err(DaoError::usage(
                "insert/upsert expects at least one value() or key()",
            ));
        }
        let columns = self
            .entries
            .iter()
            .map(|(name, value)| NamedParameter::new(name.as_str(), value.clone()))
            .collect::<DaoResult<Vec<_>>>()?;
        let names: Vec<&str> = columns.iter().map(NamedParameter::name).collect();
        let markers: Vec<String> = columns
            .iter()
            .map(|c| c.parameter().placeholder(self.dialect.as_ref()))
            .collect();
        let text = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            names.join(", "),
            markers.join(",")
        );
        let mut stmt = Statement::new(text, Arc::clone(&self.dialect));
        for column in columns {
            stmt = stmt.bind(column.parameter().clone());
        }
        Ok(stmt)
    }

    /// The insert followed by the conflict clause for `keys` leading key columns.
    fn upsert(&self, keys: usize) -> DaoResult<Statement> {
        let stmt = self.insert()?;
        if keys == 0 {
            return Ok(stmt);
        }
        let names: Vec<&str> = self.names().collect();
        let (key_names, value_names) = names.split_at(keys);
        if value_names.is_empty() {
            return Ok(stmt.append(" ON CONFLICT DO NOTHING"));
        }
        let updates: Vec<String> = value_names
            .iter()
            .map(|name| format!("{name} = EXCLUDED.{name}"))
            .collect();
        Ok(stmt.append(&format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            key_names.join(","),
            updates.join(",")
        )))
    }
}

/// `INSERT INTO table`, before the first value.
#[derive(Debug, Clone)]
pub struct InsertHeader {
    columns: Columns,
}

impl InsertHeader {
    pub(crate) fn new(table: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            columns: Columns::new(table, dialect),
        }
    }

    pub fn value(&self, name: impl Into<String>, value: impl Into<Parameter>) -> InsertStatement {
        InsertStatement {
            columns: self.columns.with(name, value.into()),
        }
    }

    pub fn values(&self, list: &NamedParameterList) -> InsertStatement {
        InsertStatement {
            columns: self.columns.with_all(list),
        }
    }
}

/// An insert with at least one column.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    columns: Columns,
}

impl InsertStatement {
    pub fn value(&self, name: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self {
            columns: self.columns.with(name, value.into()),
        }
    }

    pub fn values(&self, list: &NamedParameterList) -> Self {
        Self {
            columns: self.columns.with_all(list),
        }
    }

    /// The statement `execute` runs.
    pub fn statement(&self) -> DaoResult<Statement> {
        self.columns.insert()
    }

    pub async fn execute(&self, conn: &impl GenericClient) -> DaoResult<u64> {
        extract::execute(&self.statement()?, conn).await
    }

    /// Insert and return the generated key, read from the first column of the new row.
    pub async fn create(&self, conn: &impl GenericClient) -> DaoResult<i32> {
        self.returning("*", conn).await
    }

    /// Insert and return the integer value of `column` in the new row.
    pub async fn create_column(&self, column: &str, conn: &impl GenericClient) -> DaoResult<i32> {
        self.returning(column, conn).await
    }

    async fn returning(&self, column: &str, conn: &impl GenericClient) -> DaoResult<i32> {
        let stmt = self.statement()?.append(&format!(" RETURNING {column}"));
        let rows = extract::open(&stmt, conn).await?;
        exactly_one(rows, |row| {
            row.int_column(0usize)?
                .ok_or_else(|| DaoError::decode(column, "no key was generated"))
        })
        .await
    }
}

/// `INSERT INTO table … ON CONFLICT`, collecting the key columns.
#[derive(Debug, Clone)]
pub struct UpsertHeader {
    columns: Columns,
}

impl UpsertHeader {
    pub(crate) fn new(table: &str, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            columns: Columns::new(table, dialect),
        }
    }

    /// Add a column of the conflict target.
    pub fn key(&self, name: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self {
            columns: self.columns.with(name, value.into()),
        }
    }

    pub fn keys(&self, list: &NamedParameterList) -> Self {
        Self {
            columns: self.columns.with_all(list),
        }
    }

    /// First value column. Every key has been given at this point.
    pub fn value(&self, name: impl Into<String>, value: impl Into<Parameter>) -> UpsertStatement {
        UpsertStatement {
            key_count: self.columns.entries.len(),
            columns: self.columns.with(name, value.into()),
        }
    }

    pub fn values(&self, list: &NamedParameterList) -> UpsertStatement {
        UpsertStatement {
            key_count: self.columns.entries.len(),
            columns: self.columns.with_all(list),
        }
    }

    /// Insert the keys alone, ignoring a conflict: `ON CONFLICT DO NOTHING`.
    pub fn statement(&self) -> DaoResult<Statement> {
        Ok(self.columns.insert()?.append(" ON CONFLICT DO NOTHING"))
    }

    pub async fn execute(&self, conn: &impl GenericClient) -> DaoResult<u64> {
        extract::execute(&self.statement()?, conn).await
    }
}

/// Keys followed by value columns. On a key conflict the value columns are
/// overwritten. Without keys this is a plain insert.
#[derive(Debug, Clone)]
pub struct UpsertStatement {
    columns: Columns,
    key_count: usize,
}

impl UpsertStatement {
    pub fn value(&self, name: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self {
            columns: self.columns.with(name, value.into()),
            key_count: self.key_count,
        }
    }

    pub fn values(&self, list: &NamedParameterList) -> Self {
        Self {
            columns: self.columns.with_all(list),
            key_count: self.key_count,
        }
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }

    pub fn statement(&self) -> DaoResult<Statement> {
        self.columns.upsert(self.key_count)
    }

    pub async fn execute(&self, conn: &impl GenericClient) -> DaoResult<u64> {
        extract::execute(&self.statement()?, conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;

    fn pg() -> Arc<dyn Dialect> {
        Arc::new(Postgres::new())
    }

    #[test]
    fn insert_lists_columns_and_markers() {
        let stmt = InsertHeader::new("agent", pg())
            .value("name", "Bond")
            .value("number", 7)
            .statement()
            .expect("insert");
        assert_eq!(stmt.text(), "INSERT INTO agent (name, number) VALUES (?,?)");
        assert_eq!(stmt.params(), &[Parameter::from("Bond"), Parameter::from(7)]);
        assert_eq!(stmt.to_sql(), "INSERT INTO agent (name, number) VALUES ($1,$2)");
    }

    #[test]
    fn insert_with_empty_list_is_a_usage_error() {
        let err = InsertHeader::new("agent", pg())
            .values(&NamedParameterList::new())
            .statement()
            .expect_err("no columns");
        assert!(err.is_usage());
    }

    #[test]
    fn upsert_updates_the_value_columns() {
        let stmt = UpsertHeader::new("counter", pg())
            .key("id", 123)
            .value("val", 13)
            .value("label", "x")
            .statement()
            .expect("upsert");
        assert_eq!(
            stmt.text(),
            "INSERT INTO counter (id, val, label) VALUES (?,?,?) \
             ON CONFLICT (id) DO UPDATE SET val = EXCLUDED.val,label = EXCLUDED.label"
        );
        assert_eq!(stmt.params().len(), 3);
    }

    #[test]
    fn upsert_with_composite_key() {
        let stmt = UpsertHeader::new("pair", pg())
            .key("a", 1)
            .key("b", 2)
            .value("c", 3)
            .statement()
            .expect("upsert");
        assert!(stmt.text().ends_with(" ON CONFLICT (a,b) DO UPDATE SET c = EXCLUDED.c"));
    }

    #[test]
    fn keys_only_ignore_conflicts() {
        let header = UpsertHeader::new("tag", pg()).key("name", "rust");
        assert_eq!(
            header.statement().expect("keys").text(),
            "INSERT INTO tag (name) VALUES (?) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn upsert_without_keys_is_an_insert() {
        let stmt = UpsertHeader::new("tag", pg()).value("name", "rust");
        assert_eq!(stmt.key_count(), 0);
        assert_eq!(
            stmt.statement().expect("insert").text(),
            "INSERT INTO tag (name) VALUES (?)"
        );
        assert!(UpsertHeader::new("tag", pg()).statement().expect_err("empty").is_usage());
    }

    #[test]
    fn column_names_must_not_hold_markers() {
        let err = InsertHeader::new("agent", pg())
            .value("name", "Bond")
            .value("age = ?", 3)
            .statement()
            .expect_err("marker in a column name");
        assert!(err.is_usage());
        assert!(err.to_string().contains("age = ?"));

        let err = UpsertHeader::new("counter", pg())
            .key("id ?", 1)
            .value("val", 2)
            .statement()
            .expect_err("marker in a key name");
        assert!(err.is_usage());
        assert!(UpsertHeader::new("counter", pg()).key("id?", 1).statement().is_err());
    }

    #[test]
    fn keys_from_a_list_count_as_keys() {
        let keys = NamedParameterList::new()
            .with("a", 1)
            .and_then(|l| l.with("b", 2))
            .expect("keys");
        let stmt = UpsertHeader::new("pair", pg()).keys(&keys).value("c", 3);
        assert_eq!(stmt.key_count(), 2);
    }
}
