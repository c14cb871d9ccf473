//! Paged queries and the total-count rewrite.

use crate::client::GenericClient;
use crate::error::{DaoError, DaoResult};
use crate::extract::{self, Query};
use crate::row::FromRow;
use crate::statement::{Statement, ToStatement, unique_id};
use futures_util::StreamExt;
use std::borrow::Cow;
use tokio_postgres::Row;

/// One page of a larger result.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    page_size: u32,
    full_size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_size: u32, full_size: u64) -> Self {
        Self {
            items,
            page_size,
            full_size,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Requested page size. The last page may hold fewer items.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows the query yields without offset and limit.
    pub fn full_size(&self) -> u64 {
        self.full_size
    }

    /// Number of pages needed to show every row (0 for a zero page size).
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.full_size.div_ceil(u64::from(self.page_size))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_size: self.page_size,
            full_size: self.full_size,
        }
    }
}

/// An ordered query restricted by offset and limit.
///
/// The ordered body and the offset/limit window are kept apart, so the page
/// rewrite never has to search the text for the OFFSET keyword.
#[derive(Debug, Clone)]
pub struct LimitedStatement {
    body: Statement,
    full: Statement,
    offset: u64,
    limit: Option<u32>,
    compound: bool,
}

impl LimitedStatement {
    pub(crate) fn new(body: Statement, offset: u64, limit: Option<u32>, compound: bool) -> Self {
        let full = body.append(&body.dialect().offset_clause(offset, limit));
        Self {
            body,
            full,
            offset,
            limit,
            compound,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn is_compound(&self) -> bool {
        self.compound
    }

    /// The statement `get_page` runs: the body wrapped so that every row also
    /// carries the total row count, in the column named `count_alias`.
    pub fn page_statement(&self, count_alias: &str) -> Statement {
        let dialect = self.body.dialect();
        let table = unique_id();
        let suffix = dialect.offset_clause(self.offset, self.limit);
        let text = if self.compound {
            dialect.derived_count(self.body.text(), &table, count_alias, &suffix)
        } else {
            dialect.materialized_count(self.body.text(), &table, count_alias, &suffix)
        };
        self.body.with_text(text)
    }

    /// Run the page query once and convert every row.
    pub async fn get_page<T, F>(&self, conn: &impl GenericClient, mut convert: F) -> DaoResult<Page<T>>
    where
        T: Send,
        F: FnMut(&Row) -> DaoResult<T> + Send,
    {
        let count_alias = unique_id();
        let stmt = self.page_statement(&count_alias);
        let mut rows = extract::open(&stmt, conn).await?;

        let mut items = Vec::new();
        let mut full_size = 0;
        while let Some(row) = rows.next().await {
            let row = row?;
            if items.is_empty() {
                full_size = read_count(&row, &count_alias)?;
            }
            items.push(convert(&row)?);
        }
        Ok(Page::new(items, self.limit.unwrap_or(0), full_size))
    }

    /// [`get_page`](Self::get_page) with [`FromRow`] conversion.
    pub async fn get_page_as<T>(&self, conn: &impl GenericClient) -> DaoResult<Page<T>>
    where
        T: FromRow + Send,
    {
        self.get_page(conn, T::from_row).await
    }
}

fn read_count(row: &Row, alias: &str) -> DaoResult<u64> {
    let count: i64 = row
        .try_get(alias)
        .map_err(|e| DaoError::decode(alias, e.to_string()))?;
    u64::try_from(count).map_err(|_| DaoError::decode(alias, format!("negative row count {count}")))
}

impl ToStatement for LimitedStatement {
    fn to_statement(&self) -> Cow<'_, Statement> {
        Cow::Borrowed(&self.full)
    }
}

impl Query for LimitedStatement {}
