//! Executing queries and shaping their rows.
//!
//! Every query builder implements [`Query`]. Its methods all run the statement
//! once, consume the rows and release them before returning. They differ only in
//! how many rows they expect and what they turn them into:
//!
//! | method family | 0 rows | 1 row | 2+ rows |
//! |---|---|---|---|
//! | `get_int`, `get_double`, `get_boolean` | 0 / NaN / false | value | `AnswerNotUnique` |
//! | `get_string`, `get_date`, … | `None` | `Some(value)` | `AnswerNotUnique` |
//! | `get_one_*` | `NotFound` | value | `AnswerNotUnique` |
//! | `find_*` | `None` | `Some(value)` | `AnswerNotUnique` |
//! | `get_list`, `get_map`, `process`, … | empty | one item | every row, in order |
//!
//! Uniqueness is checked by trying to fetch a second row after converting the
//! first. Scalar methods read the first column.

use crate::array::Array2;
use crate::client::{GenericClient, RowStream};
use crate::error::{DaoError, DaoResult};
use crate::param::SqlEnum;
use crate::row::{FromRow, RowExt};
use crate::statement::{Statement, ToStatement};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_core::Stream;
use futures_util::{StreamExt, TryStreamExt};
use indexmap::IndexMap;
use std::future::Future;
use std::hash::Hash;
use tokio_postgres::Row;
use tokio_postgres::types::FromSqlOwned;

/// Validate, render and run a query, returning its rows as a stream.
pub(crate) async fn open(stmt: &Statement, conn: &impl GenericClient) -> DaoResult<RowStream> {
    stmt.validate()?;
    let sql = stmt.to_sql();
    crate::trace::statement("query", &sql, stmt.params().len());
    let params = stmt.params_ref();
    conn.query_stream(&sql, &params).await
}

/// Validate, render and run a statement, returning the affected row count.
pub(crate) async fn execute(stmt: &Statement, conn: &impl GenericClient) -> DaoResult<u64> {
    stmt.validate()?;
    let sql = stmt.to_sql();
    crate::trace::statement("execute", &sql, stmt.params().len());
    let params = stmt.params_ref();
    conn.execute(&sql, &params).await
}

/// Convert the only item of `rows`, if any.
///
/// A second item makes the whole call fail with `AnswerNotUnique`.
pub(crate) async fn at_most_one<S, R, T, F>(mut rows: S, convert: F) -> DaoResult<Option<T>>
where
    S: Stream<Item = DaoResult<R>> + Unpin,
    F: FnOnce(&R) -> DaoResult<T>,
{
    let Some(first) = rows.next().await else {
        return Ok(None);
    };
    let value = convert(&first?)?;
    match rows.next().await {
        None => Ok(Some(value)),
        Some(Ok(_)) => Err(DaoError::not_unique("expected a single row as a result")),
        Some(Err(e)) => Err(e),
    }
}

/// Convert the only item of `rows`. No items fails with `NotFound`.
pub(crate) async fn exactly_one<S, R, T, F>(rows: S, convert: F) -> DaoResult<T>
where
    S: Stream<Item = DaoResult<R>> + Unpin,
    F: FnOnce(&R) -> DaoResult<T>,
{
    at_most_one(rows, convert)
        .await?
        .ok_or_else(|| DaoError::not_found("expected a single row, got none"))
}

fn first<T: FromSqlOwned>(row: &Row) -> DaoResult<Option<T>> {
    row.try_get_column(0usize)
}

fn required<T>(row: &Row, value: Option<T>) -> DaoResult<T> {
    value.ok_or_else(|| {
        let column = row.columns().first().map_or("0", |c| c.name());
        DaoError::decode(column, "unexpected NULL")
    })
}

macro_rules! value_getters {
    ($(#[$doc:meta])* $ty:ty => $get:ident, $find:ident, $get_one:ident) => {
        $(#[$doc])*
        /// `None` when there is no row or the value is NULL.
        fn $get(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<$ty>>> + Send {
            self.get_value::<$ty>(conn)
        }

        $(#[$doc])*
        /// `None` when there is no row.
        fn $find(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<$ty>>> + Send {
            self.find_value::<$ty>(conn)
        }

        $(#[$doc])*
        /// Fails with `NotFound` when there is no row.
        fn $get_one(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<$ty>> + Send {
            self.get_one_value::<$ty>(conn)
        }
    };
}

/// Execution and result extraction for query builders.
pub trait Query: ToStatement + Sync {
    /// Run the query and stream its rows.
    fn rows(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<RowStream>> + Send {
        async move { open(&self.to_statement(), conn).await }
    }

    // ---- objects ----

    /// Convert the only row, if any.
    fn find_object<T, F>(
        &self,
        conn: &impl GenericClient,
        convert: F,
    ) -> impl Future<Output = DaoResult<Option<T>>> + Send
    where
        T: Send,
        F: FnOnce(&Row) -> DaoResult<T> + Send,
    {
        async move { at_most_one(self.rows(conn).await?, convert).await }
    }

    /// Convert the only row.
    fn get_one_object<T, F>(
        &self,
        conn: &impl GenericClient,
        convert: F,
    ) -> impl Future<Output = DaoResult<T>> + Send
    where
        T: Send,
        F: FnOnce(&Row) -> DaoResult<T> + Send,
    {
        async move { exactly_one(self.rows(conn).await?, convert).await }
    }

    fn find_as<T>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<T>>> + Send
    where
        T: FromRow + Send,
    {
        self.find_object(conn, T::from_row)
    }

    fn get_one_as<T>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<T>> + Send
    where
        T: FromRow + Send,
    {
        self.get_one_object(conn, T::from_row)
    }

    /// Convert every row, in result order.
    fn get_list<T, F>(
        &self,
        conn: &impl GenericClient,
        mut convert: F,
    ) -> impl Future<Output = DaoResult<Vec<T>>> + Send
    where
        T: Send,
        F: FnMut(&Row) -> DaoResult<T> + Send,
    {
        async move {
            let mut rows = self.rows(conn).await?;
            let mut list = Vec::new();
            while let Some(row) = rows.next().await {
                list.push(convert(&row?)?);
            }
            Ok(list)
        }
    }

    fn get_list_as<T>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Vec<T>>> + Send
    where
        T: FromRow + Send,
    {
        self.get_list(conn, T::from_row)
    }

    /// Hand the complete result to `convert` at once.
    fn convert<T, F>(&self, conn: &impl GenericClient, convert: F) -> impl Future<Output = DaoResult<T>> + Send
    where
        T: Send,
        F: FnOnce(&[Row]) -> DaoResult<T> + Send,
    {
        async move {
            let rows: Vec<Row> = self.rows(conn).await?.try_collect().await?;
            convert(&rows)
        }
    }

    // ---- maps and processing ----

    /// Build a map with one entry per row, in row order. A repeated key keeps its
    /// original position and takes the later value.
    fn get_map<K, V, KF, VF>(
        &self,
        conn: &impl GenericClient,
        mut key: KF,
        mut value: VF,
    ) -> impl Future<Output = DaoResult<IndexMap<K, V>>> + Send
    where
        K: Hash + Eq + Send,
        V: Send,
        KF: FnMut(&Row) -> DaoResult<K> + Send,
        VF: FnMut(&Row) -> DaoResult<V> + Send,
    {
        async move {
            let mut rows = self.rows(conn).await?;
            let mut map = IndexMap::new();
            while let Some(row) = rows.next().await {
                let row = row?;
                map.insert(key(&row)?, value(&row)?);
            }
            Ok(map)
        }
    }

    /// [`get_map`](Self::get_map) keyed by the integer in the first column.
    fn get_map_by_int<V, VF>(
        &self,
        conn: &impl GenericClient,
        value: VF,
    ) -> impl Future<Output = DaoResult<IndexMap<i32, V>>> + Send
    where
        V: Send,
        VF: FnMut(&Row) -> DaoResult<V> + Send,
    {
        self.get_map(conn, int_key, value)
    }

    /// For every row, look up the entry for its key and let `process` update it.
    /// Rows whose key is not in the map are skipped.
    fn process_map<K, V, KF, PF>(
        &self,
        conn: &impl GenericClient,
        map: &mut IndexMap<K, V>,
        mut key: KF,
        mut process: PF,
    ) -> impl Future<Output = DaoResult<()>> + Send
    where
        K: Hash + Eq + Send,
        V: Send,
        KF: FnMut(&Row) -> DaoResult<K> + Send,
        PF: FnMut(&mut V, &Row) -> DaoResult<()> + Send,
    {
        async move {
            let mut rows = self.rows(conn).await?;
            while let Some(row) = rows.next().await {
                let row = row?;
                match map.get_mut(&key(&row)?) {
                    Some(entry) => process(entry, &row)?,
                    None => crate::trace::skipped_row(),
                }
            }
            Ok(())
        }
    }

    /// [`process_map`](Self::process_map) keyed by the integer in the first column.
    fn process_map_by_int<V, PF>(
        &self,
        conn: &impl GenericClient,
        map: &mut IndexMap<i32, V>,
        process: PF,
    ) -> impl Future<Output = DaoResult<()>> + Send
    where
        V: Send,
        PF: FnMut(&mut V, &Row) -> DaoResult<()> + Send,
    {
        self.process_map(conn, map, int_key, process)
    }

    /// Feed every row into `dest`, in row order.
    fn process<D, PF>(
        &self,
        conn: &impl GenericClient,
        dest: &mut D,
        mut process: PF,
    ) -> impl Future<Output = DaoResult<()>> + Send
    where
        D: Send,
        PF: FnMut(&mut D, &Row) -> DaoResult<()> + Send,
    {
        async move {
            let mut rows = self.rows(conn).await?;
            while let Some(row) = rows.next().await {
                process(dest, &row?)?;
            }
            Ok(())
        }
    }

    /// Call `consumer` once per row, in row order.
    fn for_each<F>(&self, conn: &impl GenericClient, mut consumer: F) -> impl Future<Output = DaoResult<()>> + Send
    where
        F: FnMut(&Row) -> DaoResult<()> + Send,
    {
        async move {
            let mut rows = self.rows(conn).await?;
            while let Some(row) = rows.next().await {
                consumer(&row?)?;
            }
            Ok(())
        }
    }

    // ---- first-column values ----

    /// First column of the only row. `None` for no row and for NULL.
    fn get_value<T>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<T>>> + Send
    where
        T: FromSqlOwned + Send,
    {
        async move { Ok(self.find_object(conn, first::<T>).await?.flatten()) }
    }

    /// First column of the only row, if any. NULL is a decode error.
    fn find_value<T>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<T>>> + Send
    where
        T: FromSqlOwned + Send,
    {
        self.find_object(conn, |row| required(row, first::<T>(row)?))
    }

    /// First column of the only row. NULL is a decode error.
    fn get_one_value<T>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<T>> + Send
    where
        T: FromSqlOwned + Send,
    {
        self.get_one_object(conn, |row| required(row, first::<T>(row)?))
    }

    /// The integer result, or 0 for no row or NULL. Any integer width is accepted.
    fn get_int(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<i32>> + Send {
        async move {
            let value = self.find_object(conn, |row| row.int_column(0usize)).await?;
            Ok(value.flatten().unwrap_or(0))
        }
    }

    fn find_int(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<i32>>> + Send {
        self.find_object(conn, |row| required(row, row.int_column(0usize)?))
    }

    fn get_one_int(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<i32>> + Send {
        self.get_one_object(conn, |row| required(row, row.int_column(0usize)?))
    }

    /// The integer result, or 0 for no row or NULL.
    fn get_long(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<i64>> + Send {
        async move {
            let value = self.find_object(conn, |row| row.long_column(0usize)).await?;
            Ok(value.flatten().unwrap_or(0))
        }
    }

    fn find_long(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<i64>>> + Send {
        self.find_object(conn, |row| required(row, row.long_column(0usize)?))
    }

    fn get_one_long(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<i64>> + Send {
        self.get_one_object(conn, |row| required(row, row.long_column(0usize)?))
    }

    /// The numeric result, or NaN for no row or NULL.
    fn get_double(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<f64>> + Send {
        async move {
            let value = self.find_object(conn, |row| row.double_column(0usize)).await?;
            Ok(value.flatten().unwrap_or(f64::NAN))
        }
    }

    fn find_double(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<f64>>> + Send {
        self.find_object(conn, |row| required(row, row.double_column(0usize)?))
    }

    fn get_one_double(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<f64>> + Send {
        self.get_one_object(conn, |row| required(row, row.double_column(0usize)?))
    }

    /// The boolean result, or false for no row or NULL.
    fn get_boolean(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<bool>> + Send {
        async move { Ok(self.get_value::<bool>(conn).await?.unwrap_or(false)) }
    }

    fn find_boolean(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<bool>>> + Send {
        self.find_value::<bool>(conn)
    }

    fn get_one_boolean(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<bool>> + Send {
        self.get_one_value::<bool>(conn)
    }

    value_getters!(
        /// Text result.
        String => get_string, find_string, get_one_string
    );

    /// The text result, or `default` for no row or NULL.
    fn get_string_or_default(
        &self,
        conn: &impl GenericClient,
        default: impl Into<String> + Send,
    ) -> impl Future<Output = DaoResult<String>> + Send {
        async move {
            Ok(match self.get_string(conn).await? {
                Some(value) => value,
                None => default.into(),
            })
        }
    }

    fn get_string_or_empty(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<String>> + Send {
        self.get_string_or_default(conn, String::new())
    }

    value_getters!(
        /// `bytea` result.
        Vec<u8> => get_bytes, find_bytes, get_one_bytes
    );

    value_getters!(
        /// `date` result.
        NaiveDate => get_date, find_date, get_one_date
    );

    value_getters!(
        /// `time` result.
        NaiveTime => get_time, find_time, get_one_time
    );

    value_getters!(
        /// `timestamp` result.
        NaiveDateTime => get_date_time, find_date_time, get_one_date_time
    );

    value_getters!(
        /// `timestamptz` result.
        DateTime<Utc> => get_instant, find_instant, get_one_instant
    );

    // ---- enums ----

    /// Enum result. `None` for no row or NULL; an unknown label is a decode error.
    fn get_enum<E: SqlEnum>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<E>>> + Send {
        async move {
            let value = self.find_object(conn, |row| row.enum_column::<_, E>(0usize)).await?;
            Ok(value.flatten())
        }
    }

    fn find_enum<E: SqlEnum>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<E>>> + Send {
        self.find_object(conn, |row| required(row, row.enum_column::<_, E>(0usize)?))
    }

    fn get_one_enum<E: SqlEnum>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<E>> + Send {
        self.get_one_object(conn, |row| required(row, row.enum_column::<_, E>(0usize)?))
    }

    // ---- arrays ----

    /// One-dimensional array result. A NULL array is `None`, not an empty vector.
    fn get_array<T>(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<Vec<T>>>> + Send
    where
        T: FromSqlOwned + Send,
    {
        self.get_value::<Vec<T>>(conn)
    }

    fn get_array_of_int(&self, conn: &impl GenericClient) -> impl Future<Output = DaoResult<Option<Vec<i32>>>> + Send {
        self.get_array::<i32>(conn)
    }

    fn get_array_of_double(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = DaoResult<Option<Vec<f64>>>> + Send {
        self.get_array::<f64>(conn)
    }

    fn get_array_of_string(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = DaoResult<Option<Vec<String>>>> + Send {
        self.get_array::<String>(conn)
    }

    /// Two-dimensional array result. A NULL array is `None`.
    fn get_2dim_array<T>(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = DaoResult<Option<Vec<Vec<T>>>>> + Send
    where
        T: FromSqlOwned + Send,
    {
        async move {
            Ok(self
                .get_value::<Array2<T>>(conn)
                .await?
                .map(Array2::into_inner))
        }
    }

    fn get_2dim_array_of_int(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = DaoResult<Option<Vec<Vec<i32>>>>> + Send {
        self.get_2dim_array::<i32>(conn)
    }

    fn get_2dim_array_of_double(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = DaoResult<Option<Vec<Vec<f64>>>>> + Send {
        self.get_2dim_array::<f64>(conn)
    }

    fn get_2dim_array_of_string(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = DaoResult<Option<Vec<Vec<String>>>>> + Send {
        self.get_2dim_array::<String>(conn)
    }
}

impl Query for Statement {}

fn int_key(row: &Row) -> DaoResult<i32> {
    required(row, row.int_column(0usize)?)
}
