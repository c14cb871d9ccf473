//! Row mapping traits and utilities

use crate::array::Array2;
use crate::error::{DaoError, DaoResult};
use crate::param::{EnumLabel, SqlEnum};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::fmt;
use tokio_postgres::Row;
use tokio_postgres::row::RowIndex;
use tokio_postgres::types::{FromSql, FromSqlOwned, Type};

/// Trait for types that can be constructed from a database row.
///
/// This trait should typically be derived using `#[derive(FromRow)]`
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> DaoResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning DaoError::Decode on failure
    fn try_get_column<I, T>(&self, idx: I) -> DaoResult<T>
    where
        I: RowIndex + fmt::Display,
        T: FromSqlOwned;

    /// Integer column of any width whose value fits an `i32`.
    fn int_column<I>(&self, idx: I) -> DaoResult<Option<i32>>
    where
        I: RowIndex + fmt::Display,
    {
        let name = idx.to_string();
        match self.long_column(idx)? {
            None => Ok(None),
            Some(value) => i32::try_from(value)
                .map(Some)
                .map_err(|_| DaoError::decode(name, format!("{value} does not fit an i32"))),
        }
    }

    /// Integer column of any width.
    fn long_column<I>(&self, idx: I) -> DaoResult<Option<i64>>
    where
        I: RowIndex + fmt::Display,
    {
        Ok(self
            .try_get_column::<_, Option<WideInt>>(idx)?
            .map(|WideInt(v)| v))
    }

    /// Floating point, numeric or integer column.
    fn double_column<I>(&self, idx: I) -> DaoResult<Option<f64>>
    where
        I: RowIndex + fmt::Display,
    {
        Ok(self
            .try_get_column::<_, Option<WideFloat>>(idx)?
            .map(|WideFloat(v)| v))
    }

    /// Enum (or text) column mapped onto `E`.
    fn enum_column<I, E>(&self, idx: I) -> DaoResult<Option<E>>
    where
        I: RowIndex + fmt::Display,
        E: SqlEnum,
    {
        let name = idx.to_string();
        match self.try_get_column::<_, Option<EnumLabel>>(idx)? {
            None => Ok(None),
            Some(EnumLabel(label)) => E::from_label(&label).map(Some).ok_or_else(|| {
                DaoError::decode(name, format!("unknown {} label {label:?}", E::TYPE_NAME))
            }),
        }
    }

    /// Two-dimensional array column.
    fn array2_column<I, T>(&self, idx: I) -> DaoResult<Option<Vec<Vec<T>>>>
    where
        I: RowIndex + fmt::Display,
        T: FromSqlOwned,
    {
        Ok(self
            .try_get_column::<_, Option<Array2<T>>>(idx)?
            .map(Array2::into_inner))
    }
}

impl RowExt for Row {
    fn try_get_column<I, T>(&self, idx: I) -> DaoResult<T>
    where
        I: RowIndex + fmt::Display,
        T: FromSqlOwned,
    {
        let name = idx.to_string();
        self.try_get(idx)
            .map_err(|e| DaoError::decode(name, e.to_string()))
    }
}

type BoxError = Box<dyn Error + Sync + Send>;

/// An `smallint`, `integer` or `bigint` value widened to `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WideInt(i64);

impl<'a> FromSql<'a> for WideInt {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = if *ty == Type::INT2 {
            i64::from(i16::from_sql(ty, raw)?)
        } else if *ty == Type::INT4 {
            i64::from(i32::from_sql(ty, raw)?)
        } else {
            i64::from_sql(ty, raw)?
        };
        Ok(Self(value))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8
    }
}

/// A floating point, numeric or integer value widened to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WideFloat(f64);

impl<'a> FromSql<'a> for WideFloat {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = if *ty == Type::FLOAT4 {
            f64::from(f32::from_sql(ty, raw)?)
        } else if *ty == Type::FLOAT8 {
            f64::from_sql(ty, raw)?
        } else if *ty == Type::NUMERIC {
            Decimal::from_sql(ty, raw)?
                .to_f64()
                .ok_or("numeric value does not fit an f64")?
        } else {
            #[allow(clippy::cast_precision_loss)]
            let widened = WideInt::from_sql(ty, raw)?.0 as f64;
            widened
        };
        Ok(Self(value))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::FLOAT4 || *ty == Type::FLOAT8 || *ty == Type::NUMERIC || WideInt::accepts(ty)
    }
}
