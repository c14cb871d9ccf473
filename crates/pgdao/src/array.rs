//! Two-dimensional PostgreSQL arrays.
//!
//! `tokio-postgres` maps one-dimensional arrays onto `Vec<T>` but rejects anything
//! deeper. [`Array2`] fills that gap for rectangular `T[][]` columns and parameters,
//! using the same binary array encoding.

use bytes::BytesMut;
use fallible_iterator::FallibleIterator;
use postgres_protocol::types::{self, ArrayDimension};
use std::error::Error;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A rectangular two-dimensional array, stored row by row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array2<T>(pub Vec<Vec<T>>);

impl<T> Array2<T> {
    pub fn new(rows: Vec<Vec<T>>) -> Self {
        Self(rows)
    }

    pub fn into_inner(self) -> Vec<Vec<T>> {
        self.0
    }

    /// Number of rows and columns. A jagged array is an error.
    fn shape(&self) -> Result<(usize, usize), BoxError> {
        let cols = self.0.first().map_or(0, Vec::len);
        if self.0.iter().any(|row| row.len() != cols) {
            return Err("two-dimensional array rows must all have the same length".into());
        }
        Ok((self.0.len(), cols))
    }
}

impl<T> From<Vec<Vec<T>>> for Array2<T> {
    fn from(rows: Vec<Vec<T>>) -> Self {
        Self(rows)
    }
}

fn member_type(ty: &Type) -> Result<&Type, BoxError> {
    match ty.kind() {
        Kind::Array(member) => Ok(member),
        _ => Err(format!("expected an array type, got {}", ty.name()).into()),
    }
}

fn dimension(len: usize) -> Result<ArrayDimension, BoxError> {
    Ok(ArrayDimension {
        len: i32::try_from(len).map_err(|_| "array dimension exceeds i32::MAX")?,
        lower_bound: 1,
    })
}

impl<T: ToSql> ToSql for Array2<T> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let member = member_type(ty)?;
        let (rows, cols) = self.shape()?;

        // an empty array has no dimensions at all
        let dimensions = if rows == 0 || cols == 0 {
            Vec::new()
        } else {
            vec![dimension(rows)?, dimension(cols)?]
        };

        types::array_to_sql(
            dimensions,
            member.oid(),
            self.0.iter().flatten(),
            |element, buf| match element.to_sql(member, buf)? {
                IsNull::No => Ok(postgres_protocol::IsNull::No),
                IsNull::Yes => Ok(postgres_protocol::IsNull::Yes),
            },
            out,
        )?;
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        match ty.kind() {
            Kind::Array(member) => T::accepts(member),
            _ => false,
        }
    }

    to_sql_checked!();
}

impl<'a, T: FromSql<'a>> FromSql<'a> for Array2<T> {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let member = member_type(ty)?;
        let array = types::array_from_sql(raw)?;
        let dims: Vec<ArrayDimension> = array.dimensions().collect()?;

        let (rows, cols) = match dims.as_slice() {
            [] => return Ok(Self(Vec::new())),
            [rows, cols] => (rows.len as usize, cols.len as usize),
            _ => {
                return Err(format!(
                    "expected a two-dimensional array, got {} dimension(s)",
                    dims.len()
                )
                .into());
            }
        };

        let flat: Vec<T> = array
            .values()
            .map(|value| T::from_sql_nullable(member, value))
            .collect()?;
        if flat.len() != rows * cols {
            return Err("array element count does not match its dimensions".into());
        }

        let mut values = flat.into_iter();
        let grid = (0..rows)
            .map(|_| values.by_ref().take(cols).collect())
            .collect();
        Ok(Self(grid))
    }

    fn accepts(ty: &Type) -> bool {
        match ty.kind() {
            Kind::Array(member) => T::accepts(member),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: ToSql>(value: &Array2<T>, ty: &Type) -> BytesMut {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf).expect("encodes");
        buf
    }

    #[test]
    fn int_grid_survives_the_wire_format() {
        let grid = Array2(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        let buf = encode(&grid, &Type::INT4_ARRAY);
        let back = Array2::<i32>::from_sql(&Type::INT4_ARRAY, &buf).expect("decodes");
        assert_eq!(back, grid);
    }

    #[test]
    fn empty_grid_has_no_dimensions() {
        let grid: Array2<f64> = Array2(Vec::new());
        let buf = encode(&grid, &Type::FLOAT8_ARRAY);
        let array = types::array_from_sql(&buf).expect("valid array");
        assert_eq!(array.dimensions().count().expect("dimensions"), 0);
        let back = Array2::<f64>::from_sql(&Type::FLOAT8_ARRAY, &buf).expect("decodes");
        assert!(back.0.is_empty());
    }

    #[test]
    fn jagged_rows_are_rejected() {
        let grid = Array2(vec![vec![1, 2], vec![3]]);
        let mut buf = BytesMut::new();
        assert!(grid.to_sql(&Type::INT4_ARRAY, &mut buf).is_err());
    }

    #[test]
    fn one_dimensional_input_is_rejected() {
        let mut buf = BytesMut::new();
        vec![1i32, 2, 3]
            .to_sql(&Type::INT4_ARRAY, &mut buf)
            .expect("encodes");
        assert!(Array2::<i32>::from_sql(&Type::INT4_ARRAY, &buf).is_err());
    }

    #[test]
    fn accepts_only_matching_arrays() {
        assert!(<Array2<String> as ToSql>::accepts(&Type::TEXT_ARRAY));
        assert!(!<Array2<String> as ToSql>::accepts(&Type::TEXT));
        assert!(!<Array2<i32> as ToSql>::accepts(&Type::TEXT_ARRAY));
    }
}
