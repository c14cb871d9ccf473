//! Bindable parameter values.

use crate::array::Array2;
use crate::dialect::{Dialect, MARKER};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, WrongType, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A Rust enum stored in a PostgreSQL enum (or text) column.
///
/// Usually derived with `#[derive(SqlEnum)]`.
pub trait SqlEnum: Sized + Send + Sync + 'static {
    /// Simple Rust type name, passed through the dialect's enum type translator.
    const TYPE_NAME: &'static str;

    /// Explicit database type name. Bypasses the translator when set.
    const DB_TYPE: Option<&'static str> = None;

    /// Database label of this variant.
    fn label(&self) -> &'static str;

    /// Variant for a database label.
    fn from_label(label: &str) -> Option<Self>;

    fn to_enum_value(&self) -> EnumValue {
        EnumValue {
            type_name: Self::TYPE_NAME,
            db_type: Self::DB_TYPE,
            label: self.label(),
        }
    }
}

/// An enum label together with the information needed to cast it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    type_name: &'static str,
    db_type: Option<&'static str>,
    label: &'static str,
}

impl EnumValue {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn db_type(&self) -> Option<&'static str> {
        self.db_type
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

fn accepts_label(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_))
        || *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
        || *ty == Type::UNKNOWN
}

impl ToSql for EnumValue {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, BoxError> {
        out.extend_from_slice(self.label.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        accepts_label(ty)
    }

    to_sql_checked!();
}

/// The raw label of an enum or text column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumLabel(pub String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(Self(std::str::from_utf8(raw)?.to_owned()))
    }

    fn accepts(ty: &Type) -> bool {
        accepts_label(ty)
    }
}

/// A single typed, bindable value.
///
/// Every variant except [`Parameter::Enum`] can carry SQL `NULL`.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Bool(Option<bool>),
    Int(Option<i32>),
    Long(Option<i64>),
    Double(Option<f64>),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
    DateTime(Option<NaiveDateTime>),
    Instant(Option<DateTime<Utc>>),
    Enum(EnumValue),
    IntArray(Option<Vec<i32>>),
    DoubleArray(Option<Vec<f64>>),
    TextArray(Option<Vec<String>>),
    IntArray2(Option<Array2<i32>>),
    DoubleArray2(Option<Array2<f64>>),
    TextArray2(Option<Array2<String>>),
}

impl Parameter {
    /// Wrap an enum value.
    pub fn enumeration<E: SqlEnum>(value: &E) -> Self {
        Self::Enum(value.to_enum_value())
    }

    /// Placeholder text for this value, containing exactly one marker.
    pub fn placeholder(&self, dialect: &dyn Dialect) -> String {
        match self {
            Self::Enum(value) => dialect.enum_placeholder(value),
            _ => MARKER.to_string(),
        }
    }

    /// The value as the driver binds it.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        self
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Bool(v) => v.is_none(),
            Self::Int(v) => v.is_none(),
            Self::Long(v) => v.is_none(),
            Self::Double(v) => v.is_none(),
            Self::Text(v) => v.is_none(),
            Self::Bytes(v) => v.is_none(),
            Self::Date(v) => v.is_none(),
            Self::Time(v) => v.is_none(),
            Self::DateTime(v) => v.is_none(),
            Self::Instant(v) => v.is_none(),
            Self::Enum(_) => false,
            Self::IntArray(v) => v.is_none(),
            Self::DoubleArray(v) => v.is_none(),
            Self::TextArray(v) => v.is_none(),
            Self::IntArray2(v) => v.is_none(),
            Self::DoubleArray2(v) => v.is_none(),
            Self::TextArray2(v) => v.is_none(),
        }
    }
}

/// Binds to the type the server inferred for the placeholder.
///
/// Integers go into any integer width (range checked) as well as `real`,
/// `double precision` and `numeric`. Doubles go into `real`, `double precision`
/// and `numeric`. Every other variant binds only where its Rust value does.
impl ToSql for Parameter {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Self::Bool(v) => exact(v, ty, out),
            Self::Int(v) => bind_integer(v.map(i64::from), ty, out),
            Self::Long(v) => bind_integer(*v, ty, out),
            Self::Double(v) => bind_double(*v, ty, out),
            Self::Text(v) => exact(v, ty, out),
            Self::Bytes(v) => exact(v, ty, out),
            Self::Date(v) => exact(v, ty, out),
            Self::Time(v) => exact(v, ty, out),
            Self::DateTime(v) => exact(v, ty, out),
            Self::Instant(v) => exact(v, ty, out),
            Self::Enum(v) => exact(v, ty, out),
            Self::IntArray(v) => exact(v, ty, out),
            Self::DoubleArray(v) => exact(v, ty, out),
            Self::TextArray(v) => exact(v, ty, out),
            Self::IntArray2(v) => exact(v, ty, out),
            Self::DoubleArray2(v) => exact(v, ty, out),
            Self::TextArray2(v) => exact(v, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn exact<T: ToSql>(value: &T, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !T::accepts(ty) {
        return Err(Box::new(WrongType::new::<T>(ty.clone())));
    }
    value.to_sql(ty, out)
}

fn is_float(ty: &Type) -> bool {
    *ty == Type::FLOAT4 || *ty == Type::FLOAT8 || *ty == Type::NUMERIC
}

fn bind_integer(value: Option<i64>, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !(*ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8 || is_float(ty)) {
        return Err(Box::new(WrongType::new::<Option<i64>>(ty.clone())));
    }
    let Some(value) = value else {
        return Ok(IsNull::Yes);
    };
    let out_of_range = || format!("{value} is out of range for {}", ty.name());
    if *ty == Type::INT2 {
        i16::try_from(value).map_err(|_| out_of_range())?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(value).map_err(|_| out_of_range())?.to_sql(ty, out)
    } else if *ty == Type::INT8 {
        value.to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        Decimal::from(value).to_sql(ty, out)
    } else {
        #[allow(clippy::cast_precision_loss)]
        let widened = value as f64;
        bind_double(Some(widened), ty, out)
    }
}

fn bind_double(value: Option<f64>, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !is_float(ty) {
        return Err(Box::new(WrongType::new::<Option<f64>>(ty.clone())));
    }
    let Some(value) = value else {
        return Ok(IsNull::Yes);
    };
    if *ty == Type::FLOAT4 {
        #[allow(clippy::cast_possible_truncation)]
        let narrowed = value as f32;
        if narrowed.is_infinite() && value.is_finite() {
            return Err(format!("{value} is out of range for real").into());
        }
        narrowed.to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        let decimal = Decimal::from_str(&value.to_string())
            .map_err(|e| format!("{value} cannot be stored as numeric: {e}"))?;
        decimal.to_sql(ty, out)
    } else {
        value.to_sql(ty, out)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Parameter {
                fn from(value: $ty) -> Self {
                    Self::$variant(Some(value.into()))
                }
            }

            impl From<Option<$ty>> for Parameter {
                fn from(value: Option<$ty>) -> Self {
                    Self::$variant(value.map(Into::into))
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f64 => Double,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<Utc> => Instant,
    Vec<i32> => IntArray,
    Vec<f64> => DoubleArray,
    Vec<String> => TextArray,
    Array2<i32> => IntArray2,
    Array2<f64> => DoubleArray2,
    Array2<String> => TextArray2,
    Vec<Vec<i32>> => IntArray2,
    Vec<Vec<f64>> => DoubleArray2,
    Vec<Vec<String>> => TextArray2,
}

impl From<&[&str]> for Parameter {
    fn from(value: &[&str]) -> Self {
        Self::TextArray(Some(value.iter().map(|s| (*s).to_owned()).collect()))
    }
}

impl<E: SqlEnum> From<E> for Parameter {
    fn from(value: E) -> Self {
        Self::Enum(value.to_enum_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Postgres, Verbatim};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum DayOfWeek {
        Monday,
        Friday,
    }

    impl SqlEnum for DayOfWeek {
        const TYPE_NAME: &'static str = "DayOfWeek";

        fn label(&self) -> &'static str {
            match self {
                Self::Monday => "MONDAY",
                Self::Friday => "FRIDAY",
            }
        }

        fn from_label(label: &str) -> Option<Self> {
            match label {
                "MONDAY" => Some(Self::Monday),
                "FRIDAY" => Some(Self::Friday),
                _ => None,
            }
        }
    }

    #[test]
    fn plain_values_use_a_bare_marker() {
        let pg = Postgres::new();
        assert_eq!(Parameter::from(7).placeholder(&pg), "?");
        assert_eq!(Parameter::from("x").placeholder(&pg), "?");
        assert_eq!(Parameter::from(vec![vec![1.0, 2.0]]).placeholder(&pg), "?");
    }

    #[test]
    fn enum_values_are_cast_to_their_translated_type() {
        let param = Parameter::from(DayOfWeek::Friday);
        assert_eq!(param.placeholder(&Postgres::new()), "?::day_of_week");
        assert_eq!(
            param.placeholder(&Postgres::new().with_enum_translator(Verbatim)),
            "?::DayOfWeek"
        );
        match param {
            Parameter::Enum(value) => assert_eq!(value.label(), "FRIDAY"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn options_map_to_nullable_variants() {
        assert!(Parameter::from(None::<i32>).is_null());
        assert!(Parameter::from(None::<Vec<i32>>).is_null());
        assert!(!Parameter::from(Some(3i64)).is_null());
        assert_eq!(Parameter::from(Some("a")), Parameter::Text(Some("a".into())));
        assert!(!Parameter::from(DayOfWeek::Monday).is_null());
    }

    fn bind(param: &Parameter, ty: &Type) -> Result<(IsNull, BytesMut), BoxError> {
        let mut buf = BytesMut::new();
        let is_null = param.to_sql_checked(ty, &mut buf)?;
        Ok((is_null, buf))
    }

    #[test]
    fn integers_bind_to_every_integer_width() {
        let (_, buf) = bind(&Parameter::from(5), &Type::INT8).expect("int8");
        assert_eq!(&buf[..], &5i64.to_be_bytes());
        let (_, buf) = bind(&Parameter::from(5i64), &Type::INT2).expect("int2");
        assert_eq!(&buf[..], &5i16.to_be_bytes());
        let (_, buf) = bind(&Parameter::from(3), &Type::FLOAT8).expect("float8");
        assert_eq!(&buf[..], &3.0f64.to_be_bytes());

        assert!(bind(&Parameter::from(70_000), &Type::INT2).is_err());
        assert!(bind(&Parameter::from(i64::MAX), &Type::INT4).is_err());

        let (is_null, buf) = bind(&Parameter::from(None::<i32>), &Type::INT8).expect("null");
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn doubles_bind_to_real_double_and_numeric() {
        let (_, buf) = bind(&Parameter::from(2.5), &Type::FLOAT4).expect("float4");
        assert_eq!(&buf[..], &2.5f32.to_be_bytes());
        let (_, buf) = bind(&Parameter::from(2.5), &Type::FLOAT8).expect("float8");
        assert_eq!(&buf[..], &2.5f64.to_be_bytes());

        let (_, buf) = bind(&Parameter::from(12.25), &Type::NUMERIC).expect("numeric");
        let back = Decimal::from_sql(&Type::NUMERIC, &buf).expect("decodes");
        assert_eq!(back, Decimal::new(1225, 2));
        let (_, buf) = bind(&Parameter::from(7i64), &Type::NUMERIC).expect("numeric");
        assert_eq!(Decimal::from_sql(&Type::NUMERIC, &buf).expect("decodes"), Decimal::from(7));

        assert!(bind(&Parameter::from(1e300), &Type::FLOAT4).is_err());
        assert!(bind(&Parameter::from(f64::NAN), &Type::NUMERIC).is_err());
    }

    #[test]
    fn other_values_bind_only_to_their_own_types() {
        assert!(bind(&Parameter::from("x"), &Type::INT4).is_err());
        assert!(bind(&Parameter::from(1.5), &Type::INT4).is_err());
        assert!(bind(&Parameter::from(true), &Type::BOOL).is_ok());
        assert!(bind(&Parameter::from("x"), &Type::VARCHAR).is_ok());
        assert!(bind(&Parameter::from(None::<String>), &Type::INT4).is_err());
    }

    #[test]
    fn enum_label_binds_as_text() {
        let value = DayOfWeek::Monday.to_enum_value();
        let mut buf = BytesMut::new();
        value.to_sql(&Type::TEXT, &mut buf).expect("binds");
        assert_eq!(&buf[..], b"MONDAY");
        assert!(<EnumValue as ToSql>::accepts(&Type::VARCHAR));
        assert!(!<EnumValue as ToSql>::accepts(&Type::INT4));
    }
}
