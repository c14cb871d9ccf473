//! Entry points for building statements.

use crate::dialect::{Dialect, Postgres};
use std::sync::Arc;

/// Generates the builder entry points for a type with a `dialect_arc` method.
macro_rules! impl_entry_points {
    ($ty:ty) => {
        impl $ty {
            /// `SELECT fields`
            pub fn select(&self, fields: &str) -> $crate::select::SelectHeader {
                $crate::select::SelectHeader::new(fields, self.dialect_arc())
            }

            /// The intersection of one or more selects.
            pub fn intersection(
                &self,
                branches: &[&$crate::select::SelectStatement],
            ) -> $crate::error::DaoResult<$crate::select::Intersection> {
                $crate::select::Intersection::new(branches, self.dialect_arc())
            }

            pub fn insert_into(&self, table: &str) -> $crate::insert::InsertHeader {
                $crate::insert::InsertHeader::new(table, self.dialect_arc())
            }

            /// Insert that turns into an update when the key columns conflict.
            pub fn insert_or_update_into(&self, table: &str) -> $crate::insert::UpsertHeader {
                $crate::insert::UpsertHeader::new(table, self.dialect_arc())
            }

            pub fn update(&self, table: &str) -> $crate::update::UpdateStatement {
                $crate::update::UpdateStatement::new(table, self.dialect_arc())
            }

            pub fn delete_from(&self, table: &str) -> $crate::update::UpdateOrDeleteStatement {
                $crate::update::UpdateOrDeleteStatement::delete_from(table, self.dialect_arc())
            }

            /// Arbitrary SQL with `?` markers.
            pub fn sql(&self, text: &str) -> $crate::general::GeneralStatement {
                $crate::general::GeneralStatement::new(text, self.dialect_arc())
            }

            pub fn call(&self, call: &str) -> $crate::general::ProcedureCall {
                $crate::general::ProcedureCall::new(call, self.dialect_arc())
            }

            pub fn composite_where(&self) -> $crate::clause::CompositeWhereClause {
                $crate::clause::CompositeWhereClause::new()
            }
        }
    };
}

pub(crate) use impl_entry_points;

/// A statement factory bound to a dialect.
///
/// Cheap to clone. Use it directly when the connection is managed elsewhere,
/// e.g. a pooled client or a `tokio_postgres::Transaction`.
#[derive(Debug, Clone)]
pub struct Dao {
    dialect: Arc<dyn Dialect>,
}

impl Dao {
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self {
            dialect: Arc::new(dialect),
        }
    }

    pub fn with_dialect(dialect: Arc<dyn Dialect>) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn dialect_arc(&self) -> Arc<dyn Dialect> {
        Arc::clone(&self.dialect)
    }
}

impl Default for Dao {
    fn default() -> Self {
        Self::new(Postgres::new())
    }
}

impl_entry_points!(Dao);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Verbatim;
    use crate::param::{Parameter, SqlEnum};
    use crate::statement::ToStatement;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum TrafficLight {
        Red,
        Green,
    }

    impl SqlEnum for TrafficLight {
        const TYPE_NAME: &'static str = "TrafficLight";

        fn label(&self) -> &'static str {
            match self {
                Self::Red => "RED",
                Self::Green => "GREEN",
            }
        }

        fn from_label(label: &str) -> Option<Self> {
            match label {
                "RED" => Some(Self::Red),
                "GREEN" => Some(Self::Green),
                _ => None,
            }
        }
    }

    #[test]
    fn enum_casts_follow_the_configured_translator() {
        let snake = Dao::default().select("*").from("lights").filter("color", TrafficLight::Red);
        assert_eq!(
            snake.to_statement().text(),
            "SELECT * FROM lights WHERE color = ?::traffic_light"
        );

        let verbatim = Dao::new(Postgres::new().with_enum_translator(Verbatim))
            .update("lights")
            .set("color", TrafficLight::Green);
        assert_eq!(
            verbatim.statement().text(),
            "UPDATE lights SET color=?::TrafficLight"
        );
        assert_eq!(
            verbatim.statement().params(),
            &[Parameter::Enum(TrafficLight::Green.to_enum_value())]
        );
    }

    #[test]
    fn every_entry_point_starts_a_statement() {
        let dao = Dao::default();
        assert_eq!(dao.select("1").no_from().to_statement().text(), "SELECT 1");
        assert_eq!(dao.delete_from("t").statement().text(), "DELETE FROM t");
        assert_eq!(dao.sql("VACUUM").to_statement().text(), "VACUUM");
        assert_eq!(dao.call("f()").statement().text(), "SELECT * FROM f() AS result");
        assert!(dao.composite_where().is_empty());
        assert!(dao.intersection(&[]).expect_err("no branches").is_usage());
    }
}
