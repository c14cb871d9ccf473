//! Clause values that statements are extended with.

use crate::dialect::{Dialect, has_marker};
use crate::error::{DaoError, DaoResult};
use crate::param::Parameter;
use std::borrow::Cow;

/// A where or having condition, optionally carrying one parameter.
///
/// With a parameter and no marker in the text, the clause is an equality test:
/// `WhereClause::new("name", "Bond")` renders as `name = ?`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    text: String,
    parameter: Option<Parameter>,
}

impl WhereClause {
    pub fn new(text: impl Into<String>, parameter: impl Into<Parameter>) -> Self {
        Self {
            text: text.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// A condition without parameter. Its text must not contain a marker.
    pub fn raw(text: impl Into<String>) -> DaoResult<Self> {
        let text = text.into();
        if has_marker(&text) {
            return Err(DaoError::usage(format!(
                "where clause without parameter must not contain a question mark: {text}"
            )));
        }
        Ok(Self {
            text,
            parameter: None,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameter(&self) -> Option<&Parameter> {
        self.parameter.as_ref()
    }

    /// SQL fragment for this clause.
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        match &self.parameter {
            Some(parameter) if !has_marker(&self.text) => {
                format!("{} = {}", self.text, parameter.placeholder(dialect))
            }
            _ => self.text.clone(),
        }
    }
}

impl From<NamedParameter> for WhereClause {
    fn from(named: NamedParameter) -> Self {
        Self {
            text: named.name,
            parameter: Some(named.parameter),
        }
    }
}

/// A column in an ORDER BY list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByClause {
    field: String,
    ascending: bool,
}

impl OrderByClause {
    pub fn new(field: impl Into<String>, ascending: bool) -> Self {
        Self {
            field: field.into(),
            ascending,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, true)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, false)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub(crate) fn render(&self) -> String {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        format!("{} {direction}", self.field)
    }
}

/// A column name bound to a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedParameter {
    name: String,
    parameter: Parameter,
}

impl NamedParameter {
    /// The name must not contain a marker.
    pub fn new(name: impl Into<String>, parameter: impl Into<Parameter>) -> DaoResult<Self> {
        let name = name.into();
        if has_marker(&name) {
            return Err(DaoError::usage(format!(
                "named parameter must not contain a question mark in its name: {name}"
            )));
        }
        Ok(Self {
            name,
            parameter: parameter.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }
}

/// An ordered list of named parameters.
///
/// Applied as a filter it becomes `a = ? AND b = ?`, as an update it becomes
/// `a=?, b=?`, and as insert values it supplies the column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParameterList {
    parameters: Vec<NamedParameter>,
}

impl NamedParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this list with one more entry.
    pub fn with(&self, name: impl Into<String>, parameter: impl Into<Parameter>) -> DaoResult<Self> {
        Ok(self.with_parameter(NamedParameter::new(name, parameter)?))
    }

    pub fn with_parameter(&self, named: NamedParameter) -> Self {
        let mut parameters = self.parameters.clone();
        parameters.push(named);
        Self { parameters }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamedParameter> {
        self.parameters.iter()
    }
}

impl<'a> IntoIterator for &'a NamedParameterList {
    type Item = &'a NamedParameter;
    type IntoIter = std::slice::Iter<'a, NamedParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

/// A batch of where clauses applied together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeWhereClause {
    clauses: Vec<WhereClause>,
}

impl CompositeWhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self, clause: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.filter_clause(WhereClause::new(clause, value))
    }

    pub fn filter_raw(&self, clause: impl Into<String>) -> DaoResult<Self> {
        Ok(self.filter_clause(WhereClause::raw(clause)?))
    }

    pub fn filter_clause(&self, clause: WhereClause) -> Self {
        let mut clauses = self.clauses.clone();
        clauses.push(clause);
        Self { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Something that contributes where (or having) clauses to a statement as a unit.
pub trait StatementModifier {
    fn where_clauses(&self) -> Cow<'_, [WhereClause]>;
}

impl StatementModifier for WhereClause {
    fn where_clauses(&self) -> Cow<'_, [WhereClause]> {
        Cow::Borrowed(std::slice::from_ref(self))
    }
}

impl StatementModifier for CompositeWhereClause {
    fn where_clauses(&self) -> Cow<'_, [WhereClause]> {
        Cow::Borrowed(&self.clauses)
    }
}

impl StatementModifier for NamedParameterList {
    fn where_clauses(&self) -> Cow<'_, [WhereClause]> {
        Cow::Owned(
            self.parameters
                .iter()
                .cloned()
                .map(WhereClause::from)
                .collect(),
        )
    }
}

impl<M: StatementModifier + ?Sized> StatementModifier for &M {
    fn where_clauses(&self) -> Cow<'_, [WhereClause]> {
        (**self).where_clauses()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;

    #[test]
    fn clause_without_marker_becomes_equality() {
        let pg = Postgres::new();
        assert_eq!(WhereClause::new("name", "Bond").render(&pg), "name = ?");
        assert_eq!(WhereClause::new("age > ?", 30).render(&pg), "age > ?");
        assert_eq!(WhereClause::raw("deleted IS NULL").expect("raw").render(&pg), "deleted IS NULL");
    }

    #[test]
    fn raw_clause_with_marker_is_rejected() {
        let err = WhereClause::raw("id = ?").expect_err("must fail");
        assert!(err.is_usage());
        // a quoted question mark is not a marker
        assert!(WhereClause::raw("title <> '?'").is_ok());
    }

    #[test]
    fn named_parameter_rejects_marker_in_name() {
        assert!(NamedParameter::new("id = ?", 1).is_err());
        assert!(NamedParameter::new("id", 1).is_ok());
    }

    #[test]
    fn named_parameter_list_is_copy_on_write() {
        let base = NamedParameterList::new().with("a", 1).expect("a");
        let extended = base.with("b", 2).expect("b");
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        let names: Vec<_> = extended.iter().map(NamedParameter::name).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn modifiers_expose_their_clauses_in_order() {
        let pg = Postgres::new();
        let composite = CompositeWhereClause::new()
            .filter("x", 1)
            .filter_raw("y IS NOT NULL")
            .expect("raw");
        let rendered: Vec<_> = composite
            .where_clauses()
            .iter()
            .map(|c| c.render(&pg))
            .collect();
        assert_eq!(rendered, ["x = ?", "y IS NOT NULL"]);

        let list = NamedParameterList::new()
            .with("a", "one")
            .and_then(|l| l.with("b", 2))
            .expect("list");
        let rendered: Vec<_> = list.where_clauses().iter().map(|c| c.render(&pg)).collect();
        assert_eq!(rendered, ["a = ?", "b = ?"]);
    }

    #[test]
    fn order_by_renders_direction() {
        assert_eq!(OrderByClause::asc("name").render(), "name ASC");
        assert_eq!(OrderByClause::desc("id").render(), "id DESC");
    }
}
