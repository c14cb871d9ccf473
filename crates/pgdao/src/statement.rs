//! The immutable statement value all builders share.

use crate::clause::WhereClause;
use crate::dialect::Dialect;
use crate::error::{DaoError, DaoResult};
use crate::param::Parameter;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_postgres::types::ToSql;

static UNIQUE_ID: AtomicU64 = AtomicU64::new(0);

/// A fresh identifier for generated aliases and table names, unique within the process.
pub fn unique_id() -> String {
    let n = UNIQUE_ID.fetch_add(1, Ordering::Relaxed);
    format!("__pgdao__{n}")
}

/// SQL text with `?` markers and the parameters bound to them, in marker order.
///
/// Statements are never modified: every extension returns a new value, so a
/// partially built statement can serve as the base of several continuations.
#[derive(Clone)]
pub struct Statement {
    text: String,
    params: Vec<Parameter>,
    dialect: Arc<dyn Dialect>,
}

impl Statement {
    pub fn new(text: impl Into<String>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
            dialect,
        }
    }

    /// Statement text with unresolved markers.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// A copy with `fragment` appended.
    pub(crate) fn append(&self, fragment: &str) -> Self {
        let mut text = String::with_capacity(self.text.len() + fragment.len());
        text.push_str(&self.text);
        text.push_str(fragment);
        Self {
            text,
            params: self.params.clone(),
            dialect: Arc::clone(&self.dialect),
        }
    }

    /// A copy with `parameter` added after the existing ones. The caller supplies
    /// the matching marker, either inline in earlier text or through `append`.
    pub(crate) fn bind(&self, parameter: Parameter) -> Self {
        let mut params = self.params.clone();
        params.push(parameter);
        Self {
            text: self.text.clone(),
            params,
            dialect: Arc::clone(&self.dialect),
        }
    }

    /// A copy with one parameter bound and its fragment appended.
    pub(crate) fn append_with(&self, fragment: &str, parameter: Option<Parameter>) -> Self {
        let mut next = self.append(fragment);
        if let Some(parameter) = parameter {
            next.params.push(parameter);
        }
        next
    }

    /// A copy extended with a where or having condition. `keyword` opens the first
    /// condition (` WHERE `, ` HAVING `); later ones are joined with ` AND `.
    pub(crate) fn condition(&self, first: bool, keyword: &str, clause: &WhereClause) -> Self {
        let conjunction = if first { keyword } else { " AND " };
        let fragment = format!("{conjunction}{}", clause.render(self.dialect()));
        self.append_with(&fragment, clause.parameter().cloned())
    }

    /// Same parameters and dialect, different text.
    pub(crate) fn with_text(&self, text: String) -> Self {
        Self {
            text,
            params: self.params.clone(),
            dialect: Arc::clone(&self.dialect),
        }
    }

    /// Same dialect, concatenated parameter lists.
    pub(crate) fn join(text: String, parts: &[&Statement], dialect: Arc<dyn Dialect>) -> Self {
        Self {
            text,
            params: parts.iter().flat_map(|s| s.params.iter().cloned()).collect(),
            dialect,
        }
    }

    /// Check that every marker has exactly one parameter.
    pub fn validate(&self) -> DaoResult<()> {
        let markers = self.dialect.count_placeholders(&self.text);
        if markers != self.params.len() {
            return Err(DaoError::usage(format!(
                "incorrect number of parameters: statement has {markers} placeholder(s) but {} parameter(s) were bound: {}",
                self.params.len(),
                self.text
            )));
        }
        Ok(())
    }

    /// Text as sent to the driver.
    pub fn to_sql(&self) -> String {
        self.dialect.render(&self.text)
    }

    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(Parameter::as_sql).collect()
    }
}

/// A builder that can produce the statement it would execute.
pub trait ToStatement {
    fn to_statement(&self) -> Cow<'_, Statement>;
}

impl ToStatement for Statement {
    fn to_statement(&self) -> Cow<'_, Statement> {
        Cow::Borrowed(self)
    }
}

impl<T: ToStatement + ?Sized> ToStatement for &T {
    fn to_statement(&self) -> Cow<'_, Statement> {
        (**self).to_statement()
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("text", &self.text)
            .field("params", &self.params)
            .finish()
    }
}
