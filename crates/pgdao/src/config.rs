//! Configuration for a data access context.

use crate::dialect::{Dialect, EnumTypeTranslator, Postgres};
use std::sync::Arc;

/// Settings of a [`DataAccessContext`](crate::DataAccessContext).
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// SQL conventions used by every statement the context builds.
    pub dialect: Arc<dyn Dialect>,
    /// Whether `close` commits an open transaction (otherwise it rolls back).
    pub commit_on_close: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            dialect: Arc::new(Postgres::new()),
            commit_on_close: true,
        }
    }
}

impl ContextConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another dialect.
    pub fn dialect(mut self, dialect: impl Dialect + 'static) -> Self {
        self.dialect = Arc::new(dialect);
        self
    }

    /// PostgreSQL with a custom mapping from Rust enum names to database type names.
    pub fn enum_translator(mut self, translator: impl EnumTypeTranslator + 'static) -> Self {
        self.dialect = Arc::new(Postgres::new().with_enum_translator(translator));
        self
    }

    pub fn commit_on_close(mut self, commit: bool) -> Self {
        self.commit_on_close = commit;
        self
    }
}
