//! Error types for pgdao

use thiserror::Error;

/// Result type alias for pgdao operations
pub type DaoResult<T> = Result<T, DaoError>;

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum DaoError {
    /// A query expecting exactly one row returned none
    #[error("Not found: {0}")]
    NotFound(String),

    /// A query expecting at most one row returned more
    #[error("Answer not unique: {0}")]
    AnswerNotUnique(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Not-null constraint violation
    #[error("Not null violation: {0}")]
    NotNullViolation(String),

    /// Any other driver failure
    #[error("Data access error -- {0}")]
    DataAccess(#[from] tokio_postgres::Error),

    /// The caller built a statement that can never be valid
    #[error("Usage error: {0}")]
    Usage(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Connection context could not begin, commit, roll back or close
    #[error("Could not {action} -- {source}")]
    Context {
        action: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    /// A transaction body failed and the rollback that followed failed too
    #[error("{error} (rollback failed: {rollback})")]
    RollbackFailed {
        error: Box<DaoError>,
        #[source]
        rollback: Box<DaoError>,
    },

    /// Checking a client out of a pool failed
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl DaoError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an answer-not-unique error
    pub fn not_unique(message: impl Into<String>) -> Self {
        Self::AnswerNotUnique(message.into())
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub(crate) fn context(action: &'static str, source: tokio_postgres::Error) -> Self {
        Self::Context { action, source }
    }

    /// Combine the error that aborted a transaction with the failure of its rollback.
    pub fn rollback_failed(error: DaoError, rollback: DaoError) -> Self {
        Self::RollbackFailed {
            error: Box::new(error),
            rollback: Box::new(rollback),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an answer-not-unique error
    pub fn is_not_unique(&self) -> bool {
        matches!(self, Self::AnswerNotUnique(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, Self::ForeignKeyViolation(_))
    }

    /// Check if this is a not-null violation error
    pub fn is_not_null_violation(&self) -> bool {
        matches!(self, Self::NotNullViolation(_))
    }

    /// Check if this is a usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Parse a tokio_postgres error into a more specific DaoError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = db_err.message();
            let subject = db_err
                .constraint()
                .or_else(|| db_err.column())
                .unwrap_or("unknown");

            match classify_sqlstate(db_err.code().code()) {
                Some(Violation::Unique) => {
                    return Self::UniqueViolation(format!("{subject}: {message}"));
                }
                Some(Violation::ForeignKey) => {
                    return Self::ForeignKeyViolation(format!("{subject}: {message}"));
                }
                Some(Violation::NotNull) => {
                    return Self::NotNullViolation(format!("{subject}: {message}"));
                }
                None => {}
            }
        }
        Self::DataAccess(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Violation {
    Unique,
    ForeignKey,
    NotNull,
}

fn classify_sqlstate(code: &str) -> Option<Violation> {
    match code {
        "23505" => Some(Violation::Unique),
        "23503" => Some(Violation::ForeignKey),
        "23502" => Some(Violation::NotNull),
        _ => None,
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DaoError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
