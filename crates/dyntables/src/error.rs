//! Error types for dynamic table management.

use std::fmt;
use thiserror::Error;

/// Dynamic table error type.
#[derive(Debug, Error)]
pub enum TableError {
    /// A column list entry was not a `name type` pair.
    #[error("malformed column definition: '{0}'")]
    MalformedColumn(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// CREATE TABLE failed.
    #[error("failed to create table '{table}': {reason}")]
    Schema {
        /// The table being created.
        table: String,
        /// The database error.
        reason: String,
    },

    /// INSERT failed.
    #[error("failed to insert into table '{table}': {reason}")]
    Insert {
        /// The target table.
        table: String,
        /// The database error.
        reason: String,
    },

    /// A transactional operation failed and was rolled back.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Catalog lookup failed.
    #[error("catalog query failed: {0}")]
    Catalog(String),

    /// The row does not have one value per configured column.
    #[error("row has {actual} values but {expected} columns are configured")]
    ArityMismatch {
        /// Configured column count.
        expected: usize,
        /// Supplied value count.
        actual: usize,
    },

    /// The dynamic column is unset or not part of the column list.
    #[error("dynamic column '{0}' is not among the configured columns")]
    DynamicColumnNotFound(String),

    /// The dynamic column holds a value that cannot name a table.
    #[error("dynamic column '{0}' has a NULL value")]
    InvalidDynamicValue(String),

    /// A table name that is not a plain identifier.
    #[error("invalid table name: '{0}'")]
    InvalidTableName(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for dynamic table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad column list or connection settings.
    Configuration,
    /// Driver or server unreachable.
    Connectivity,
    /// Table creation failed.
    Schema,
    /// Row insertion failed.
    Insert,
    /// Bulk delete failed and rolled back.
    Transaction,
    /// Catalog introspection failed.
    Catalog,
    /// A row was rejected before reaching the database.
    Precondition,
}

impl TableError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::MalformedColumn(_)
            | TableError::InvalidConfig(_)
            | TableError::Io(_)
            | TableError::Json(_) => ErrorKind::Configuration,
            TableError::ConnectionFailed(_) | TableError::ConnectionClosed => {
                ErrorKind::Connectivity
            }
            TableError::Schema { .. } => ErrorKind::Schema,
            TableError::Insert { .. } => ErrorKind::Insert,
            TableError::Transaction(_) => ErrorKind::Transaction,
            TableError::Catalog(_) => ErrorKind::Catalog,
            TableError::ArityMismatch { .. }
            | TableError::DynamicColumnNotFound(_)
            | TableError::InvalidDynamicValue(_)
            | TableError::InvalidTableName(_) => ErrorKind::Precondition,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Connectivity => write!(f, "connectivity"),
            ErrorKind::Schema => write!(f, "schema"),
            ErrorKind::Insert => write!(f, "insert"),
            ErrorKind::Transaction => write!(f, "transaction"),
            ErrorKind::Catalog => write!(f, "catalog"),
            ErrorKind::Precondition => write!(f, "precondition"),
        }
    }
}
