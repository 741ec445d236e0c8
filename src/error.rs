//! Error types for the PostgreSQL dialect.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Driver failures are carried through with their SQLSTATE so callers can tell a
//! mapping problem ("unsupported type") apart from a database problem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialectError {
    #[error("Invalid sql type {type_name} ({kind}) for postgres")]
    UnsupportedType { type_name: String, kind: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Invalid hstore data: {message}")]
    Hstore { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DialectError {
    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            kind: kind.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a malformed hstore error.
    pub fn hstore(message: impl Into<String>) -> Self {
        Self::Hstore {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DialectError.
impl From<sqlx::Error> for DialectError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DialectError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DialectError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DialectError::database("No rows returned", None),
            sqlx::Error::PoolTimedOut => DialectError::connection(
                "Timed out acquiring a connection from the pool",
                "Increase acquire_timeout or max_connections",
            ),
            sqlx::Error::PoolClosed => {
                DialectError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DialectError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DialectError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DialectError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DialectError::database(
                format!("Type not found: {} (is the extension installed?)", type_name),
                None,
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DialectError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DialectError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                DialectError::internal(format!("Decode error: {}", source))
            }
            _ => DialectError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for dialect operations.
pub type DialectResult<T> = Result<T, DialectError>;
