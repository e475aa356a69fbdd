//! Executor Module
//!
//! Provides the `Executor` trait that abstracts statement execution over a live
//! database handle, and the `OrmError` type every fallible operation in the crate
//! returns.
//!
//! The query builder, relation loader and transaction helpers only ever talk to the
//! backend through this trait, so a handle registered in the
//! [`ConnectionRegistry`](crate::pool::ConnectionRegistry) can be the bundled SQLite
//! executor or any other implementation (another driver, a recording test double).

use serde_json::{Map, Value};
use std::fmt;

/// A single result row: column name to value, in column order.
pub type Row = Map<String, Value>;

/// Error type for all data-mapping operations
#[derive(Debug, Clone, PartialEq)]
pub enum OrmError {
    /// A query named a connection that was never registered
    ConnectionNotFound(String),
    /// A predicate used an operator outside the supported allow-list
    UnsupportedOperator(String),
    /// `insert`/`update` was called with no fields
    EmptyWritePayload(&'static str),
    /// A declared relation points at something that is not a persistable model
    RelationTargetTypeInvalid(String),
    /// The underlying driver rejected the statement (original message preserved)
    StatementExecutionFailure(String),
    /// Connection parameters could not be used to open a connection
    InvalidConnectionParameters(String),
    /// A persistence operation was called on a record without a model schema
    NotPersistable,
    /// A record could not be decoded into the requested type
    Decode(String),
}

impl fmt::Display for OrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrmError::ConnectionNotFound(name) => {
                write!(f, "Connection {name} does not exist")
            }
            OrmError::UnsupportedOperator(op) => {
                write!(f, "Operator: {op} not supported")
            }
            OrmError::EmptyWritePayload(operation) => {
                write!(f, "Cannot {operation} with empty data")
            }
            OrmError::RelationTargetTypeInvalid(relation) => {
                write!(
                    f,
                    "Relation {relation} must target a persistable model (table and primary key required)"
                )
            }
            OrmError::StatementExecutionFailure(message) => {
                write!(f, "Statement execution failed: {message}")
            }
            OrmError::InvalidConnectionParameters(message) => {
                write!(f, "Invalid connection parameters: {message}")
            }
            OrmError::NotPersistable => {
                write!(f, "Record is not bound to a model schema")
            }
            OrmError::Decode(message) => {
                write!(f, "Decode error: {message}")
            }
        }
    }
}

impl std::error::Error for OrmError {}

impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        OrmError::StatementExecutionFailure(err.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Decode(err.to_string())
    }
}

/// Trait for executing statements against a live database handle
///
/// Implementations must serialize statement execution internally: the same handle
/// is shared by every query that names its connection.
///
/// # Examples
///
/// ```no_run
/// use lifebuoy::{Executor, OrmError, SqliteExecutor};
/// use serde_json::json;
///
/// # fn main() -> Result<(), OrmError> {
/// let executor = SqliteExecutor::open_in_memory()?;
/// executor.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
///
/// let (affected, id) = executor.insert("INSERT INTO users (`name`) VALUES (?)", &[json!("Alice")])?;
/// assert_eq!(affected, 1);
///
/// let rows = executor.query_all("SELECT * FROM users WHERE `id` = ?", &[id])?;
/// assert_eq!(rows[0]["name"], json!("Alice"));
/// # Ok(())
/// # }
/// ```
pub trait Executor: Send + Sync {
    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `OrmError::StatementExecutionFailure` if the driver rejects the statement.
    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, OrmError>;

    /// Execute a write statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `OrmError::StatementExecutionFailure` if the driver rejects the statement.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, OrmError>;

    /// Execute an INSERT and return the affected rows together with the generated key
    ///
    /// The key is read under the same lock as the statement so concurrent writers on
    /// the handle cannot interleave between the two.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::StatementExecutionFailure` if the driver rejects the statement.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<(u64, Value), OrmError>;

    /// Execute one or more unparameterized statements (DDL, transaction control)
    ///
    /// # Errors
    ///
    /// Returns `OrmError::StatementExecutionFailure` if the driver rejects the batch.
    fn execute_batch(&self, sql: &str) -> Result<(), OrmError>;
}
