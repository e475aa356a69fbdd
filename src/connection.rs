//! Connection Module
//!
//! Provides connection parameters, their validation, and the bundled SQLite
//! executor that a registered connection name resolves to.
//!
//! The rendered dialect (backtick identifiers, positional `?` placeholders,
//! `LIMIT offset, length`) is accepted by SQLite verbatim, so statements go to the
//! driver exactly as the query builder renders them.

use crate::executor::{Executor, OrmError, Row};
use crate::value::sqlite::{row_from_driver, SqlParam};
use rusqlite::{params_from_iter, Connection};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Parameters needed to open a named connection
///
/// Supported `url` formats:
/// - a filesystem path: `data/app.db`
/// - `sqlite://data/app.db`
/// - an in-memory database: `:memory:` or `sqlite::memory:`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionParameters {
    pub url: String,
}

impl ConnectionParameters {
    /// Create parameters from a connection url
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Parameters for a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    fn target(&self) -> Target<'_> {
        let url = self.url.trim();
        match url {
            ":memory:" | "sqlite::memory:" | "sqlite://:memory:" => Target::Memory,
            _ => Target::File(url.strip_prefix("sqlite://").unwrap_or(url)),
        }
    }
}

enum Target<'a> {
    Memory,
    File(&'a str),
}

/// Validates connection parameters
///
/// # Errors
///
/// Returns `OrmError::InvalidConnectionParameters` if the url is empty or names
/// a non-SQLite scheme.
pub fn validate_connection_parameters(params: &ConnectionParameters) -> Result<(), OrmError> {
    let url = params.url.trim();
    if url.is_empty() {
        return Err(OrmError::InvalidConnectionParameters(
            "Connection url cannot be empty".to_string(),
        ));
    }

    if let Some((scheme, _)) = url.split_once("://") {
        if scheme != "sqlite" {
            return Err(OrmError::InvalidConnectionParameters(format!(
                "Unsupported scheme '{scheme}', expected sqlite:// or a file path"
            )));
        }
    }

    if let Target::File("") = params.target() {
        return Err(OrmError::InvalidConnectionParameters(
            "sqlite:// url must name a database file".to_string(),
        ));
    }

    Ok(())
}

/// Opens a connection described by `params`
///
/// # Errors
///
/// Returns `OrmError::InvalidConnectionParameters` for malformed parameters and
/// `OrmError::StatementExecutionFailure` if the driver cannot open the database.
pub fn connect(params: &ConnectionParameters) -> Result<SqliteExecutor, OrmError> {
    validate_connection_parameters(params)?;

    let conn = match params.target() {
        Target::Memory => Connection::open_in_memory()?,
        Target::File(path) => Connection::open(path)?,
    };

    log::info!("Opened connection to {}", params.url);
    Ok(SqliteExecutor::new(conn))
}

/// `Executor` implementation over a single `rusqlite::Connection`
///
/// The driver connection is guarded by a mutex: statements issued through the
/// same handle from different threads run one at a time.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Wrap an already-open driver connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    ///
    /// Returns `OrmError::StatementExecutionFailure` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, OrmError> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Whether the connection is outside an explicit transaction
    pub fn is_autocommit(&self) -> bool {
        self.lock().map(|conn| conn.is_autocommit()).unwrap_or(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, OrmError> {
        self.conn.lock().map_err(|_| {
            OrmError::StatementExecutionFailure("connection lock poisoned".to_string())
        })
    }
}

impl Executor for SqliteExecutor {
    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter().map(SqlParam)))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(row_from_driver(&columns, row)?);
        }
        Ok(results)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let conn = self.lock()?;
        let affected = conn.execute(sql, params_from_iter(params.iter().map(SqlParam)))?;
        Ok(affected as u64)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<(u64, Value), OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let conn = self.lock()?;
        let affected = conn.execute(sql, params_from_iter(params.iter().map(SqlParam)))?;
        Ok((affected as u64, Value::from(conn.last_insert_rowid())))
    }

    fn execute_batch(&self, sql: &str) -> Result<(), OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}
