//! # Lifebuoy
//!
//! Lightweight data-mapping library: a fluent query builder that renders
//! parameterized SQL, dynamic records with dirty tracking, declared relations with
//! batched eager loading, and an in-memory collection toolkit over query results.
//!
//! Statements run on named connections held by a process-wide
//! [`ConnectionRegistry`]; the bundled backend is SQLite through `rusqlite`.
//!
//! ```no_run
//! use lifebuoy::{connect, execute, table, OrmError};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), OrmError> {
//! connect("default", "app.db")?;
//! execute("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", [])?;
//!
//! table("users").insert(json!({"name": "Alice", "age": 31}))?;
//! let page = table("users").where_op("age", ">", 18).order_by("name").paginate(10, 1)?;
//! println!("{} of {} users", page.len(), page.total());
//! # Ok(())
//! # }
//! ```

pub mod active_model;
pub mod collection;
pub mod config;
pub mod connection;
pub mod executor;
pub mod metrics;
pub mod model;
pub mod pool;
pub mod query;
pub mod raw_sql;
pub mod relation;
pub mod transaction;
pub mod value;

pub use active_model::{Entity, ModelSchema, ModelSchemaBuilder, SaveOutcome, Snapshot};
pub use collection::{Collection, Page};
pub use config::DatabaseConfig;
pub use connection::{ConnectionParameters, SqliteExecutor};
pub use executor::{Executor, OrmError, Row};
pub use metrics::{QueryLog, QueryLogEntry};
pub use model::{IntoAttributes, Record, Related};
pub use pool::ConnectionRegistry;
pub use query::{Constraint, Criterion, EagerStrategy, Operator, QueryBuilder, Statement};
pub use raw_sql::RawOutcome;
pub use relation::{RelationDef, RelationKind};
pub use transaction::{run_transaction, Transaction};

use serde_json::Value;

/// Start a query against `table` on the default connection
pub fn table(table: impl Into<String>) -> QueryBuilder {
    QueryBuilder::new().table(table)
}

/// Start a query on the named connection; set the table with [`QueryBuilder::table`]
pub fn connection(name: impl Into<String>) -> QueryBuilder {
    QueryBuilder::new().use_connection(name)
}

/// Execute raw SQL on the default connection
///
/// # Errors
///
/// See [`QueryBuilder::execute_raw`].
pub fn execute<I>(sql: &str, values: I) -> Result<RawOutcome, OrmError>
where
    I: IntoIterator<Item = Value>,
{
    QueryBuilder::new().execute_raw(sql, values)
}

/// Run `work` in a transaction on the default connection
///
/// # Errors
///
/// See [`run_transaction`].
pub fn transaction<T, E, F>(work: F) -> Result<T, E>
where
    E: From<OrmError> + std::fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    run_transaction("", work)
}

/// Every statement recorded so far, oldest first
pub fn query_log() -> Vec<QueryLogEntry> {
    QueryLog::entries()
}

/// Register a connection under `name` from a url
///
/// The database is opened lazily by the first statement that uses it.
///
/// # Errors
///
/// Returns `OrmError::InvalidConnectionParameters` for an empty or non-SQLite url.
pub fn connect(name: &str, url: &str) -> Result<(), OrmError> {
    ConnectionRegistry::register(name, ConnectionParameters::new(url))
}
