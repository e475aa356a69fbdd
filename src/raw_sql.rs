//! Raw SQL Helpers
//!
//! Executes caller-written SQL through the same connection, logging and record
//! mapping as built queries. The statement's leading keyword decides how it runs:
//! a `SELECT` returns rows, anything else runs as a write.

use crate::collection::Collection;
use crate::executor::OrmError;
use crate::query::render::Statement;
use crate::query::QueryBuilder;
use serde_json::Value;

/// Result of [`QueryBuilder::execute_raw`]
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// Rows of a `SELECT`
    Rows(Collection),
    /// Generated key of a successful `INSERT`
    Inserted(Value),
    /// Rows affected by an `UPDATE` or `DELETE`
    Affected(u64),
    /// Any other statement (DDL, pragmas); `false` for an `INSERT` that wrote nothing
    Success(bool),
}

impl RawOutcome {
    /// The rows of a `SELECT`, or an empty collection
    pub fn into_rows(self) -> Collection {
        match self {
            RawOutcome::Rows(rows) => rows,
            _ => Collection::default(),
        }
    }

    /// Rows affected, counting an insert as one
    pub fn affected(&self) -> u64 {
        match self {
            RawOutcome::Rows(_) => 0,
            RawOutcome::Inserted(_) => 1,
            RawOutcome::Affected(count) => *count,
            RawOutcome::Success(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leading {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

fn leading_keyword(sql: &str) -> Leading {
    let head: String = sql
        .trim_start()
        .chars()
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    match head.as_str() {
        "SELECT" => Leading::Select,
        "INSERT" => Leading::Insert,
        "UPDATE" => Leading::Update,
        "DELETE" => Leading::Delete,
        _ => Leading::Other,
    }
}

impl QueryBuilder {
    /// Execute a raw statement with positional `?` values
    ///
    /// A `SELECT` reads through the builder's read connection and maps rows like
    /// [`get`](QueryBuilder::get) (schema binding and eager loads included); any
    /// other statement runs on the write connection.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::ConnectionNotFound` or the driver error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lifebuoy::{execute, OrmError, RawOutcome};
    /// use serde_json::json;
    ///
    /// # fn main() -> Result<(), OrmError> {
    /// execute("CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT)", [])?;
    /// let outcome = execute("INSERT INTO tags (label) VALUES (?)", [json!("rust")])?;
    /// assert_eq!(outcome, RawOutcome::Inserted(json!(1)));
    ///
    /// let rows = execute("SELECT * FROM tags", [])?.into_rows();
    /// assert_eq!(rows.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn execute_raw<I>(&self, sql: &str, values: I) -> Result<RawOutcome, OrmError>
    where
        I: IntoIterator<Item = Value>,
    {
        let statement = Statement {
            sql: sql.to_string(),
            values: values.into_iter().collect(),
        };

        match leading_keyword(sql) {
            Leading::Select => {
                let rows = self.run_read(&statement)?;
                Ok(RawOutcome::Rows(self.materialize(rows)?))
            }
            Leading::Insert => {
                let (affected, key) = self.run_write(&statement, true)?;
                Ok(if affected == 0 {
                    RawOutcome::Success(false)
                } else {
                    RawOutcome::Inserted(key)
                })
            }
            Leading::Update | Leading::Delete => {
                Ok(RawOutcome::Affected(self.run_write(&statement, false)?.0))
            }
            Leading::Other => {
                self.run_write(&statement, false)?;
                Ok(RawOutcome::Success(true))
            }
        }
    }
}
