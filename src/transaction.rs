//! Transaction Module
//!
//! Provides explicit transactions over a named connection.
//!
//! This module provides:
//! - `Transaction`, a guard that issues `BEGIN` and must be committed or rolled back
//! - `run_transaction`, which commits when the work succeeds and rolls back otherwise
//! - `QueryBuilder::transaction`, which runs work on the builder's write connection
//!
//! Statements issued by the work go through the connection registry as usual, so
//! they run on the same handle as the transaction. Nested transactions are not
//! supported, and neither are other threads issuing statements on the same named
//! connection while a transaction is open. Keeping them apart is up to the caller.

use crate::executor::{Executor, OrmError};
use crate::pool::ConnectionRegistry;
use crate::query::{resolve_name, QueryBuilder};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// An open transaction on one named connection
///
/// Dropping a transaction that was neither committed nor rolled back rolls it
/// back, so an early return or a panic inside the work never leaves the
/// connection mid-transaction.
///
/// # Examples
///
/// ```no_run
/// use lifebuoy::{table, OrmError, Transaction};
/// use serde_json::json;
///
/// # fn main() -> Result<(), OrmError> {
/// let transaction = Transaction::begin("default")?;
/// table("accounts").where_eq("id", 1).update(json!({"balance": 90}))?;
/// table("accounts").where_eq("id", 2).update(json!({"balance": 110}))?;
/// transaction.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction {
    executor: Arc<dyn Executor>,
    connection: String,
    closed: bool,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("connection", &self.connection)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Transaction {
    /// Start a transaction on `connection` (empty for the default connection)
    ///
    /// # Errors
    ///
    /// Returns `OrmError::ConnectionNotFound` for an unregistered name and
    /// `OrmError::StatementExecutionFailure` if `BEGIN` is rejected.
    pub fn begin(connection: &str) -> Result<Self, OrmError> {
        let connection = resolve_name(connection);
        let executor = ConnectionRegistry::acquire(&connection)?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span(&connection).entered();

        log::debug!("[{}] BEGIN", connection);
        executor.execute_batch("BEGIN")?;

        Ok(Self {
            executor,
            connection,
            closed: false,
        })
    }

    /// Commit every statement issued since `begin`
    ///
    /// # Errors
    ///
    /// Returns `OrmError::StatementExecutionFailure` if `COMMIT` is rejected; the
    /// transaction is then rolled back when dropped.
    pub fn commit(mut self) -> Result<(), OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::commit_transaction_span(&self.connection).entered();

        log::debug!("[{}] COMMIT", self.connection);
        self.executor.execute_batch("COMMIT")?;
        self.closed = true;
        Ok(())
    }

    /// Discard every statement issued since `begin`
    ///
    /// # Errors
    ///
    /// Returns `OrmError::StatementExecutionFailure` if `ROLLBACK` is rejected.
    pub fn rollback(mut self) -> Result<(), OrmError> {
        self.finish_rollback()
    }

    /// Name of the connection the transaction runs on
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Check if the transaction is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn finish_rollback(&mut self) -> Result<(), OrmError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::rollback_transaction_span(&self.connection).entered();

        log::debug!("[{}] ROLLBACK", self.connection);
        self.closed = true;
        self.executor.execute_batch("ROLLBACK")
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        log::warn!(
            "Transaction on connection {} dropped while open, rolling back",
            self.connection
        );
        if let Err(err) = self.finish_rollback() {
            log::error!("Rollback on connection {} failed: {}", self.connection, err);
        }
    }
}

/// Run `work` inside a transaction on `connection`
///
/// Commits when `work` returns `Ok`. When it returns `Err` the transaction is
/// rolled back and the original error is returned unchanged; a panic in `work`
/// rolls back as the guard unwinds.
///
/// # Errors
///
/// Returns the error of `work`, or the connection error raised by `BEGIN` or
/// `COMMIT` converted into `E`.
pub fn run_transaction<T, E, F>(connection: &str, work: F) -> Result<T, E>
where
    E: From<OrmError> + fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    let transaction = Transaction::begin(connection)?;
    match work() {
        Ok(value) => {
            transaction.commit()?;
            Ok(value)
        }
        Err(err) => {
            log::warn!(
                "Rolling back transaction on connection {}: {}",
                transaction.connection(),
                err
            );
            if let Err(rollback_err) = transaction.rollback() {
                log::error!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

impl QueryBuilder {
    /// Run `work` in a transaction on this builder's write connection (its read
    /// connection when no write connection is set)
    ///
    /// # Errors
    ///
    /// See [`run_transaction`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lifebuoy::{table, OrmError};
    /// use serde_json::json;
    ///
    /// # fn main() -> Result<(), OrmError> {
    /// let orders = table("orders");
    /// let id = orders.transaction(|| {
    ///     let order = table("orders").insert(json!({"total": 40}))?;
    ///     table("stock").where_eq("sku", "A-1").update(json!({"reserved": 1}))?;
    ///     Ok::<_, OrmError>(order.and_then(|o| o.get("id").cloned()))
    /// })?;
    /// # let _ = id;
    /// # Ok(())
    /// # }
    /// ```
    pub fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<OrmError> + fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        run_transaction(self.write_target(), work)
    }
}
