//! Query diagnostics.
//!
//! [`QueryLog`] is a process-wide, append-only list with one entry per executed
//! statement. Recording never influences query results: a poisoned lock simply
//! drops the entry.
//!
//! With the `tracing` feature enabled, [`tracing_helpers`] provides the spans the
//! executor, transaction and eager-loading code enter.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

static QUERY_LOG: Lazy<Mutex<Vec<QueryLogEntry>>> = Lazy::new(|| Mutex::new(Vec::new()));
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// One executed statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    /// Process-unique id, increasing in recording order; never reused after a reset
    pub id: u64,
    /// Connection name the statement ran on
    pub connection: String,
    pub sql: String,
    pub values: Vec<Value>,
    /// Wall-clock cost; `None` until the statement completed successfully
    pub cost: Option<Duration>,
    pub executed_at: DateTime<Utc>,
}

/// Handle to the process-wide query log
pub struct QueryLog;

impl QueryLog {
    /// Append an entry for a statement about to run; returns its id
    pub(crate) fn record(connection: &str, sql: &str, values: &[Value]) -> Option<u64> {
        let mut log = QUERY_LOG.lock().ok()?;
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        log.push(QueryLogEntry {
            id,
            connection: connection.to_string(),
            sql: sql.to_string(),
            values: values.to_vec(),
            cost: None,
            executed_at: Utc::now(),
        });
        Some(id)
    }

    /// Fill in the cost of a previously recorded entry
    ///
    /// Does nothing when the entry is gone, e.g. after a [`reset`](Self::reset).
    pub(crate) fn record_cost(id: Option<u64>, cost: Duration) {
        let (Some(id), Ok(mut log)) = (id, QUERY_LOG.lock()) else {
            return;
        };
        if let Some(entry) = log.iter_mut().rev().find(|entry| entry.id == id) {
            entry.cost = Some(cost);
        }
    }

    /// Snapshot of every recorded entry, oldest first
    pub fn entries() -> Vec<QueryLogEntry> {
        QUERY_LOG.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Entries recorded for one connection name
    pub fn entries_for(connection: &str) -> Vec<QueryLogEntry> {
        QUERY_LOG
            .lock()
            .map(|log| log.iter().filter(|e| e.connection == connection).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len() -> usize {
        QUERY_LOG.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Clear the log
    pub fn reset() {
        if let Ok(mut log) = QUERY_LOG.lock() {
            log.clear();
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    //! Span constructors shared by the executor and transaction code.

    use tracing::{info_span, Span};

    pub fn execute_query_span(sql: &str) -> Span {
        info_span!("lifebuoy.execute_query", sql = %sql)
    }

    pub fn begin_transaction_span(connection: &str) -> Span {
        info_span!("lifebuoy.begin_transaction", connection = %connection)
    }

    pub fn commit_transaction_span(connection: &str) -> Span {
        info_span!("lifebuoy.commit_transaction", connection = %connection)
    }

    pub fn rollback_transaction_span(connection: &str) -> Span {
        info_span!("lifebuoy.rollback_transaction", connection = %connection)
    }

    pub fn eager_load_span(relation: &str, parents: usize) -> Span {
        info_span!("lifebuoy.eager_load", relation = %relation, parents)
    }

    /// Install a formatting subscriber writing to the test harness output
    ///
    /// Safe to call repeatedly; only the first call installs a subscriber.
    pub fn init_test_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }
}
