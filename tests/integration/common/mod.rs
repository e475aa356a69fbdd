//! Shared helpers for integration tests
//!
//! Tests in one binary share the process-wide connection registry and query log,
//! so every test holds the [`serial`] guard for its whole body and starts from a
//! fresh in-memory database registered under the connection name it uses.

#![allow(dead_code)]

use lifebuoy::{ConnectionRegistry, Executor, QueryLog, SqliteExecutor};
use std::sync::{Arc, Mutex, MutexGuard};

static SERIAL: Mutex<()> = Mutex::new(());

/// Hold for the duration of a test that touches process-wide state
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Register a new in-memory database under `name`, run `ddl` on it and clear
/// the query log
pub fn fresh_database(name: &str, ddl: &str) -> Arc<dyn Executor> {
    #[cfg(feature = "tracing")]
    lifebuoy::metrics::tracing_helpers::init_test_subscriber();

    let executor: Arc<dyn Executor> =
        Arc::new(SqliteExecutor::open_in_memory().expect("open in-memory database"));
    executor.execute_batch(ddl).expect("create test schema");
    ConnectionRegistry::register_executor(name, Arc::clone(&executor));
    QueryLog::reset();
    executor
}

/// SQL of every statement logged for `connection` since the last reset
pub fn statements(connection: &str) -> Vec<String> {
    QueryLog::entries_for(connection)
        .into_iter()
        .map(|entry| entry.sql)
        .collect()
}

/// Number of `?` placeholders in `sql`
pub fn placeholder_count(sql: &str) -> usize {
    sql.matches('?').count()
}
