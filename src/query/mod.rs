//! Query building and execution.
//!
//! # Architecture
//!
//! - **Builder**: clause accumulation (`QueryBuilder`, `EagerStrategy`)
//! - **Operator**: the predicate operator allow-list (`Operator`, `Criterion`)
//! - **Render**: SQL rendering with positional placeholders (`Statement`)
//! - **Execution**: terminal operations (`get`, `first`, `count`, `insert`, ...)
//!
//! # Examples
//!
//! ```no_run
//! use lifebuoy::{connect, table, OrmError};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), OrmError> {
//! connect("default", ":memory:")?;
//! lifebuoy::execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", [])?;
//!
//! let alice = table("users").insert(json!({"name": "Alice", "age": 30}))?;
//! let adults = table("users").where_op("age", ">=", 18).count()?;
//! assert_eq!(adults, 1);
//! # let _ = alice;
//! # Ok(())
//! # }
//! ```

pub mod builder;
mod execution;
pub mod operator;
pub mod render;

pub use builder::{Constraint, EagerStrategy, QueryBuilder};
pub use operator::{Criterion, Operator};
pub use render::Statement;

pub(crate) use execution::resolve_name;
