//! Persistable record types.
//!
//! # Architecture
//!
//! - **Schema**: `ModelSchema` (table, primary key, connections, JSON fields,
//!   relation registry) and the `Entity` trait that exposes one per type
//! - **Snapshot**: persisted-form snapshots and dirty-attribute diffing
//! - **Save**: `Record::save` / `Record::delete` for schema-bound records

pub mod schema;
#[doc(inline)]
pub use schema::{Entity, ModelSchema, ModelSchemaBuilder};

pub mod snapshot;
#[doc(inline)]
pub use snapshot::Snapshot;

mod save;
pub use save::SaveOutcome;
