//! Relations between record types.
//!
//! - **Def**: `RelationDef` / `RelationKind` declare a relation and build its
//!   target query (single owner, batch of owners, or correlated `EXISTS`)
//! - **Eager**: resolves `with(...)` requests for a whole result set
//! - **Lazy**: `Record::related` / `Record::load` resolve one relation for one record

pub mod def;
pub(crate) mod eager;
mod lazy;

pub use def::{RelationDef, RelationKind};
