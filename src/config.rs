//! Configuration utilities re-exported at the crate root.
//!
//! This exposes [`DatabaseConfig`] so applications can load connection settings
//! from `config/config.toml` or `LIFEBUOY__DATABASE__...` environment variables
//! using `DatabaseConfig::load()`, then hand them to
//! [`ConnectionRegistry::init`](crate::pool::ConnectionRegistry::init).

pub use crate::pool::config::*;
