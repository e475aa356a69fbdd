//! Connection configuration and the process-wide connection registry.

pub mod config;
pub mod manager;

pub use manager::ConnectionRegistry;
