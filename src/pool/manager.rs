//! Connection Registry
//!
//! Process-wide map from connection name to connection parameters and, once a name
//! has been acquired, to its live [`Executor`] handle. Handles are opened lazily on
//! first acquisition and shared by every query naming that connection afterwards.
//!
//! Tests isolate themselves with [`ConnectionRegistry::reset`] (or
//! [`ConnectionRegistry::init`], which resets before registering).

use crate::connection::{connect, validate_connection_parameters, ConnectionParameters};
use crate::executor::{Executor, OrmError};
use crate::pool::config::{default_connection_name, DatabaseConfig};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct RegistryState {
    default: String,
    parameters: HashMap<String, ConnectionParameters>,
    handles: HashMap<String, Arc<dyn Executor>>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            default: default_connection_name(),
            parameters: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    fn resolve(&self, name: &str) -> String {
        if name.is_empty() {
            self.default.clone()
        } else {
            name.to_string()
        }
    }
}

static REGISTRY: Lazy<Mutex<RegistryState>> = Lazy::new(|| Mutex::new(RegistryState::new()));

fn state() -> MutexGuard<'static, RegistryState> {
    // Registry state stays consistent across a panicking holder; every write is a single map operation.
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Named-connection lifecycle
///
/// # Examples
///
/// ```no_run
/// use lifebuoy::{ConnectionParameters, ConnectionRegistry, OrmError};
///
/// # fn main() -> Result<(), OrmError> {
/// ConnectionRegistry::register("reporting", ConnectionParameters::new("reports.db"))?;
/// let executor = ConnectionRegistry::acquire("reporting")?;
/// executor.execute_batch("CREATE TABLE IF NOT EXISTS hits (id INTEGER PRIMARY KEY)")?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionRegistry;

impl ConnectionRegistry {
    /// Register parameters under `name` (empty name means the default connection)
    ///
    /// Re-registering a name drops its live handle so the next acquisition opens a
    /// fresh connection with the new parameters.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::InvalidConnectionParameters` if the parameters are malformed.
    pub fn register(name: &str, params: ConnectionParameters) -> Result<(), OrmError> {
        validate_connection_parameters(&params)?;
        let mut state = state();
        let name = state.resolve(name);
        log::info!("Registered connection {} ({})", name, params.url);
        state.handles.remove(&name);
        state.parameters.insert(name, params);
        Ok(())
    }

    /// Register an already-open handle under `name`
    ///
    /// Used for custom executors; the handle is returned as-is by every later
    /// acquisition of the name.
    pub fn register_executor(name: &str, executor: Arc<dyn Executor>) {
        let mut state = state();
        let name = state.resolve(name);
        log::info!("Registered executor for connection {}", name);
        state.parameters.remove(&name);
        state.handles.insert(name, executor);
    }

    /// Live handle for `name`, opening it on first use
    ///
    /// # Errors
    ///
    /// Returns `OrmError::ConnectionNotFound` if `name` was never registered, or the
    /// driver error if the connection cannot be opened.
    pub fn acquire(name: &str) -> Result<Arc<dyn Executor>, OrmError> {
        let mut state = state();
        let name = state.resolve(name);

        if let Some(handle) = state.handles.get(&name) {
            return Ok(Arc::clone(handle));
        }

        let params = state
            .parameters
            .get(&name)
            .ok_or_else(|| OrmError::ConnectionNotFound(name.clone()))?;

        log::info!("Opening connection {}", name);
        let handle: Arc<dyn Executor> = Arc::new(connect(params)?);
        state.handles.insert(name, Arc::clone(&handle));
        Ok(handle)
    }

    /// Whether `name` has parameters or a handle registered
    pub fn is_registered(name: &str) -> bool {
        let state = state();
        let name = state.resolve(name);
        state.parameters.contains_key(&name) || state.handles.contains_key(&name)
    }

    /// Connection name used when a query names none
    pub fn default_name() -> String {
        state().default.clone()
    }

    /// Reset the registry and register every connection in `config`
    ///
    /// # Errors
    ///
    /// Returns `OrmError::InvalidConnectionParameters` for the first malformed
    /// connection; the registry is left unchanged in that case.
    pub fn init(config: &DatabaseConfig) -> Result<(), OrmError> {
        for params in config.connections.values() {
            validate_connection_parameters(params)?;
        }

        let mut state = state();
        *state = RegistryState::new();
        if !config.default.trim().is_empty() {
            state.default = config.default.clone();
        }
        state.parameters = config
            .connections
            .iter()
            .map(|(name, params)| (name.clone(), params.clone()))
            .collect();
        log::info!("Initialized {} connection(s)", state.parameters.len());
        Ok(())
    }

    /// Forget every registered connection and drop all live handles
    pub fn reset() {
        *state() = RegistryState::new();
    }
}
