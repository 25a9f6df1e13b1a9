//! Process-wide client handles.
//!
//! Functions reuse their store and queue clients across warm invocations.
//! A [`SharedClient`] is declared as a `static` and builds its client on
//! first use; every later call returns the same handle.

use crate::config::ShellConfig;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A lazily constructed, shared client handle.
///
/// ```
/// use eventshell::clients::SharedClient;
///
/// struct Client {
///     region: Option<String>,
/// }
///
/// static CLIENT: SharedClient<Client> = SharedClient::new();
///
/// let client = CLIENT.get_or_init(|| Client { region: None });
/// assert!(client.region.is_none());
/// ```
pub struct SharedClient<T> {
    cell: OnceLock<Arc<T>>,
}

impl<T> SharedClient<T> {
    /// Creates an empty handle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Returns the client, constructing it with `init` on first use.
    ///
    /// Concurrent first callers block until one of them has constructed
    /// the client; `init` runs at most once.
    pub fn get_or_init<F>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        Arc::clone(self.cell.get_or_init(|| {
            debug!(client = std::any::type_name::<T>(), "Constructing shared client");
            Arc::new(init())
        }))
    }

    /// Returns the client, constructing it from `config` on first use.
    pub fn get_or_configure<F>(&self, config: &ShellConfig, init: F) -> Arc<T>
    where
        F: FnOnce(&ShellConfig) -> T,
    {
        self.get_or_init(|| init(config))
    }

    /// Returns the client if it has been constructed.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// Returns true if the client has been constructed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for SharedClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SharedClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedClient")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
