//! Backend abstraction for talking to the cluster.
//!
//! The [`Backend`] trait is the whole boundary between reconciliation and
//! the cluster tooling, allowing for:
//! - Real CLI execution via `crm` and `crm_resource`
//! - An in-memory cluster for tests and dry runs

pub mod crm;
pub mod memory;

use crate::error::Result;

/// Backend trait for cluster operations.
pub trait Backend: Send + Sync {
    /// Textual definition of the named object, or `None` if it does not exist.
    fn query(&self, name: &str) -> Result<Option<String>>;

    /// Execute one command. A failing command is reported as
    /// [`Error::ExternalCommand`](crate::Error::ExternalCommand).
    fn apply(&self, command: &str) -> Result<()>;

    /// Whether the named resource is currently running.
    fn is_running(&self, name: &str) -> Result<bool>;
}

/// Get the default backend (real crm CLI).
pub fn default_backend() -> crm::CrmBackend {
    crm::CrmBackend::new()
}
