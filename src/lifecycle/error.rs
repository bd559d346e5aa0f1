//! Error types for the session lifecycle.

use thiserror::Error;

use crate::config::ConfigError;
use crate::ledger::LedgerError;

/// Errors a [`Manager`](super::Manager) reports from `init` or `deinit`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ManagerError {
    /// The manager's configuration or credentials are missing or invalid.
    #[error("Manager configuration error: {0}")]
    Config(String),

    /// A resource the manager depends on could not be reached.
    #[error("Manager dependency unavailable: {0}")]
    Unavailable(String),

    /// Any other failure.
    #[error("Manager failed: {0}")]
    Failed(String),
}

/// Errors surfaced by [`ServiceSession`](super::ServiceSession) and its
/// building blocks.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A manager failed to initialize. Later managers were not attempted.
    #[error("Manager {name} failed to initialize: {source}")]
    ManagerInit { name: String, source: ManagerError },

    /// A manager failed to deinitialize. Remaining managers were still attempted.
    #[error("Manager {name} failed to deinitialize: {source}")]
    ManagerDeInit { name: String, source: ManagerError },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Shutdown was already requested, so no new background work is accepted.
    #[error("Shutdown already requested")]
    ShuttingDown,

    /// A background task panicked or was aborted instead of exiting cleanly.
    #[error("Background task {name} failed")]
    TaskFailed { name: String },
}
