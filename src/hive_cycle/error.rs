//! Error types for hive cycle synchronization.

use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors from a [`CycleSynchronizer`](super::CycleSynchronizer) run.
///
/// Inside the synchronization loop these are transient: they are logged and
/// the loop keeps going with the configuration it already has.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HiveCycleError {
    #[error("Ledger error during synchronization: {0}")]
    Ledger(#[from] LedgerError),

    /// No usable cycle configuration could be obtained.
    #[error("Cycle configuration unavailable: {0}")]
    Unavailable(String),
}
