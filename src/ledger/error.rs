//! Error types for the ledger client.

use thiserror::Error;

/// Errors returned by a [`LedgerClient`](super::LedgerClient).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    /// The topic address is not of the form `shard.realm.num`.
    #[error("Invalid topic address: {0}")]
    InvalidAddress(String),

    /// The network has no topic with this address.
    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    /// A topic with this address already exists.
    #[error("Topic already exists: {0}")]
    TopicExists(String),

    /// The network could not be reached or has been closed.
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),
}
