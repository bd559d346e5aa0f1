//! Access to the consensus network.
//!
//! The orchestrator only needs two things from the network: resolving a
//! well-known topic address and subscribing to a topic's ordered message
//! feed. Both live behind [`LedgerClient`] so that the hosted network and
//! the in-process [`InMemoryLedger`] are interchangeable.

pub mod client;
pub mod error;
pub mod memory;
pub mod topic;

pub use client::*;
pub use error::*;
pub use memory::InMemoryLedger;
pub use topic::*;
