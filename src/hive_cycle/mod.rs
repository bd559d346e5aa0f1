//! Hive cycle state and its synchronization with the network.
//!
//! - [`CycleConfiguration`] / [`ConfigurationHistory`] - What the node knows
//!   about the current and past cycles
//! - [`CycleSynchronizer`] / [`HiveCycle`] - How that knowledge is refreshed
//! - [`SynchronizationLoop`] - When it is refreshed

pub mod config;
pub mod error;
pub mod sync_loop;
pub mod synchronizer;

pub use config::*;
pub use error::*;
pub use sync_loop::*;
pub use synchronizer::*;
