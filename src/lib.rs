//! # Hive Orchestrator
//!
//! > **Lifecycle orchestration and hive cycle synchronization for a node of a
//! > decentralized compute network.**
//!
//! The network coordinates membership, scheduling epochs ("hive cycles") and
//! the render job queue through messages on append-only, totally ordered
//! consensus topics. This crate is the part of a node that keeps it alive
//! correctly on top of that message bus:
//!
//! - bring the node's subsystem managers up in a safe order, and down again in
//!   the reverse order;
//! - bind the well-known consensus topics to their message handlers;
//! - keep the node's view of the current hive cycle synchronized with the
//!   network, whose cycle length can change at any time.
//!
//! ## 🏗️ Design Notes
//!
//! ### One explicit session object
//! Everything the node runs is owned by a single [`ServiceSession`](lifecycle::ServiceSession)
//! that is constructed in `main` and passed by reference. There is no global
//! state.
//!
//! ### Traits at the seams
//! Subsystems are [`Manager`](lifecycle::Manager)s, the network is a
//! [`LedgerClient`](ledger::LedgerClient), topic consumers are
//! [`MessageHandler`](subscription::MessageHandler)s and cycle discovery is a
//! [`CycleSynchronizer`](hive_cycle::CycleSynchronizer). The session only
//! talks to these traits, so every piece can be replaced in tests.
//!
//! ### Cooperative shutdown
//! Background tasks are spawned through a
//! [`ShutdownCoordinator`](lifecycle::ShutdownCoordinator) and receive a
//! listener. Shutdown flips the signal and joins every task before any
//! manager is deinitialized.
//!
//! ### Error policy
//! - **Startup errors** (manager init, topic resolution, subscription) abort
//!   `init` immediately.
//! - **Shutdown errors** (manager deinit) are collected; all managers are
//!   still attempted and the first error is returned.
//! - **Loop errors** (a failed synchronization) are logged and the loop keeps
//!   running on the configuration it already has.
//!
//! ## 🗺️ Module Tour
//!
//! - [`lifecycle`]: the session, manager registry, shutdown coordination and
//!   tracing setup.
//! - [`subscription`]: message handlers and the binder that feeds them.
//! - [`hive_cycle`]: cycle configuration history, the synchronizer and the
//!   synchronization loop.
//! - [`ledger`]: topic types, the ledger client traits and the in-process
//!   [`InMemoryLedger`](ledger::InMemoryLedger).
//! - [`config`]: TOML configuration.
//! - [`managers`]: managers shipped with the node.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run a local node with info logs
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod config;
pub mod hive_cycle;
pub mod ledger;
pub mod lifecycle;
pub mod managers;
pub mod subscription;
