//! # Observability & Tracing
//!
//! Structured logging for the node, built on `tracing`.
//!
//! ## Configuration
//!
//! Verbosity comes from `RUST_LOG` and defaults to `info`. Output uses the
//! compact format without module targets; components identify themselves
//! through structured fields instead (`manager`, `topic`, `task`, `cycle`).
//!
//! ```bash
//! # Lifecycle transitions, subscriptions, cycle updates
//! RUST_LOG=info cargo run
//!
//! # Adds every synchronize call, duplicate messages, task start/stop
//! RUST_LOG=debug cargo run
//!
//! # Only the hive cycle module at debug
//! RUST_LOG=info,hive_orchestrator::hive_cycle=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! - **Managers**: each init/deinit transition and its outcome
//! - **Topics**: subscription, handler failures, feed end
//! - **Hive cycle**: configuration updates and failed synchronizations
//! - **Shutdown**: the signal and every background task joined
//!
//! With `RUST_LOG=info` a clean start and stop reads:
//!
//! ```text
//! INFO session_init: Starting hive node session network=local
//! INFO session_init: Initializing manager manager="local network"
//! INFO session_init: Manager initialized manager="local network"
//! INFO session_init:subscribe: Subscribed to topic memo="render job queue" topic=0.0.1001
//! INFO Started hive cycle synchronization loop
//! INFO Hive cycle configuration updated cycle=1 duration_secs=60
//! INFO session_deinit: Stopping hive node session
//! INFO session_deinit: Shutdown requested
//! INFO session_deinit: Waiting for background operations to shut down tasks=5
//! INFO session_deinit: Hive node session stopped
//! ```

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. Call once, at process start.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
