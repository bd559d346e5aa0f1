//! # Hive Node
//!
//! Runs one node of the hive: starts the [`ServiceSession`], keeps it
//! synchronized with the hive cycle until Ctrl-C, then shuts it down.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! HIVE_CONFIG=node.toml RUST_LOG=debug cargo run
//! ```
//!
//! Only the `local` network is available to this binary; it runs against an
//! in-process ledger provisioned by the [`LocalNetworkManager`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hive_orchestrator::config::{NetworkType, ServiceConfig};
use hive_orchestrator::hive_cycle::HiveCycle;
use hive_orchestrator::ledger::InMemoryLedger;
use hive_orchestrator::lifecycle::{setup_tracing, ServiceSession};
use hive_orchestrator::managers::LocalNetworkManager;
use tracing::{error, info};

fn load_config() -> Result<ServiceConfig, String> {
    match std::env::var_os("HIVE_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            info!(path = %path.display(), "Loading configuration");
            ServiceConfig::load(&path).map_err(|e| e.to_string())
        }
        None => {
            info!("HIVE_CONFIG not set, using default configuration");
            Ok(ServiceConfig::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = load_config()?;
    if config.network != NetworkType::Local {
        return Err(format!("no ledger client available for the {} network", config.network));
    }

    let ledger = Arc::new(InMemoryLedger::new());
    let hive_cycle = Arc::new(HiveCycle::new(config.topics.hive_cycle_synchronization.clone()));
    let network = LocalNetworkManager::new(
        ledger.clone(),
        config.topics.clone(),
        Duration::from_secs(config.hive_cycle.genesis_duration_secs),
    );

    let mut session = ServiceSession::with_default_bindings(config, ledger, hive_cycle);
    session.register_manager(network);

    if let Err(e) = session.init().await {
        error!(error = %e, "Startup failed");
        if let Err(cleanup) = session.deinit().await {
            error!(error = %cleanup, "Cleanup after failed startup also failed");
        }
        return Err(e.to_string());
    }
    info!("Hive node running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
    }

    session.deinit().await.map_err(|e| e.to_string())?;
    info!("Hive node stopped");
    Ok(())
}
