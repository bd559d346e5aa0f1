//! # Synchronization Loop
//!
//! Background task that keeps the node's view of the hive cycle current.
//!
//! ```text
//!          ┌─────────────┐  synchronize done  ┌──────────────────────┐
//! start ─→ │ RunningSync │ ─────────────────→ │ Sleeping(latest / 10)│
//!          └─────────────┘ ←───────────────── └──────────────────────┘
//!                 │           timer elapsed              │
//!                 │ shutdown                   shutdown  │
//!                 ↓                                      ↓
//!          ┌─────────────────────────────────────────────────────────┐
//!          │                         Stopped                         │
//!          └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The sleep is recomputed after every synchronize call from the *latest*
//! configuration, a tenth of the cycle duration, so a change in cycle length
//! takes effect on the very next iteration. A shutdown signal cuts a sleep
//! short; an in-flight synchronize call is never interrupted.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{ConfigurationHistory, CycleSynchronizer};
use crate::ledger::LedgerClient;
use crate::lifecycle::ShutdownListener;

/// How many times per nominal cycle the loop re-synchronizes.
pub const SYNC_CHECKS_PER_CYCLE: u32 = 10;

/// Sleep used while no cycle configuration is known.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    RunningSync,
    Sleeping(Duration),
    Stopped,
}

/// Interval until the next synchronization given the current history.
///
/// A tenth of the latest cycle duration, or `default` when the history is
/// empty or that tenth rounds down to zero.
pub fn sleep_interval(history: &ConfigurationHistory, default: Duration) -> Duration {
    history
        .latest()
        .map(|configuration| configuration.duration / SYNC_CHECKS_PER_CYCLE)
        .filter(|interval| !interval.is_zero())
        .unwrap_or(default)
}

pub struct SynchronizationLoop {
    ledger: Arc<dyn LedgerClient>,
    synchronizer: Arc<dyn CycleSynchronizer>,
    history: ConfigurationHistory,
    default_interval: Duration,
}

impl SynchronizationLoop {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        synchronizer: Arc<dyn CycleSynchronizer>,
        history: ConfigurationHistory,
    ) -> Self {
        Self {
            ledger,
            synchronizer,
            history,
            default_interval: DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Overrides the interval used before any configuration is known.
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    pub fn sleep_interval(&self) -> Duration {
        sleep_interval(&self.history, self.default_interval)
    }

    /// Runs until `shutdown` fires.
    pub async fn run(self, mut shutdown: ShutdownListener) {
        info!("Started hive cycle synchronization loop");
        let mut state = LoopState::RunningSync;
        while state != LoopState::Stopped {
            state = self.step(state, &mut shutdown).await;
        }
        debug!("Stopped hive cycle synchronization loop");
    }

    async fn step(&self, state: LoopState, shutdown: &mut ShutdownListener) -> LoopState {
        match state {
            LoopState::RunningSync => {
                if shutdown.is_triggered() {
                    return LoopState::Stopped;
                }
                self.synchronize().await;
                LoopState::Sleeping(self.sleep_interval())
            }
            LoopState::Sleeping(interval) => {
                tokio::select! {
                    biased;
                    _ = shutdown.triggered() => LoopState::Stopped,
                    _ = tokio::time::sleep(interval) => LoopState::RunningSync,
                }
            }
            LoopState::Stopped => LoopState::Stopped,
        }
    }

    async fn synchronize(&self) {
        match self
            .synchronizer
            .synchronize(self.ledger.as_ref(), &self.history)
            .await
        {
            Ok(()) => debug!(configurations = self.history.len(), "Hive cycle synchronized"),
            Err(e) => warn!(error = %e, "Hive cycle synchronization failed"),
        }
    }
}
