//! # Shutdown Coordination
//!
//! Background work (topic listeners, the synchronization loop) is started
//! through a [`ShutdownCoordinator`]. Each task receives a
//! [`ShutdownListener`] and is expected to return once the listener fires.
//!
//! [`ShutdownCoordinator::request_shutdown`] flips the signal and then joins
//! every task it started. Managers are only deinitialized after it returns,
//! so no manager is torn down underneath a task that is still using it.
//!
//! ```rust,ignore
//! let shutdown = ShutdownCoordinator::new();
//! shutdown.spawn("ticker", |mut listener| async move {
//!     loop {
//!         tokio::select! {
//!             _ = listener.triggered() => break,
//!             _ = tokio::time::sleep(Duration::from_secs(1)) => tick(),
//!         }
//!     }
//! })?;
//!
//! shutdown.request_shutdown().await?; // ticker has exited
//! ```

use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::LifecycleError;

struct BackgroundTask {
    name: String,
    handle: JoinHandle<()>,
}

/// Broadcast-once shutdown signal plus the set of tasks waiting on it.
pub struct ShutdownCoordinator {
    signal: watch::Sender<bool>,
    tasks: Mutex<Vec<BackgroundTask>>,
    // Serializes joiners so a second `request_shutdown` waits for the first.
    join_gate: tokio::sync::Mutex<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal,
            tasks: Mutex::new(Vec::new()),
            join_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns a listener that fires once shutdown is requested.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            signal: self.signal.subscribe(),
        }
    }

    /// Spawns a background task and registers it to be joined on shutdown.
    ///
    /// Fails with [`LifecycleError::ShuttingDown`] once shutdown has been
    /// requested; the task is not started in that case.
    pub fn spawn<F, Fut>(&self, name: impl Into<String>, task: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(ShutdownListener) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let mut tasks = self.tasks.lock();
        if self.is_shutdown() {
            debug!(task = %name, "Rejected background task, shutdown in progress");
            return Err(LifecycleError::ShuttingDown);
        }
        let handle = tokio::spawn(task(self.listener()));
        debug!(task = %name, "Background task started");
        tasks.push(BackgroundTask { name, handle });
        Ok(())
    }

    /// Signals shutdown and waits until every registered task has exited.
    ///
    /// Calling this more than once is harmless. A concurrent second caller
    /// returns only after the first has finished joining. If a task panicked,
    /// the remaining tasks are still joined and the first failure is returned.
    pub async fn request_shutdown(&self) -> Result<(), LifecycleError> {
        let _gate = self.join_gate.lock().await;

        let first_request = self.signal.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        });
        if first_request {
            info!("Shutdown requested");
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        if !tasks.is_empty() {
            info!(tasks = tasks.len(), "Waiting for background operations to shut down");
        }

        let mut failure = None;
        for BackgroundTask { name, handle } in tasks {
            match handle.await {
                Ok(()) => debug!(task = %name, "Background task stopped"),
                Err(e) => {
                    error!(task = %name, error = %e, "Background task failed");
                    if failure.is_none() {
                        failure = Some(LifecycleError::TaskFailed { name });
                    }
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.signal.borrow()
    }

    /// Number of registered tasks that have not finished yet.
    pub fn active_tasks(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|task| !task.handle.is_finished())
            .count()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of the shutdown signal, handed to each background task.
#[derive(Clone)]
pub struct ShutdownListener {
    signal: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// True once shutdown was requested or the coordinator is gone.
    pub fn is_triggered(&self) -> bool {
        *self.signal.borrow() || self.signal.has_changed().is_err()
    }

    /// Resolves once shutdown is requested or the coordinator is dropped.
    pub async fn triggered(&mut self) {
        let _ = self.signal.wait_for(|triggered| *triggered).await;
    }
}
