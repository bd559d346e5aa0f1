//! # Manager Registry
//!
//! Ordered collection of [`Manager`]s with fail-fast startup and best-effort
//! teardown.
//!
//! - **`init_all`** walks the managers in registration order and stops at the
//!   first failure. A later manager may rely on what an earlier one set up
//!   (network credentials, open connections), so nothing after a failed
//!   manager is attempted.
//! - **`deinit_all`** walks the *initialized* managers in reverse order. A
//!   failure is logged and remembered, the remaining managers are still torn
//!   down, and the first failure is returned at the end.
//!
//! ```text
//! register:   A   B   C
//! init_all:   A ✓ B ✓ C ✗   -> Err(ManagerInit { name: "C", .. })
//! deinit_all: B, A          -> C is never touched
//! ```

use tracing::{error, info, warn};

use super::{LifecycleError, Manager};

/// One registered manager and whether its `init` has succeeded.
pub struct ManagerEntry {
    manager: Box<dyn Manager>,
    initialized: bool,
}

impl ManagerEntry {
    pub fn name(&self) -> &str {
        self.manager.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[derive(Default)]
pub struct ManagerRegistry {
    entries: Vec<ManagerEntry>,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a manager. Registration order is initialization order.
    pub fn register<M: Manager + 'static>(&mut self, manager: M) {
        self.register_boxed(Box::new(manager));
    }

    pub fn register_boxed(&mut self, manager: Box<dyn Manager>) {
        self.entries.push(ManagerEntry {
            manager,
            initialized: false,
        });
    }

    /// Initializes every manager that is not yet initialized, in order,
    /// stopping at the first failure.
    pub async fn init_all(&mut self) -> Result<(), LifecycleError> {
        for entry in self.entries.iter_mut().filter(|entry| !entry.initialized) {
            let name = entry.manager.name().to_string();
            info!(manager = %name, "Initializing manager");
            match entry.manager.init().await {
                Ok(()) => {
                    entry.initialized = true;
                    info!(manager = %name, "Manager initialized");
                }
                Err(source) => {
                    error!(manager = %name, error = %source, "Manager failed to initialize");
                    return Err(LifecycleError::ManagerInit { name, source });
                }
            }
        }
        Ok(())
    }

    /// Deinitializes every initialized manager in reverse order.
    ///
    /// Each manager is attempted exactly once; its initialized flag is cleared
    /// whether or not `deinit` succeeds, so calling this again is a no-op.
    pub async fn deinit_all(&mut self) -> Result<(), LifecycleError> {
        let mut first_error = None;
        for entry in self.entries.iter_mut().rev().filter(|entry| entry.initialized) {
            entry.initialized = false;
            let name = entry.manager.name().to_string();
            info!(manager = %name, "Deinitializing manager");
            match entry.manager.deinit().await {
                Ok(()) => info!(manager = %name, "Manager deinitialized"),
                Err(source) => {
                    warn!(manager = %name, error = %source, "Manager failed to deinitialize");
                    if first_error.is_none() {
                        first_error = Some(LifecycleError::ManagerDeInit { name, source });
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Names of all registered managers, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name().to_string()).collect()
    }

    /// Names of the managers currently initialized, in registration order.
    pub fn initialized(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.initialized)
            .map(|entry| entry.name().to_string())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManagerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::mock::{Call, CallJournal, MockManager};
    use crate::lifecycle::ManagerError;

    fn registry_of(managers: Vec<MockManager>) -> ManagerRegistry {
        let mut registry = ManagerRegistry::new();
        for manager in managers {
            registry.register(manager);
        }
        registry
    }

    #[tokio::test]
    async fn init_runs_in_registration_order() {
        let journal = CallJournal::new();
        let mut registry = registry_of(vec![
            MockManager::new("node", &journal),
            MockManager::new("ledger", &journal),
            MockManager::new("storage", &journal),
        ]);

        registry.init_all().await.unwrap();

        assert_eq!(
            journal.calls(),
            vec![Call::init("node"), Call::init("ledger"), Call::init("storage")]
        );
        assert_eq!(registry.initialized(), vec!["node", "ledger", "storage"]);
    }

    #[tokio::test]
    async fn init_stops_at_first_failure() {
        let journal = CallJournal::new();
        let mut registry = registry_of(vec![
            MockManager::new("a", &journal),
            MockManager::new("b", &journal)
                .with_init_result(Err(ManagerError::Unavailable("no network".into()))),
            MockManager::new("c", &journal),
        ]);

        let err = registry.init_all().await.unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::ManagerInit { ref name, source: ManagerError::Unavailable(_) } if name == "b"
        ));
        assert_eq!(journal.calls(), vec![Call::init("a"), Call::init("b")]);
        assert_eq!(registry.initialized(), vec!["a"]);
    }

    #[tokio::test]
    async fn deinit_attempts_every_manager_and_returns_first_error() {
        let journal = CallJournal::new();
        let mut registry = registry_of(vec![
            MockManager::new("a", &journal)
                .with_deinit_result(Err(ManagerError::Failed("a stuck".into()))),
            MockManager::new("b", &journal),
            MockManager::new("c", &journal)
                .with_deinit_result(Err(ManagerError::Failed("c stuck".into()))),
        ]);
        registry.init_all().await.unwrap();
        journal.clear();

        let err = registry.deinit_all().await.unwrap_err();

        assert!(matches!(err, LifecycleError::ManagerDeInit { ref name, .. } if name == "c"));
        assert_eq!(
            journal.calls(),
            vec![Call::deinit("c"), Call::deinit("b"), Call::deinit("a")]
        );
        assert!(registry.initialized().is_empty());
    }

    #[tokio::test]
    async fn second_deinit_is_a_no_op() {
        let journal = CallJournal::new();
        let mut registry = registry_of(vec![MockManager::new("a", &journal)]);
        registry.init_all().await.unwrap();
        registry.deinit_all().await.unwrap();
        registry.deinit_all().await.unwrap();

        assert_eq!(journal.calls(), vec![Call::init("a"), Call::deinit("a")]);
    }

    #[tokio::test]
    async fn empty_registry_is_fine() {
        let mut registry = ManagerRegistry::new();
        assert!(registry.is_empty());
        registry.init_all().await.unwrap();
        registry.deinit_all().await.unwrap();
    }
}
