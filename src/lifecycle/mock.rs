//! # Mock Managers
//!
//! Utilities for testing the lifecycle without real subsystems.
//!
//! Every [`MockManager`] writes its `init`/`deinit` calls to a shared
//! [`CallJournal`], so a test can assert the exact order in which a registry
//! or session drove its managers. Results are scripted per call; once the
//! script runs out a call succeeds.
//!
//! ```rust,ignore
//! let journal = CallJournal::new();
//! let mut registry = ManagerRegistry::new();
//! registry.register(MockManager::new("a", &journal));
//! registry.register(
//!     MockManager::new("b", &journal)
//!         .with_init_result(Err(ManagerError::Failed("boom".into()))),
//! );
//!
//! assert!(registry.init_all().await.is_err());
//! assert_eq!(journal.calls(), vec![Call::init("a"), Call::init("b")]);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Manager, ManagerError};

/// A lifecycle call recorded by a [`MockManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(String),
    DeInit(String),
}

impl Call {
    pub fn init(name: &str) -> Self {
        Call::Init(name.to_string())
    }

    pub fn deinit(name: &str) -> Self {
        Call::DeInit(name.to_string())
    }
}

/// Ordered record of lifecycle calls shared by a group of mocks.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    /// All calls so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// A [`Manager`] with scripted results.
pub struct MockManager {
    name: String,
    journal: CallJournal,
    init_results: VecDeque<Result<(), ManagerError>>,
    deinit_results: VecDeque<Result<(), ManagerError>>,
}

impl MockManager {
    /// Creates a mock whose calls all succeed.
    pub fn new(name: impl Into<String>, journal: &CallJournal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            init_results: VecDeque::new(),
            deinit_results: VecDeque::new(),
        }
    }

    /// Queues the result of the next `init` call.
    pub fn with_init_result(mut self, result: Result<(), ManagerError>) -> Self {
        self.init_results.push_back(result);
        self
    }

    /// Queues the result of the next `deinit` call.
    pub fn with_deinit_result(mut self, result: Result<(), ManagerError>) -> Self {
        self.deinit_results.push_back(result);
        self
    }
}

#[async_trait]
impl Manager for MockManager {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self) -> Result<(), ManagerError> {
        self.journal.record(Call::Init(self.name.clone()));
        self.init_results.pop_front().unwrap_or(Ok(()))
    }

    async fn deinit(&mut self) -> Result<(), ManagerError> {
        self.journal.record(Call::DeInit(self.name.clone()));
        self.deinit_results.pop_front().unwrap_or(Ok(()))
    }
}
