use async_trait::async_trait;

use super::ManagerError;

/// A subsystem driven by the session through a two-step lifecycle.
///
/// The session never looks inside a manager. `init` runs once during
/// startup, in registration order; `deinit` runs during shutdown, in reverse
/// order, and only if `init` succeeded.
#[async_trait]
pub trait Manager: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    async fn init(&mut self) -> Result<(), ManagerError>;

    async fn deinit(&mut self) -> Result<(), ManagerError>;
}
