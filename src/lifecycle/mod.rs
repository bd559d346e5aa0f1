//! Session lifecycle: managers, background tasks, startup and shutdown.
//!
//! # Main Components
//!
//! - [`ServiceSession`] - The orchestrator that owns and drives everything else
//! - [`ManagerRegistry`] - Ordered init, reverse-order deinit of [`Manager`]s
//! - [`ShutdownCoordinator`] - Signals background tasks and joins them
//! - [`setup_tracing`] - Initializes the logging infrastructure
//!
//! # Testing
//!
//! See [`mock`] for a scripted [`Manager`] that records its calls.

pub mod error;
pub mod manager;
pub mod mock;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod tracing;

pub use error::*;
pub use manager::*;
pub use registry::*;
pub use session::*;
pub use shutdown::*;
pub use self::tracing::*;
