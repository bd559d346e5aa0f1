//! Binding consensus topics to message handlers.
//!
//! # Main Components
//!
//! - [`MessageHandler`] - One-method trait every topic consumer implements
//! - [`SubscriptionBinder`] - Opens a feed and runs its listener task
//! - [`LoggingHandler`], [`handler_fn`] - Ready-made handlers

pub mod binder;
pub mod error;
pub mod handler;

pub use binder::*;
pub use error::*;
pub use handler::*;
