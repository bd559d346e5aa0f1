//! Concrete [`Manager`](crate::lifecycle::Manager) implementations shipped
//! with the node.

pub mod local;

pub use local::LocalNetworkManager;
