//! Error types for message handlers.

use thiserror::Error;

/// Errors a [`MessageHandler`](super::MessageHandler) reports for one message.
///
/// A handler error never ends the subscription; the listener logs it and
/// moves on to the next message.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandlerError {
    /// The message contents could not be decoded.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// The message decoded but was refused by the handler.
    #[error("Message rejected: {0}")]
    Rejected(String),
}
