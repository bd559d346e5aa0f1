use async_trait::async_trait;
use tracing::info;

use super::HandlerError;
use crate::ledger::TopicMessage;

/// Consumer of the messages delivered on one topic.
///
/// Handlers are shared as `Arc<dyn MessageHandler>` and can run at the same
/// time as handlers of other topics and as the synchronization loop.
/// Networks may redeliver after a reconnect, so a handler must tolerate
/// seeing the same sequence number twice.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &TopicMessage) -> Result<(), HandlerError>;
}

/// Pass-through handler that only logs what arrives.
#[derive(Debug, Clone)]
pub struct LoggingHandler {
    label: String,
}

impl LoggingHandler {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: &TopicMessage) -> Result<(), HandlerError> {
        info!(
            topic = %message.topic,
            label = %self.label,
            sequence_number = message.sequence_number,
            contents = %message.contents_utf8(),
            "Message received"
        );
        Ok(())
    }
}

/// Handler backed by a synchronous closure. See [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wraps a closure as a [`MessageHandler`].
///
/// ```rust,ignore
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let handler = handler_fn(move |message| {
///     sink.lock().push(message.sequence_number);
///     Ok(())
/// });
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&TopicMessage) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&TopicMessage) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, message: &TopicMessage) -> Result<(), HandlerError> {
        (self.f)(message)
    }
}
