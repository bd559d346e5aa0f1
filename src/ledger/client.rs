use std::time::SystemTime;

use async_trait::async_trait;

use super::{LedgerError, TopicHandle, TopicMessage};

/// Live feed of messages from one consensus topic.
///
/// Messages arrive in the topic's consensus order. `None` means the feed has
/// ended and will produce nothing further.
#[async_trait]
pub trait TopicFeed: Send {
    async fn next_message(&mut self) -> Option<TopicMessage>;
}

/// Topic resolution and subscription services of a consensus network.
///
/// Reconnection and gap detection on a live feed are the implementation's
/// concern. Callers only see an ordered feed that eventually ends.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Looks up a topic by its well-known address.
    async fn resolve_topic(&self, address: &str) -> Result<TopicHandle, LedgerError>;

    /// Opens a feed of every message with a consensus timestamp at or after
    /// `since`, followed by live messages. `UNIX_EPOCH` replays the full
    /// history of the topic.
    async fn subscribe(
        &self,
        topic: &TopicHandle,
        since: SystemTime,
    ) -> Result<Box<dyn TopicFeed>, LedgerError>;
}
