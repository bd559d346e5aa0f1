//! # Subscription Binder
//!
//! Connects a resolved topic to a [`MessageHandler`].
//!
//! `subscribe` opens the feed right away, so a missing topic or an
//! unreachable network comes back as an error to the caller. There is no
//! retry. Once the feed is open, a listener task owned by the
//! [`ShutdownCoordinator`] pulls messages in topic order and hands each one to
//! the handler until shutdown is requested or the feed ends.
//!
//! Listener tasks for different topics run independently, so handlers of
//! different topics see no ordering relative to each other.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info, instrument, warn};

use super::MessageHandler;
use crate::ledger::{LedgerClient, TopicFeed, TopicHandle, TopicId};
use crate::lifecycle::{LifecycleError, ShutdownCoordinator, ShutdownListener};

pub struct SubscriptionBinder {
    ledger: Arc<dyn LedgerClient>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl SubscriptionBinder {
    pub fn new(ledger: Arc<dyn LedgerClient>, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self { ledger, shutdown }
    }

    /// Delivers every message of `topic` from `since` onwards to `handler`.
    ///
    /// Returns once the feed is open; delivery happens on a background task.
    #[instrument(skip(self, topic, handler), fields(topic = %topic.id))]
    pub async fn subscribe(
        &self,
        topic: &TopicHandle,
        since: SystemTime,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), LifecycleError> {
        if self.shutdown.is_shutdown() {
            return Err(LifecycleError::ShuttingDown);
        }
        let feed = self.ledger.subscribe(topic, since).await?;
        let topic_id = topic.id;
        self.shutdown
            .spawn(format!("topic listener {topic_id}"), move |shutdown| {
                listen(topic_id, feed, handler, shutdown)
            })?;
        info!(memo = %topic.memo, "Subscribed to topic");
        Ok(())
    }
}

async fn listen(
    topic: TopicId,
    mut feed: Box<dyn TopicFeed>,
    handler: Arc<dyn MessageHandler>,
    mut shutdown: ShutdownListener,
) {
    debug!(%topic, "Topic listener started");
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.triggered() => break,
            message = feed.next_message() => message,
        };
        let Some(message) = message else {
            info!(%topic, "Topic feed ended");
            break;
        };
        if let Err(e) = handler.handle(&message).await {
            warn!(
                %topic,
                sequence_number = message.sequence_number,
                error = %e,
                "Message handler failed"
            );
        }
    }
    debug!(%topic, "Topic listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, LedgerError};
    use crate::subscription::{handler_fn, HandlerError};
    use parking_lot::Mutex;
    use std::time::{Duration, UNIX_EPOCH};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn history_arrives_before_live_messages() {
        let ledger = Arc::new(InMemoryLedger::new());
        let id = ledger.create_topic("render jobs").unwrap();
        for body in ["h1", "h2", "h3"] {
            ledger.publish(&id, body.as_bytes().to_vec()).unwrap();
        }

        let shutdown = Arc::new(ShutdownCoordinator::new());
        let binder = SubscriptionBinder::new(ledger.clone(), shutdown.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = handler_fn(move |message| {
            let _ = tx.send(message.contents_utf8());
            Ok(())
        });

        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();
        binder.subscribe(&topic, UNIX_EPOCH, Arc::new(handler)).await.unwrap();
        ledger.publish(&id, b"live".to_vec()).unwrap();

        let mut received = Vec::new();
        for _ in 0..4 {
            received.push(rx.recv().await.unwrap());
        }
        assert_eq!(received, vec!["h1", "h2", "h3", "live"]);

        shutdown.request_shutdown().await.unwrap();
        assert_eq!(shutdown.active_tasks(), 0);
    }

    #[tokio::test]
    async fn handler_errors_do_not_stop_delivery() {
        let ledger = Arc::new(InMemoryLedger::new());
        let id = ledger.create_topic("jobs").unwrap();
        ledger.publish(&id, b"bad".to_vec()).unwrap();
        ledger.publish(&id, b"good".to_vec()).unwrap();

        let shutdown = Arc::new(ShutdownCoordinator::new());
        let binder = SubscriptionBinder::new(ledger.clone(), shutdown.clone());
        let accepted = Arc::new(Mutex::new(Vec::new()));
        let sink = accepted.clone();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let handler = handler_fn(move |message| {
            let _ = done_tx.send(());
            if message.contents == b"bad" {
                return Err(HandlerError::Rejected("bad job".into()));
            }
            sink.lock().push(message.sequence_number);
            Ok(())
        });

        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();
        binder.subscribe(&topic, UNIX_EPOCH, Arc::new(handler)).await.unwrap();
        done_rx.recv().await.unwrap();
        done_rx.recv().await.unwrap();

        assert_eq!(*accepted.lock(), vec![2]);
        shutdown.request_shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn subscribe_failure_is_returned_immediately() {
        let ledger = Arc::new(InMemoryLedger::new());
        let id = ledger.create_topic("jobs").unwrap();
        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();
        ledger.close();

        let shutdown = Arc::new(ShutdownCoordinator::new());
        let binder = SubscriptionBinder::new(ledger, shutdown.clone());
        let handler = handler_fn(|_| Ok(()));

        let err = binder
            .subscribe(&topic, UNIX_EPOCH, Arc::new(handler))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Ledger(LedgerError::Unreachable(_))));
        assert_eq!(shutdown.active_tasks(), 0);
    }

    #[tokio::test]
    async fn listener_exits_when_feed_ends() {
        let ledger = Arc::new(InMemoryLedger::new());
        let id = ledger.create_topic("jobs").unwrap();
        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();

        let shutdown = Arc::new(ShutdownCoordinator::new());
        let binder = SubscriptionBinder::new(ledger.clone(), shutdown.clone());
        binder
            .subscribe(&topic, UNIX_EPOCH, Arc::new(handler_fn(|_| Ok(()))))
            .await
            .unwrap();

        ledger.close();
        tokio::time::timeout(Duration::from_secs(5), async {
            while shutdown.active_tasks() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("listener should stop after the feed ends");
    }
}
