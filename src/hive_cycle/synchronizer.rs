//! # Hive Cycle Synchronizer
//!
//! [`CycleSynchronizer`] is what the synchronization loop calls on every
//! iteration. [`HiveCycle`] is the node's implementation: it is bound as the
//! handler of the hive cycle synchronization topic and turns the
//! configuration announcements published there into history entries.
//!
//! ## Message Format
//!
//! ```json
//! {"cycle": 42, "duration": 60}
//! ```
//!
//! `duration` is the cycle length in whole seconds and must be non-zero.
//!
//! ## Flow
//!
//! 1. The topic listener calls [`HiveCycle::handle`] for each message. Valid
//!    announcements are queued; redelivered sequence numbers are ignored.
//! 2. The loop calls [`HiveCycle::synchronize`], which checks the topic on the
//!    ledger. If the ledger holds messages the listener has not delivered
//!    yet, they are read directly from the ledger first. Queued announcements
//!    with a newer cycle number then move into the [`ConfigurationHistory`].

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{ConfigurationHistory, CycleConfiguration, HiveCycleError};
use crate::ledger::{LedgerClient, TopicHandle, TopicMessage};
use crate::subscription::{HandlerError, MessageHandler};

/// Brings the local configuration history up to date with the network.
///
/// Called repeatedly by the synchronization loop while topic handlers may be
/// running. The history must only ever be appended to.
#[async_trait]
pub trait CycleSynchronizer: Send + Sync {
    async fn synchronize(
        &self,
        ledger: &dyn LedgerClient,
        history: &ConfigurationHistory,
    ) -> Result<(), HiveCycleError>;
}

#[derive(Debug, Deserialize)]
struct CycleAnnouncement {
    cycle: u64,
    duration: u64,
}

#[derive(Default)]
struct Inbox {
    pending: VecDeque<CycleConfiguration>,
    last_sequence: u64,
    last_timestamp: Option<SystemTime>,
}

/// Synchronizer fed by the hive cycle synchronization topic.
pub struct HiveCycle {
    topic_address: String,
    inbox: Mutex<Inbox>,
}

impl HiveCycle {
    pub fn new(topic_address: impl Into<String>) -> Self {
        Self {
            topic_address: topic_address.into(),
            inbox: Mutex::new(Inbox::default()),
        }
    }

    pub fn topic_address(&self) -> &str {
        &self.topic_address
    }

    /// Announcements received but not yet synchronized into the history.
    pub fn pending(&self) -> usize {
        self.inbox.lock().pending.len()
    }

    /// Highest topic sequence number seen so far.
    pub fn last_sequence(&self) -> u64 {
        self.inbox.lock().last_sequence
    }

    /// Reads `topic` from the last message seen until the sequence number
    /// the ledger reported. Messages the listener delivers meanwhile are
    /// deduplicated by `handle`.
    async fn catch_up(
        &self,
        ledger: &dyn LedgerClient,
        topic: &TopicHandle,
        since: SystemTime,
    ) -> Result<(), HiveCycleError> {
        let mut feed = ledger.subscribe(topic, since).await?;
        while self.last_sequence() < topic.sequence_number {
            let Some(message) = feed.next_message().await else {
                debug!(topic = %topic.id, "Feed ended before hive cycle caught up");
                break;
            };
            if let Err(e) = self.handle(&message).await {
                warn!(
                    sequence_number = message.sequence_number,
                    error = %e,
                    "Skipped hive cycle message"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for HiveCycle {
    async fn handle(&self, message: &TopicMessage) -> Result<(), HandlerError> {
        let mut inbox = self.inbox.lock();
        if message.sequence_number <= inbox.last_sequence {
            debug!(sequence_number = message.sequence_number, "Duplicate hive cycle message ignored");
            return Ok(());
        }
        inbox.last_sequence = message.sequence_number;
        inbox.last_timestamp = Some(message.consensus_timestamp);

        let announcement: CycleAnnouncement = serde_json::from_slice(&message.contents)
            .map_err(|e| HandlerError::Malformed(e.to_string()))?;
        if announcement.duration == 0 {
            return Err(HandlerError::Malformed(format!(
                "cycle {} has zero duration",
                announcement.cycle
            )));
        }

        debug!(
            cycle = announcement.cycle,
            duration_secs = announcement.duration,
            "Hive cycle announcement received"
        );
        inbox.pending.push_back(CycleConfiguration {
            cycle: announcement.cycle,
            duration: Duration::from_secs(announcement.duration),
            topic_sequence: Some(message.sequence_number),
            timestamp: Some(message.consensus_timestamp),
        });
        Ok(())
    }
}

#[async_trait]
impl CycleSynchronizer for HiveCycle {
    async fn synchronize(
        &self,
        ledger: &dyn LedgerClient,
        history: &ConfigurationHistory,
    ) -> Result<(), HiveCycleError> {
        let topic = ledger.resolve_topic(&self.topic_address).await?;

        let (seen_sequence, since) = {
            let inbox = self.inbox.lock();
            (inbox.last_sequence, inbox.last_timestamp)
        };
        if topic.sequence_number > seen_sequence {
            debug!(
                ledger_sequence = topic.sequence_number,
                seen_sequence,
                "Hive cycle feed behind ledger, catching up"
            );
            self.catch_up(ledger, &topic, since.unwrap_or(UNIX_EPOCH)).await?;
        }

        let pending: Vec<CycleConfiguration> = self.inbox.lock().pending.drain(..).collect();

        let mut latest_cycle = history.latest().map(|configuration| configuration.cycle);
        for configuration in pending {
            if latest_cycle.is_some_and(|latest| configuration.cycle <= latest) {
                debug!(cycle = configuration.cycle, "Stale hive cycle configuration skipped");
                continue;
            }
            latest_cycle = Some(configuration.cycle);
            info!(
                cycle = configuration.cycle,
                duration_secs = configuration.duration.as_secs(),
                "Hive cycle configuration updated"
            );
            history.append(configuration);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, LedgerError, TopicId};
    use std::time::SystemTime;

    fn message(sequence_number: u64, body: &str) -> TopicMessage {
        TopicMessage {
            topic: TopicId::new(0, 0, 7),
            sequence_number,
            consensus_timestamp: SystemTime::now(),
            contents: body.as_bytes().to_vec(),
            running_hash: [0u8; 32],
        }
    }

    fn ledger_with_topic() -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        ledger
            .create_topic_with_id(TopicId::new(0, 0, 7), "hive cycle synchronization")
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn queues_announcements_and_ignores_redelivery() {
        let hive_cycle = HiveCycle::new("0.0.7");
        hive_cycle.handle(&message(1, r#"{"cycle":1,"duration":10}"#)).await.unwrap();
        hive_cycle.handle(&message(1, r#"{"cycle":1,"duration":10}"#)).await.unwrap();
        hive_cycle.handle(&message(2, r#"{"cycle":2,"duration":50}"#)).await.unwrap();

        assert_eq!(hive_cycle.pending(), 2);
        assert_eq!(hive_cycle.last_sequence(), 2);
    }

    #[tokio::test]
    async fn rejects_malformed_announcements() {
        let hive_cycle = HiveCycle::new("0.0.7");
        assert!(matches!(
            hive_cycle.handle(&message(1, "not json")).await,
            Err(HandlerError::Malformed(_))
        ));
        assert!(matches!(
            hive_cycle.handle(&message(2, r#"{"cycle":3,"duration":0}"#)).await,
            Err(HandlerError::Malformed(_))
        ));
        assert_eq!(hive_cycle.pending(), 0);
        // A malformed message still advances the sequence.
        assert_eq!(hive_cycle.last_sequence(), 2);
    }

    #[tokio::test]
    async fn synchronize_appends_newer_cycles_in_order() {
        let ledger = ledger_with_topic();
        let history = ConfigurationHistory::new();
        history.append(CycleConfiguration::new(2, Duration::from_secs(10)));

        let hive_cycle = HiveCycle::new("0.0.7");
        hive_cycle.handle(&message(1, r#"{"cycle":2,"duration":99}"#)).await.unwrap();
        hive_cycle.handle(&message(2, r#"{"cycle":3,"duration":10}"#)).await.unwrap();
        hive_cycle.handle(&message(3, r#"{"cycle":4,"duration":50}"#)).await.unwrap();

        hive_cycle.synchronize(&ledger, &history).await.unwrap();

        let durations: Vec<u64> = history
            .snapshot()
            .iter()
            .map(|configuration| configuration.duration.as_secs())
            .collect();
        assert_eq!(durations, vec![10, 10, 50]);
        assert_eq!(history.latest().unwrap().topic_sequence, Some(3));
        assert_eq!(hive_cycle.pending(), 0);

        // Nothing new: history unchanged.
        hive_cycle.synchronize(&ledger, &history).await.unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn synchronize_reads_announcements_the_listener_has_not_delivered() {
        let ledger = ledger_with_topic();
        let id = TopicId::new(0, 0, 7);
        ledger.publish(&id, br#"{"cycle":1,"duration":60}"#.to_vec()).unwrap();
        ledger.publish(&id, b"garbage".to_vec()).unwrap();
        ledger.publish(&id, br#"{"cycle":2,"duration":30}"#.to_vec()).unwrap();

        let history = ConfigurationHistory::new();
        let hive_cycle = HiveCycle::new("0.0.7");
        hive_cycle.synchronize(&ledger, &history).await.unwrap();

        let cycles: Vec<u64> = history.snapshot().iter().map(|c| c.cycle).collect();
        assert_eq!(cycles, vec![1, 2]);
        assert_eq!(hive_cycle.last_sequence(), 3);

        // Later deliveries by the listener are recognised as already seen.
        let topic = ledger.resolve_topic("0.0.7").await.unwrap();
        let mut feed = ledger.subscribe(&topic, UNIX_EPOCH).await.unwrap();
        let first = feed.next_message().await.unwrap();
        hive_cycle.handle(&first).await.unwrap();
        assert_eq!(hive_cycle.pending(), 0);

        ledger.publish(&id, br#"{"cycle":3,"duration":20}"#.to_vec()).unwrap();
        hive_cycle.synchronize(&ledger, &history).await.unwrap();
        assert_eq!(history.latest().unwrap().cycle, 3);
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn ledger_failure_keeps_pending_announcements() {
        let ledger = InMemoryLedger::new();
        let history = ConfigurationHistory::new();
        let hive_cycle = HiveCycle::new("0.0.7");
        hive_cycle.handle(&message(1, r#"{"cycle":1,"duration":30}"#)).await.unwrap();

        let err = hive_cycle.synchronize(&ledger, &history).await.unwrap_err();
        assert_eq!(
            err,
            HiveCycleError::Ledger(LedgerError::TopicNotFound("0.0.7".to_string()))
        );
        assert!(history.is_empty());
        assert_eq!(hive_cycle.pending(), 1);

        ledger
            .create_topic_with_id(TopicId::new(0, 0, 7), "hive cycle synchronization")
            .unwrap();
        hive_cycle.synchronize(&ledger, &history).await.unwrap();
        assert_eq!(history.latest().unwrap().cycle, 1);
    }
}
