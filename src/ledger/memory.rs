//! # In-Process Consensus Network
//!
//! [`InMemoryLedger`] is a complete [`LedgerClient`] that keeps every topic in
//! memory. It backs the `local` network mode of the node and is the network
//! the test suite runs against.
//!
//! It keeps the guarantees the orchestrator relies on from a real network:
//!
//! - Every topic has a single total order. Sequence numbers start at 1 and
//!   consensus timestamps strictly increase across the whole ledger.
//! - A subscription replays history (filtered by `since`) and then switches
//!   to live delivery with no gap and no duplicate, because the history
//!   snapshot and the live registration happen under the same lock.
//! - [`InMemoryLedger::close`] ends every open feed, the way a lost
//!   connection would.
//!
//! ```rust,ignore
//! let ledger = InMemoryLedger::new();
//! let id = ledger.create_topic("jobs")?;
//! ledger.publish(&id, b"hello".to_vec())?;
//!
//! let topic = ledger.resolve_topic(&id.to_string()).await?;
//! let mut feed = ledger.subscribe(&topic, UNIX_EPOCH).await?;
//! assert_eq!(feed.next_message().await.unwrap().contents, b"hello");
//! ```

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::{LedgerClient, LedgerError, TopicFeed, TopicHandle, TopicId, TopicMessage};

const DEFAULT_LIVE_CAPACITY: usize = 1024;

struct TopicState {
    handle: TopicHandle,
    messages: Vec<TopicMessage>,
    live: broadcast::Sender<TopicMessage>,
}

struct LedgerState {
    topics: HashMap<TopicId, TopicState>,
    next_topic_num: u64,
    last_timestamp: SystemTime,
    closed: bool,
}

/// A consensus network held entirely in process memory.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    live_capacity: usize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_live_capacity(DEFAULT_LIVE_CAPACITY)
    }

    /// Creates a ledger whose live feeds buffer at most `capacity` messages
    /// per topic for slow subscribers.
    pub fn with_live_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                topics: HashMap::new(),
                next_topic_num: 1,
                last_timestamp: UNIX_EPOCH,
                closed: false,
            }),
            live_capacity: capacity.max(1),
        }
    }

    /// Creates a topic with the next free number in shard 0, realm 0.
    pub fn create_topic(&self, memo: impl Into<String>) -> Result<TopicId, LedgerError> {
        let mut state = self.state.lock();
        let mut id = TopicId::new(0, 0, state.next_topic_num);
        while state.topics.contains_key(&id) {
            id.num += 1;
        }
        state.next_topic_num = id.num + 1;
        self.insert_topic(&mut state, id, memo.into())?;
        Ok(id)
    }

    /// Creates a topic at a fixed address, e.g. a well-known topic from the
    /// node configuration.
    pub fn create_topic_with_id(
        &self,
        id: TopicId,
        memo: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.topics.contains_key(&id) {
            return Err(LedgerError::TopicExists(id.to_string()));
        }
        self.insert_topic(&mut state, id, memo.into())
    }

    /// Returns true if a topic exists at this address.
    pub fn has_topic(&self, id: &TopicId) -> bool {
        self.state.lock().topics.contains_key(id)
    }

    /// Appends a message to a topic and delivers it to live subscribers.
    pub fn publish(&self, id: &TopicId, contents: Vec<u8>) -> Result<TopicMessage, LedgerError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LedgerError::Unreachable("ledger closed".to_string()));
        }
        let timestamp = next_timestamp(state.last_timestamp);
        let topic = state
            .topics
            .get_mut(id)
            .ok_or_else(|| LedgerError::TopicNotFound(id.to_string()))?;

        let sequence_number = topic.handle.sequence_number + 1;
        let running_hash = chain_hash(&topic.handle.running_hash, sequence_number, &contents);
        let message = TopicMessage {
            topic: *id,
            sequence_number,
            consensus_timestamp: timestamp,
            contents,
            running_hash,
        };

        topic.handle.sequence_number = sequence_number;
        topic.handle.running_hash = running_hash;
        topic.messages.push(message.clone());
        // No live subscribers is not an error.
        let _ = topic.live.send(message.clone());
        state.last_timestamp = timestamp;

        debug!(topic = %id, sequence_number, "Published");
        Ok(message)
    }

    /// Shuts the network down. Open feeds end once they have drained what was
    /// already delivered; later calls fail with [`LedgerError::Unreachable`].
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let topics = state.topics.len();
        state.topics.clear();
        info!(topics, "Ledger closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn insert_topic(
        &self,
        state: &mut LedgerState,
        id: TopicId,
        memo: String,
    ) -> Result<(), LedgerError> {
        if state.closed {
            return Err(LedgerError::Unreachable("ledger closed".to_string()));
        }
        let created_at = next_timestamp(state.last_timestamp);
        state.last_timestamp = created_at;
        let (live, _) = broadcast::channel(self.live_capacity);
        debug!(topic = %id, memo = %memo, "Topic created");
        state.topics.insert(
            id,
            TopicState {
                handle: TopicHandle {
                    id,
                    memo,
                    created_at,
                    sequence_number: 0,
                    running_hash: [0u8; 32],
                },
                messages: Vec::new(),
                live,
            },
        );
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn resolve_topic(&self, address: &str) -> Result<TopicHandle, LedgerError> {
        let id: TopicId = address.parse()?;
        let state = self.state.lock();
        if state.closed {
            return Err(LedgerError::Unreachable("ledger closed".to_string()));
        }
        state
            .topics
            .get(&id)
            .map(|topic| topic.handle.clone())
            .ok_or_else(|| LedgerError::TopicNotFound(address.to_string()))
    }

    async fn subscribe(
        &self,
        topic: &TopicHandle,
        since: SystemTime,
    ) -> Result<Box<dyn TopicFeed>, LedgerError> {
        let state = self.state.lock();
        if state.closed {
            return Err(LedgerError::Unreachable("ledger closed".to_string()));
        }
        let entry = state
            .topics
            .get(&topic.id)
            .ok_or_else(|| LedgerError::TopicNotFound(topic.id.to_string()))?;

        let backlog: VecDeque<TopicMessage> = entry
            .messages
            .iter()
            .filter(|message| message.consensus_timestamp >= since)
            .cloned()
            .collect();
        let live = entry.live.subscribe();
        debug!(topic = %topic.id, backlog = backlog.len(), "Subscribed");

        Ok(Box::new(MemoryFeed {
            topic: topic.id,
            since,
            backlog,
            live,
            last_sequence: 0,
        }))
    }
}

struct MemoryFeed {
    topic: TopicId,
    since: SystemTime,
    backlog: VecDeque<TopicMessage>,
    live: broadcast::Receiver<TopicMessage>,
    last_sequence: u64,
}

#[async_trait]
impl TopicFeed for MemoryFeed {
    async fn next_message(&mut self) -> Option<TopicMessage> {
        if let Some(message) = self.backlog.pop_front() {
            self.last_sequence = message.sequence_number;
            return Some(message);
        }
        loop {
            match self.live.recv().await {
                Ok(message) => {
                    if message.sequence_number <= self.last_sequence
                        || message.consensus_timestamp < self.since
                    {
                        continue;
                    }
                    self.last_sequence = message.sequence_number;
                    return Some(message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Feed lagged, messages dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

fn next_timestamp(last: SystemTime) -> SystemTime {
    let now = SystemTime::now();
    let floor = last + Duration::from_nanos(1);
    if now > floor {
        now
    } else {
        floor
    }
}

fn chain_hash(previous: &[u8; 32], sequence_number: u64, contents: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update(sequence_number.to_be_bytes());
    hasher.update(contents);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_history_then_delivers_live() {
        let ledger = InMemoryLedger::new();
        let id = ledger.create_topic("jobs").unwrap();
        for body in ["one", "two", "three"] {
            ledger.publish(&id, body.as_bytes().to_vec()).unwrap();
        }

        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();
        assert_eq!(topic.sequence_number, 3);
        let mut feed = ledger.subscribe(&topic, UNIX_EPOCH).await.unwrap();
        ledger.publish(&id, b"four".to_vec()).unwrap();

        let mut received = Vec::new();
        for _ in 0..4 {
            let message = feed.next_message().await.unwrap();
            received.push((message.sequence_number, message.contents_utf8()));
        }
        assert_eq!(
            received,
            vec![
                (1, "one".to_string()),
                (2, "two".to_string()),
                (3, "three".to_string()),
                (4, "four".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn since_filters_older_history() {
        let ledger = InMemoryLedger::new();
        let id = ledger.create_topic("jobs").unwrap();
        ledger.publish(&id, b"old".to_vec()).unwrap();
        let cutoff = ledger.publish(&id, b"new".to_vec()).unwrap().consensus_timestamp;

        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();
        let mut feed = ledger.subscribe(&topic, cutoff).await.unwrap();
        assert_eq!(feed.next_message().await.unwrap().contents_utf8(), "new");
    }

    #[tokio::test]
    async fn running_hash_chains_over_messages() {
        let ledger = InMemoryLedger::new();
        let id = ledger.create_topic("jobs").unwrap();
        let first = ledger.publish(&id, b"a".to_vec()).unwrap();
        let second = ledger.publish(&id, b"a".to_vec()).unwrap();
        assert_ne!(first.running_hash, second.running_hash);
        assert!(second.consensus_timestamp > first.consensus_timestamp);

        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();
        assert_eq!(topic.running_hash, second.running_hash);
    }

    #[tokio::test]
    async fn close_ends_feeds_and_rejects_calls() {
        let ledger = InMemoryLedger::new();
        let id = ledger.create_topic("jobs").unwrap();
        let topic = ledger.resolve_topic(&id.to_string()).await.unwrap();
        let mut feed = ledger.subscribe(&topic, UNIX_EPOCH).await.unwrap();

        ledger.close();
        assert!(feed.next_message().await.is_none());
        assert!(matches!(
            ledger.resolve_topic(&id.to_string()).await,
            Err(LedgerError::Unreachable(_))
        ));
        assert!(matches!(
            ledger.publish(&id, Vec::new()),
            Err(LedgerError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn unknown_topic_is_reported() {
        let ledger = InMemoryLedger::new();
        assert_eq!(
            ledger.resolve_topic("0.0.999").await,
            Err(LedgerError::TopicNotFound("0.0.999".to_string()))
        );
        assert!(matches!(
            ledger.create_topic_with_id(TopicId::new(0, 0, 5), "a")
                .and_then(|_| ledger.create_topic_with_id(TopicId::new(0, 0, 5), "b")),
            Err(LedgerError::TopicExists(_))
        ));
    }
}
