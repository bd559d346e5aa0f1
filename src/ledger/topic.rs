//! Consensus topic identifiers, handles and messages.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use super::LedgerError;

/// Address of a consensus topic, written as `shard.realm.num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl TopicId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for TopicId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidAddress(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u64, LedgerError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse::<u64>()
                .map_err(|_| invalid())
        };
        let id = TopicId::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(id)
    }
}

/// Snapshot of a topic's metadata as reported by the network.
///
/// A handle is immutable once resolved; resolving the same address again
/// yields a fresh snapshot with the current sequence number and running hash.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicHandle {
    pub id: TopicId,
    pub memo: String,
    pub created_at: SystemTime,
    /// Number of messages published on the topic so far.
    pub sequence_number: u64,
    pub running_hash: [u8; 32],
}

/// A single message delivered on a consensus topic.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMessage {
    pub topic: TopicId,
    /// 1-based position in the topic's total order.
    pub sequence_number: u64,
    pub consensus_timestamp: SystemTime,
    pub contents: Vec<u8>,
    pub running_hash: [u8; 32],
}

impl TopicMessage {
    /// Message contents as text, replacing invalid UTF-8.
    pub fn contents_utf8(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}
