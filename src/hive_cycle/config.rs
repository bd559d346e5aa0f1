use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

/// Parameters of one hive cycle as agreed on the synchronization topic.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfiguration {
    pub cycle: u64,
    /// Nominal length of the cycle.
    pub duration: Duration,
    /// Sequence number of the topic message that announced this cycle.
    pub topic_sequence: Option<u64>,
    /// Consensus timestamp of that message.
    pub timestamp: Option<SystemTime>,
}

impl CycleConfiguration {
    pub fn new(cycle: u64, duration: Duration) -> Self {
        Self {
            cycle,
            duration,
            topic_sequence: None,
            timestamp: None,
        }
    }
}

/// Append-only history of cycle configurations, most recent last.
///
/// Cloning yields another handle to the same history. Entries are never
/// modified or removed, so readers only ever need the latest one; an append
/// becomes visible to readers as a whole element.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationHistory {
    entries: Arc<RwLock<Vec<Arc<CycleConfiguration>>>>,
}

impl ConfigurationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a configuration and returns the new history length.
    pub fn append(&self, configuration: CycleConfiguration) -> usize {
        let mut entries = self.entries.write();
        entries.push(Arc::new(configuration));
        entries.len()
    }

    pub fn latest(&self) -> Option<Arc<CycleConfiguration>> {
        self.entries.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<CycleConfiguration>> {
        self.entries.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tracks_last_append() {
        let history = ConfigurationHistory::new();
        assert!(history.latest().is_none());

        history.append(CycleConfiguration::new(1, Duration::from_secs(10)));
        let reader = history.clone();
        assert_eq!(history.append(CycleConfiguration::new(2, Duration::from_secs(50))), 2);

        assert_eq!(reader.latest().unwrap().cycle, 2);
        let cycles: Vec<u64> = reader.snapshot().iter().map(|c| c.cycle).collect();
        assert_eq!(cycles, vec![1, 2]);
    }
}
