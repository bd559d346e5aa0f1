use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::TopicAddresses;
use crate::ledger::{InMemoryLedger, LedgerError, TopicId};
use crate::lifecycle::{Manager, ManagerError};

/// Provisions the well-known topics on an [`InMemoryLedger`] and shuts the
/// ledger down again on deinit.
///
/// Register it first so the topics exist before the session subscribes.
/// When the hive cycle synchronization topic is new, a first cycle with
/// `genesis_duration` is announced on it so the node has a cycle to follow.
pub struct LocalNetworkManager {
    ledger: Arc<InMemoryLedger>,
    topics: TopicAddresses,
    genesis_duration: Duration,
}

impl LocalNetworkManager {
    pub fn new(ledger: Arc<InMemoryLedger>, topics: TopicAddresses, genesis_duration: Duration) -> Self {
        Self {
            ledger,
            topics,
            genesis_duration,
        }
    }
}

fn unavailable(e: LedgerError) -> ManagerError {
    ManagerError::Unavailable(e.to_string())
}

#[async_trait]
impl Manager for LocalNetworkManager {
    fn name(&self) -> &str {
        "local network"
    }

    async fn init(&mut self) -> Result<(), ManagerError> {
        if self.ledger.is_closed() {
            return Err(ManagerError::Unavailable("local ledger already closed".to_string()));
        }
        for (label, address) in self.topics.labelled() {
            let id: TopicId = address
                .parse()
                .map_err(|e: LedgerError| ManagerError::Config(e.to_string()))?;
            if self.ledger.has_topic(&id) {
                debug!(topic = %id, label, "Topic already provisioned");
                continue;
            }
            self.ledger.create_topic_with_id(id, label).map_err(unavailable)?;

            if address == self.topics.hive_cycle_synchronization {
                let announcement = serde_json::json!({
                    "cycle": 1,
                    "duration": self.genesis_duration.as_secs(),
                });
                self.ledger
                    .publish(&id, announcement.to_string().into_bytes())
                    .map_err(unavailable)?;
                info!(
                    topic = %id,
                    duration_secs = self.genesis_duration.as_secs(),
                    "Announced genesis hive cycle"
                );
            }
        }
        info!("Local network provisioned");
        Ok(())
    }

    async fn deinit(&mut self) -> Result<(), ManagerError> {
        self.ledger.close();
        Ok(())
    }
}
