//! Node configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or no
//! file at all) yields a runnable local node.
//!
//! ```toml
//! network = "local"
//! smart_contract = "0.0.1000"
//!
//! [topics]
//! render_job_queue = "0.0.1001"
//! hive_cycle_synchronization = "0.0.1002"
//! hive_cycle_application = "0.0.1003"
//! hive_cycle_validation = "0.0.1004"
//!
//! [hive_cycle]
//! default_sync_interval_ms = 10000
//! genesis_duration_secs = 60
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::ledger::TopicId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which consensus network the node talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Testnet,
    Mainnet,
    /// In-process network, see [`InMemoryLedger`](crate::ledger::InMemoryLedger).
    #[default]
    Local,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkType::Testnet => "testnet",
            NetworkType::Mainnet => "mainnet",
            NetworkType::Local => "local",
        };
        f.write_str(name)
    }
}

/// Addresses of the well-known topics the node subscribes to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopicAddresses {
    pub render_job_queue: String,
    pub hive_cycle_synchronization: String,
    pub hive_cycle_application: String,
    pub hive_cycle_validation: String,
}

impl TopicAddresses {
    /// `(label, address)` pairs in subscription order.
    pub fn labelled(&self) -> [(&'static str, &str); 4] {
        [
            ("render job queue", self.render_job_queue.as_str()),
            ("hive cycle synchronization", self.hive_cycle_synchronization.as_str()),
            ("hive cycle application", self.hive_cycle_application.as_str()),
            ("hive cycle validation", self.hive_cycle_validation.as_str()),
        ]
    }
}

impl Default for TopicAddresses {
    fn default() -> Self {
        Self {
            render_job_queue: "0.0.1001".to_string(),
            hive_cycle_synchronization: "0.0.1002".to_string(),
            hive_cycle_application: "0.0.1003".to_string(),
            hive_cycle_validation: "0.0.1004".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HiveCycleSettings {
    /// Loop interval while no cycle configuration has been synchronized.
    pub default_sync_interval_ms: u64,
    /// Cycle length announced when a local network is provisioned.
    pub genesis_duration_secs: u64,
}

impl HiveCycleSettings {
    pub fn default_sync_interval(&self) -> Duration {
        Duration::from_millis(self.default_sync_interval_ms)
    }
}

impl Default for HiveCycleSettings {
    fn default() -> Self {
        Self {
            default_sync_interval_ms: 10_000,
            genesis_duration_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub network: NetworkType,
    pub smart_contract: String,
    pub topics: TopicAddresses,
    pub hive_cycle: HiveCycleSettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::default(),
            smart_contract: "0.0.1000".to_string(),
            topics: TopicAddresses::default(),
            hive_cycle: HiveCycleSettings::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads, parses and validates a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, address) in self.topics.labelled() {
            address
                .parse::<TopicId>()
                .map_err(|e| ConfigError::Invalid(format!("{label} topic: {e}")))?;
        }
        if self.hive_cycle.default_sync_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "hive_cycle.default_sync_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.hive_cycle.genesis_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "hive_cycle.genesis_duration_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.network, NetworkType::Local);
        assert_eq!(config.hive_cycle.default_sync_interval(), Duration::from_secs(10));
    }

    #[test]
    fn overrides_selected_fields() {
        let config = ServiceConfig::from_toml_str(
            r#"
            network = "testnet"

            [topics]
            hive_cycle_synchronization = "0.0.4242"

            [hive_cycle]
            default_sync_interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.network, NetworkType::Testnet);
        assert_eq!(config.topics.hive_cycle_synchronization, "0.0.4242");
        assert_eq!(config.topics.render_job_queue, "0.0.1001");
        assert_eq!(config.hive_cycle.default_sync_interval(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_topic_address() {
        let err = ServiceConfig::from_toml_str(
            r#"
            [topics]
            hive_cycle_validation = "not-a-topic"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("hive cycle validation")));
    }

    #[test]
    fn rejects_unknown_fields_and_zero_interval() {
        assert!(matches!(
            ServiceConfig::from_toml_str("colour = \"blue\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("[hive_cycle]\ndefault_sync_interval_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ServiceConfig::load(Path::new("/nonexistent/hive.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
