//! Configuration for the contribution ledger

use crate::{
    access::AccessPolicy,
    types::{Amount, ContributorId},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Persist records and policy to RocksDB
    pub persistence_enabled: bool,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Genesis access policy
    pub policy: PolicyConfig,

    /// Input bounds
    pub limits: LimitsConfig,

    /// Single-writer actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/contributions"),
            service_name: "contribution-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            persistence_enabled: true,
            rocksdb: RocksDBConfig::default(),
            policy: PolicyConfig::default(),
            limits: LimitsConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 2,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Access policy used when none has been persisted yet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Initial custodian identity
    pub custodian: String,

    /// Initial minimum value contribution
    pub minimum_contribution: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            custodian: "custodian".to_string(),
            minimum_contribution: 0,
        }
    }
}

impl PolicyConfig {
    /// As an access policy
    pub fn to_policy(&self) -> AccessPolicy {
        AccessPolicy {
            custodian: ContributorId::new(self.custodian.clone()),
            minimum_contribution: Amount::from(self.minimum_contribution),
        }
    }
}

/// Input bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum note length in bytes
    pub max_note_bytes: usize,

    /// Maximum notes per gasless batch
    pub max_batch_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_note_bytes: 1024,
            max_batch_size: 100,
        }
    }
}

/// Single-writer actor configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(custodian) = std::env::var("LEDGER_CUSTODIAN") {
            self.policy.custodian = custodian;
        }

        if let Ok(minimum) = std::env::var("LEDGER_MINIMUM_CONTRIBUTION") {
            self.policy.minimum_contribution = minimum.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_MINIMUM_CONTRIBUTION: {}", e))
            })?;
        }

        if let Ok(persistence) = std::env::var("LEDGER_PERSISTENCE") {
            self.persistence_enabled = persistence.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_PERSISTENCE: {}", e))
            })?;
        }

        Ok(self)
    }

    /// Check values that would make the ledger unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.policy.custodian.trim().is_empty() {
            return Err(crate::Error::Config("policy.custodian must not be empty".to_string()));
        }
        if self.limits.max_batch_size == 0 {
            return Err(crate::Error::Config("limits.max_batch_size must be positive".to_string()));
        }
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config("actor.mailbox_capacity must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "contribution-ledger");
        assert_eq!(config.limits.max_note_bytes, 1024);
        assert_eq!(config.limits.max_batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            persistence_enabled = false

            [policy]
            custodian = "alice"
            minimum_contribution = 100

            [limits]
            max_note_bytes = 64
            "#,
        )
        .unwrap();

        assert!(!config.persistence_enabled);
        assert_eq!(config.policy.to_policy().custodian, ContributorId::new("alice"));
        assert_eq!(config.policy.to_policy().minimum_contribution, 100);
        assert_eq!(config.limits.max_note_bytes, 64);
        assert_eq!(config.limits.max_batch_size, 100);
        assert_eq!(config.actor.mailbox_capacity, 1000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("limits = 3"),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_custodian() {
        let mut config = Config::default();
        config.policy.custodian = " ".to_string();
        assert!(config.validate().is_err());
    }
}
