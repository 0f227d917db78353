//! Runtime configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! [witness]
//! replicas = 3
//! publish_quorum = 3
//! read_quorum = 1
//! timeout_ms = 2000
//! require_agreement = false
//!
//! [batch]
//! interval_secs = 600
//!
//! [storage]
//! data_dir = "notary-data"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NotaryError, NotaryResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotaryConfig {
    pub witness: WitnessConfig,
    pub batch: BatchConfig,
    pub storage: StorageConfig,
}

/// Replication and liveness policy for witness logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WitnessConfig {
    /// Number of independent witness replicas (N).
    pub replicas: usize,
    /// Acknowledgements required before a batch counts as published (k of N).
    pub publish_quorum: usize,
    /// Replicas that must hold a batch for verification check 4.
    pub read_quorum: usize,
    /// Upper bound on any single witness round-trip.
    pub timeout_ms: u64,
    /// Fail check 4 if any reachable witness holds a conflicting header.
    pub require_agreement: bool,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self {
            replicas: 3,
            publish_quorum: 3,
            read_quorum: 1,
            timeout_ms: 2_000,
            require_agreement: false,
        }
    }
}

impl WitnessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Seconds between scheduled `batch_and_publish` runs.
    pub interval_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { interval_secs: 600 }
    }
}

impl BatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for `uploads/` and `witness_logs/` when file-backed.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("notary-data"),
        }
    }
}

impl NotaryConfig {
    /// Parse `s` as TOML and validate the result.
    pub fn from_toml_str(s: &str) -> NotaryResult<Self> {
        let config: NotaryConfig = toml::from_str(s).map_err(|e| NotaryError::ConfigError {
            reason: format!("failed to parse notary TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> NotaryResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| NotaryError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject quorums that can never be met and zero-length timers.
    pub fn validate(&self) -> NotaryResult<()> {
        let w = &self.witness;
        if w.replicas == 0 {
            return Err(NotaryError::ConfigError {
                reason: "witness.replicas must be at least 1".to_string(),
            });
        }
        for (name, quorum) in [("publish_quorum", w.publish_quorum), ("read_quorum", w.read_quorum)] {
            if quorum == 0 || quorum > w.replicas {
                return Err(NotaryError::ConfigError {
                    reason: format!(
                        "witness.{name} must be between 1 and {} (got {quorum})",
                        w.replicas
                    ),
                });
            }
        }
        if w.timeout_ms == 0 {
            return Err(NotaryError::ConfigError {
                reason: "witness.timeout_ms must be positive".to_string(),
            });
        }
        if self.batch.interval_secs == 0 {
            return Err(NotaryError::ConfigError {
                reason: "batch.interval_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}
