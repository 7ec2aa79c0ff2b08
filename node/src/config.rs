//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use stakelock_store::DEFAULT_CACHE_CAPACITY;
use stakelock_utils::LogFormat;

use crate::NodeError;

/// Configuration for a stake ledger node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum size of the LMDB memory map, in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Maximum number of named LMDB databases.
    #[serde(default = "default_lmdb_max_dbs")]
    pub lmdb_max_dbs: u32,

    /// Entries in the per-holder lookup cache.
    #[serde(default = "default_cache_capacity")]
    pub holder_cache_capacity: usize,

    /// Entries in the expiry-window lookup cache.
    #[serde(default = "default_cache_capacity")]
    pub range_cache_capacity: usize,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub auto_withdraw: AutoWithdrawSettings,
}

/// Automatic withdrawal of matured stakes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoWithdrawSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Fee attached to each withdrawal transaction, in mojo.
    #[serde(default)]
    pub tx_fee: u64,

    /// Stakes withdrawn per transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for AutoWithdrawSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            tx_fee: 0,
            batch_size: default_batch_size(),
        }
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./stakelock_data")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_lmdb_max_dbs() -> u32 {
    16
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    50
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.auto_withdraw.batch_size == 0 {
            return Err(NodeError::Config(
                "auto_withdraw.batch_size must be at least 1".to_string(),
            ));
        }
        // one stake table, five indexes, meta
        if self.lmdb_max_dbs < 7 {
            return Err(NodeError::Config(format!(
                "lmdb_max_dbs is {}, the ledger needs at least 7",
                self.lmdb_max_dbs
            )));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            lmdb_max_dbs: default_lmdb_max_dbs(),
            holder_cache_capacity: default_cache_capacity(),
            range_cache_capacity: default_cache_capacity(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            auto_withdraw: AutoWithdrawSettings::default(),
        }
    }
}
