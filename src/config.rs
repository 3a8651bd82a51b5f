//! Configuration for RespKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KvError, Result};

/// Main configuration for a RespKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Append-Only Log Configuration
    // -------------------------------------------------------------------------
    /// Path of the append-only command log
    pub aof_path: PathBuf,

    /// Sync strategy: how often to fsync the log
    pub sync_strategy: WalSyncStrategy,

    /// Cut off a partially written record at the end of the log during replay
    /// instead of failing startup
    pub repair_truncated_tail: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync from a background task on a fixed period
    Interval { period: Duration },
}

impl WalSyncStrategy {
    /// The default one-second background flush
    pub const fn every_second() -> Self {
        WalSyncStrategy::Interval {
            period: Duration::from_secs(1),
        }
    }
}

impl Default for WalSyncStrategy {
    fn default() -> Self {
        Self::every_second()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aof_path: PathBuf::from("database.aof"),
            sync_strategy: WalSyncStrategy::default(),
            repair_truncated_tail: false,
            listen_addr: "127.0.0.1:6379".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.aof_path.as_os_str().is_empty() {
            return Err(KvError::Config("aof_path must not be empty".to_string()));
        }
        if let WalSyncStrategy::Interval { period } = self.sync_strategy {
            if period.is_zero() {
                return Err(KvError::Config(
                    "sync interval must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the append-only log path
    pub fn aof_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.aof_path = path.into();
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Allow replay to drop a partially written final record
    pub fn repair_truncated_tail(mut self, repair: bool) -> Self {
        self.config.repair_truncated_tail = repair;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
