//! Engine configuration via `lockstep.toml`
//!
//! Every field has a default, so an empty file is a valid configuration.
//! The protocol is fixed for the lifetime of an engine: to switch it, build
//! a new `TxnProcessor`.

use lockstep_core::{CcMode, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "lockstep.toml";

/// Worker pool size used when none is configured.
pub const DEFAULT_WORKER_THREADS: usize = 8;

/// Number of keys seeded with value 0 when none is configured.
pub const DEFAULT_KEY_SPACE: u64 = 1_000_000;

/// Largest accepted `key_space`; every key is materialized up front.
pub const MAX_KEY_SPACE: u64 = 100_000_000;

/// Control thread idle wait used when none is configured, in microseconds.
pub const DEFAULT_IDLE_WAIT_US: u64 = 100;

/// Engine configuration loaded from `lockstep.toml`.
///
/// # Example
///
/// ```toml
/// # "serial", "locking_exclusive_only", "locking", "occ" or "mvcc"
/// mode = "occ"
/// worker_threads = 8
/// key_space = 1000000
/// idle_wait_us = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Concurrency-control protocol.
    #[serde(default)]
    pub mode: CcMode,
    /// Number of worker threads executing transaction bodies.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Keys `0..key_space` are pre-populated with value 0.
    #[serde(default = "default_key_space")]
    pub key_space: u64,
    /// How long the control thread blocks on empty queues before
    /// rechecking for shutdown.
    #[serde(default = "default_idle_wait_us")]
    pub idle_wait_us: u64,
}

fn default_worker_threads() -> usize {
    DEFAULT_WORKER_THREADS
}

fn default_key_space() -> u64 {
    DEFAULT_KEY_SPACE
}

fn default_idle_wait_us() -> u64 {
    DEFAULT_IDLE_WAIT_US
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: CcMode::default(),
            worker_threads: default_worker_threads(),
            key_space: default_key_space(),
            idle_wait_us: default_idle_wait_us(),
        }
    }
}

impl EngineConfig {
    /// Default configuration running `mode`.
    pub fn for_mode(mode: CcMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Control thread idle wait as a `Duration`.
    pub fn idle_wait(&self) -> Duration {
        Duration::from_micros(self.idle_wait_us)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `worker_threads`, `key_space` or
    /// `idle_wait_us` is zero, or if `key_space` exceeds `MAX_KEY_SPACE`.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.key_space == 0 {
            return Err(Error::InvalidConfig(
                "key_space must be at least 1".to_string(),
            ));
        }
        if self.key_space > MAX_KEY_SPACE {
            return Err(Error::InvalidConfig(format!(
                "key_space must be at most {}, got {}",
                MAX_KEY_SPACE, self.key_space
            )));
        }
        if self.idle_wait_us == 0 {
            return Err(Error::InvalidConfig(
                "idle_wait_us must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Lockstep engine configuration
#
# Concurrency-control protocol (default: "serial")
#   "serial"                 = one transaction at a time on the control thread
#   "locking_exclusive_only" = two-phase locking, exclusive locks only
#   "locking"                = two-phase locking with shared read locks
#   "occ"                    = optimistic execution, validated before commit
#   "mvcc"                   = multi-version timestamp ordering
mode = "serial"

# Worker threads executing transaction bodies (default: 8)
worker_threads = 8

# Keys 0..key_space are seeded with value 0 (default: 1000000)
key_space = 1000000

# Control thread idle wait in microseconds (default: 100)
idle_wait_us = 100
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and
    /// `Error::InvalidConfig` if it cannot be parsed or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
