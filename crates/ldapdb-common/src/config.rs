//! Configuration types for ldapdb
//!
//! This module defines configuration structures used across components.
//! Every field has a default so a partial (or absent) config file works.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for ldapdb
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend configuration
    pub backend: BackendConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// How worker processes share the directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// One process holds the directory in RAM; the snapshot is read at
    /// startup and written at orderly shutdown
    Memory,
    /// Every process caches the snapshot and revalidates it per operation;
    /// writes are serialized through the lock file
    #[default]
    File,
}

/// Backend configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Deployment shape
    pub mode: BackendMode,
    /// Path of the persisted snapshot
    pub snapshot_path: PathBuf,
    /// Path of the lock file (default: snapshot path + ".lock")
    pub lock_path: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            snapshot_path: PathBuf::from("ldapdb.json"),
            lock_path: None,
        }
    }
}

impl BackendConfig {
    /// Resolved lock file path
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.lock_path
            .clone()
            .unwrap_or_else(|| default_lock_path(&self.snapshot_path))
    }
}

/// Lock file path derived from a snapshot path
#[must_use]
pub fn default_lock_path(snapshot_path: &std::path::Path) -> PathBuf {
    let mut name = snapshot_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
