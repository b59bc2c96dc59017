//! Recallbox configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default record time-to-live (24 hours)
pub const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;

/// Default sweep interval (10 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// Default target capacity in logical records
pub const DEFAULT_CAPACITY: usize = 5_000;

/// Main Recallbox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Archive store configuration
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Recovery behaviour configuration
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

/// Archive store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Maximum age of a cached message in seconds
    pub ttl_secs: u64,

    /// Interval between background sweeps in seconds
    pub sweep_interval_secs: u64,

    /// Target number of logical records kept in memory
    pub capacity: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ArchiveConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Recovery behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Whether archiving and recovery start enabled
    pub enabled: bool,

    /// Identity that receives every recovery notice (None = the chat where
    /// the deletion happened)
    #[serde(default)]
    pub forward_to: Option<String>,

    /// Custom notice header template.
    ///
    /// Supported placeholders: `{time}`, `{chat}`, `{deleter}`.
    #[serde(default)]
    pub notice_template: Option<String>,

    /// Chats that are never archived nor recovered
    #[serde(default = "default_ignored_chats")]
    pub ignored_chats: Vec<String>,
}

fn default_ignored_chats() -> Vec<String> {
    vec!["status@broadcast".to_string()]
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            forward_to: None,
            notice_template: None,
            ignored_chats: default_ignored_chats(),
        }
    }
}

impl RecallConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.archive.ttl_secs == 0 {
            return Err(Error::Config("archive.ttl_secs must be greater than 0".to_string()));
        }
        if self.archive.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "archive.sweep_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.archive.capacity == 0 {
            return Err(Error::Config("archive.capacity must be greater than 0".to_string()));
        }
        if let Some(target) = &self.recovery.forward_to {
            if target.trim().is_empty() {
                return Err(Error::Config(
                    "recovery.forward_to must not be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Default config file location (`<config dir>/recallbox/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join("recallbox").join("config.toml"))
    }
}
