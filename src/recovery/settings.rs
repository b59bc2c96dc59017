//! Runtime-mutable recovery settings
//!
//! The command layer swaps a whole [`RecoverySettings`] snapshot; handlers
//! read one snapshot at the start of each call.

use crate::config::RecoveryConfig;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of the feature flag and forward target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoverySettings {
    pub enabled: bool,
    /// Recipient of every notice; `None` sends to the deletion chat
    pub forward_to: Option<String>,
}

impl From<&RecoveryConfig> for RecoverySettings {
    fn from(config: &RecoveryConfig) -> Self {
        Self {
            enabled: config.enabled,
            forward_to: config.forward_to.clone(),
        }
    }
}

/// Shared handle to the current settings snapshot
#[derive(Debug)]
pub struct SettingsHandle {
    current: RwLock<Arc<RecoverySettings>>,
}

impl SettingsHandle {
    pub fn new(initial: RecoverySettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn snapshot(&self) -> Arc<RecoverySettings> {
        Arc::clone(&self.current.read())
    }

    pub fn is_enabled(&self) -> bool {
        self.current.read().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|s| s.enabled = enabled);
        tracing::info!(enabled, "Message recovery toggled");
    }

    pub fn set_forward_target(&self, target: Option<String>) {
        let target = target.filter(|t| !t.trim().is_empty());
        tracing::info!(forward_to = ?target, "Recovery forward target updated");
        self.update(|s| s.forward_to = target);
    }

    fn update(&self, apply: impl FnOnce(&mut RecoverySettings)) {
        let mut current = self.current.write();
        let mut next = RecoverySettings::clone(&current);
        apply(&mut next);
        *current = Arc::new(next);
    }
}
