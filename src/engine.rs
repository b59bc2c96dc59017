//! Recall engine
//!
//! Wires the archive store, the runtime settings, the correlator and the
//! dispatcher around one channel adapter, and pumps `ChannelEvent`s through
//! them.
//!
//! ```text
//! mpsc::Receiver<ChannelEvent>
//!          │  (one task per event)
//!          ▼
//!   RecallEngine::handle_event
//!          │
//!          ▼
//!   RevocationCorrelator ──► ArchiveStore ◄── sweeper task
//!          │                      ▲
//!          ▼                      │
//!   RecoveryDispatcher ───────────┘
//!          │
//!          ▼
//!   ChannelAdapter::send_message
//! ```

use crate::archive::ArchiveStore;
use crate::channels::{ChannelAdapter, ChannelEvent};
use crate::config::RecallConfig;
use crate::error::Result;
use crate::recovery::{
    DefaultNoticeFormatter, NoticeFormatter, RecallStats, RecoveryDispatcher, RecoveryOutcome,
    RecoverySettings, RevocationCorrelator, SettingsHandle, StatsSnapshot,
    TemplateNoticeFormatter,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Delete-recovery engine for one channel adapter
pub struct RecallEngine {
    config: RecallConfig,
    store: Arc<ArchiveStore>,
    settings: Arc<SettingsHandle>,
    stats: Arc<RecallStats>,
    correlator: RevocationCorrelator,
    adapter_name: String,
}

impl RecallEngine {
    /// Builder for an engine sending through `adapter`
    pub fn builder(adapter: Arc<dyn ChannelAdapter>) -> RecallEngineBuilder {
        RecallEngineBuilder::new(adapter)
    }

    /// Start the background sweeper
    pub fn start(&self) {
        self.store.spawn_sweeper();
        tracing::info!(
            channel = %self.adapter_name,
            ttl_secs = self.store.ttl().as_secs(),
            capacity = self.store.capacity(),
            enabled = self.is_enabled(),
            "Recall engine started"
        );
    }

    /// Stop the sweeper and drop every archived record
    pub fn stop(&self) {
        self.store.stop();
        tracing::info!(channel = %self.adapter_name, "Recall engine stopped");
    }

    /// Resume archiving and recovery. Idempotent.
    pub fn enable(&self) {
        if !self.settings.is_enabled() {
            self.settings.set_enabled(true);
        }
    }

    /// Pause archiving and recovery. Archived records are kept. Idempotent.
    pub fn disable(&self) {
        if self.settings.is_enabled() {
            self.settings.set_enabled(false);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.is_enabled()
    }

    /// Send every notice to `target` instead of the deletion chat; `None`
    /// restores the default
    pub fn set_forward_target(&self, target: Option<String>) {
        self.settings.set_forward_target(target);
    }

    pub fn forward_target(&self) -> Option<String> {
        self.settings.snapshot().forward_to.clone()
    }

    pub fn config(&self) -> &RecallConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ArchiveStore> {
        &self.store
    }

    /// Counters plus current archive occupancy
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            records: self.store.len(),
            index_entries: self.store.index_entries(),
            ..self.stats.snapshot()
        }
    }

    /// Process one inbound event
    pub async fn handle_event(&self, event: ChannelEvent) -> Vec<RecoveryOutcome> {
        match event {
            ChannelEvent::MessagesObserved { messages } => {
                tracing::trace!(count = messages.len(), "Observed batch");
                self.correlator.on_observed_batch(messages).await
            }
            ChannelEvent::MessagesUpdated { updates } => {
                tracing::trace!(count = updates.len(), "Update batch");
                self.correlator.on_update_batch(updates).await
            }
            ChannelEvent::Connected { channel } => {
                tracing::info!(channel = %channel, "Channel connected");
                Vec::new()
            }
            ChannelEvent::Disconnected { channel, reason } => {
                tracing::warn!(channel = %channel, reason = %reason, "Channel disconnected");
                Vec::new()
            }
        }
    }

    /// Pump events until the sender side closes. Each event is handled in
    /// its own task; this waits for all of them before returning.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ChannelEvent>) {
        let mut tasks = tokio::task::JoinSet::new();

        while let Some(event) = rx.recv().await {
            let engine = Arc::clone(&self);
            tasks.spawn(async move {
                engine.handle_event(event).await;
            });
            // Reap finished handlers so the set does not grow unbounded
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!("Event handler task failed: {}", e);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Event handler task failed: {}", e);
            }
        }
        tracing::debug!(channel = %self.adapter_name, "Event stream closed");
    }
}

/// Builder for [`RecallEngine`]
pub struct RecallEngineBuilder {
    adapter: Arc<dyn ChannelAdapter>,
    config: RecallConfig,
    formatter: Option<Arc<dyn NoticeFormatter>>,
}

impl RecallEngineBuilder {
    pub fn new(adapter: Arc<dyn ChannelAdapter>) -> Self {
        Self {
            adapter,
            config: RecallConfig::default(),
            formatter: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: RecallConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom notice header formatter. Takes precedence over
    /// `recovery.notice_template`.
    pub fn formatter(mut self, formatter: Arc<dyn NoticeFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Validate the configuration and build the engine. The sweeper is not
    /// running until [`RecallEngine::start`].
    pub fn build(self) -> Result<RecallEngine> {
        self.config.validate()?;

        let formatter = match (self.formatter, &self.config.recovery.notice_template) {
            (Some(formatter), _) => formatter,
            (None, Some(template)) => Arc::new(TemplateNoticeFormatter::new(template.as_str())),
            (None, None) => Arc::new(DefaultNoticeFormatter),
        };

        let store = Arc::new(ArchiveStore::from_config(&self.config.archive));
        let settings = Arc::new(SettingsHandle::new(RecoverySettings::from(
            &self.config.recovery,
        )));
        let stats = Arc::new(RecallStats::new());
        let adapter_name = self.adapter.name().to_string();

        let dispatcher = Arc::new(RecoveryDispatcher::new(
            Arc::clone(&store),
            self.adapter,
            formatter,
            Arc::clone(&settings),
            Arc::clone(&stats),
        ));
        let correlator = RevocationCorrelator::new(
            Arc::clone(&store),
            dispatcher,
            Arc::clone(&settings),
            self.config.recovery.ignored_chats.iter().cloned(),
            Arc::clone(&stats),
        );

        Ok(RecallEngine {
            config: self.config,
            store,
            settings,
            stats,
            correlator,
            adapter_name,
        })
    }
}
