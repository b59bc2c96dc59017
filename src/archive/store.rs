//! Triple-indexed archive store with TTL expiry and batch eviction
//!
//! Records live in one arena addressed by a `u64` handle. The strict, loose
//! and id-only maps point at handles, so removing a record is one arena
//! removal plus three conditional map removals under the same lock.
//!
//! All operations are synchronous and never suspend; the background sweeper
//! takes the same lock as inserts and lookups.
//!
//! Records that share a loose or id-only key share one slot, and the newest
//! insert owns it. Removing that newest record clears the slot: an older
//! record with the same loose or id-only key stays reachable by its strict
//! key only.

use super::MessageIdentity;
use crate::channels::Envelope;
use crate::config::ArchiveConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Index entries (summed over the three maps) may reach this multiple of
/// the target capacity before a batch eviction runs.
pub const HIGH_WATER_MULTIPLIER: usize = 3;

/// Share of records evicted, oldest first, when the high-water mark is
/// exceeded.
pub const EVICTION_RATIO: f64 = 0.3;

/// A cached envelope. Immutable after insertion.
#[derive(Debug, Clone)]
pub struct ArchivedRecord {
    /// Identity the record was archived under
    pub identity: MessageIdentity,
    /// When the record entered the archive
    pub inserted_at: DateTime<Utc>,
    /// Envelope exactly as observed
    pub envelope: Envelope,
    /// Author of the archived message
    pub author_id: String,
}

type Handle = u64;

#[derive(Default)]
struct ArchiveInner {
    next_handle: Handle,
    records: HashMap<Handle, Arc<ArchivedRecord>>,
    strict: HashMap<String, Handle>,
    loose: HashMap<String, Handle>,
    by_id: HashMap<String, Handle>,
}

impl ArchiveInner {
    fn index_entries(&self) -> usize {
        self.strict.len() + self.loose.len() + self.by_id.len()
    }

    /// Drop a record from the arena and every map slot still pointing at it.
    fn remove_handle(&mut self, handle: Handle) -> Option<Arc<ArchivedRecord>> {
        let record = self.records.remove(&handle)?;
        let identity = &record.identity;
        remove_if_points(&mut self.strict, &identity.strict_key(), handle);
        remove_if_points(&mut self.loose, &identity.loose_key(), handle);
        remove_if_points(&mut self.by_id, &identity.id_key(), handle);
        Some(record)
    }

    fn evict_oldest(&mut self, count: usize) -> usize {
        let mut by_age: Vec<(DateTime<Utc>, Handle)> = self
            .records
            .iter()
            .map(|(handle, record)| (record.inserted_at, *handle))
            .collect();
        by_age.sort_unstable();

        by_age
            .into_iter()
            .take(count)
            .filter(|(_, handle)| self.remove_handle(*handle).is_some())
            .count()
    }

    fn clear(&mut self) {
        self.records.clear();
        self.strict.clear();
        self.loose.clear();
        self.by_id.clear();
    }
}

fn remove_if_points(map: &mut HashMap<String, Handle>, key: &str, handle: Handle) {
    if map.get(key) == Some(&handle) {
        map.remove(key);
    }
}

struct Sweeper {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Bounded, TTL-expiring message archive
pub struct ArchiveStore {
    inner: Mutex<ArchiveInner>,
    ttl: Duration,
    sweep_interval: Duration,
    capacity: usize,
    sweeper: Mutex<Option<Sweeper>>,
}

impl ArchiveStore {
    /// Create a store. `capacity` is the target number of logical records.
    pub fn new(ttl: Duration, sweep_interval: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ArchiveInner::default()),
            ttl,
            sweep_interval,
            capacity: capacity.max(1),
            sweeper: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.ttl(), config.sweep_interval(), config.capacity)
    }

    /// Archive an envelope observed now
    pub fn insert(&self, identity: MessageIdentity, envelope: Envelope, author_id: impl Into<String>) {
        self.insert_at(identity, envelope, author_id, Utc::now());
    }

    /// Archive an envelope with an explicit observation time.
    ///
    /// Re-inserting a strict key replaces that key's record; the loose and
    /// id-only slots are repointed at the newest record.
    pub fn insert_at(
        &self,
        identity: MessageIdentity,
        envelope: Envelope,
        author_id: impl Into<String>,
        inserted_at: DateTime<Utc>,
    ) {
        let strict = identity.strict_key();
        let loose = identity.loose_key();
        let by_id = identity.id_key();

        let mut inner = self.inner.lock();

        if let Some(previous) = inner.strict.get(&strict).copied() {
            inner.remove_handle(previous);
        }

        let handle = inner.next_handle;
        inner.next_handle += 1;

        let record = Arc::new(ArchivedRecord {
            identity,
            inserted_at,
            envelope,
            author_id: author_id.into(),
        });
        inner.records.insert(handle, record);
        inner.strict.insert(strict, handle);
        inner.loose.insert(loose, handle);
        inner.by_id.insert(by_id, handle);

        let high_water = self.capacity * HIGH_WATER_MULTIPLIER;
        if inner.index_entries() > high_water {
            let batch = ((inner.records.len() as f64 * EVICTION_RATIO).ceil() as usize).max(1);
            let evicted = inner.evict_oldest(batch);
            tracing::info!(
                evicted,
                remaining = inner.records.len(),
                index_entries = inner.index_entries(),
                "Archive over high-water mark, evicted oldest records"
            );
        }
    }

    /// Find a record by strict, then loose, then id-only key.
    ///
    /// An expired hit is purged from all indexes and reported as a miss.
    pub fn lookup(&self, identity: &MessageIdentity) -> Option<Arc<ArchivedRecord>> {
        let now = Utc::now();
        let mut inner = self.inner.lock();

        let handle = inner
            .strict
            .get(&identity.strict_key())
            .or_else(|| inner.loose.get(&identity.loose_key()))
            .or_else(|| inner.by_id.get(&identity.id_key()))
            .copied()?;

        let record = inner.records.get(&handle).cloned()?;
        if self.is_expired(&record, now) {
            inner.remove_handle(handle);
            tracing::debug!(message = %identity, "Archived record expired on lookup");
            return None;
        }

        Some(record)
    }

    /// Remove every record older than the TTL. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.lock();

        let expired: Vec<Handle> = inner
            .records
            .iter()
            .filter(|(_, record)| self.is_expired(record, now))
            .map(|(handle, _)| *handle)
            .collect();

        for handle in &expired {
            inner.remove_handle(*handle);
        }

        if !expired.is_empty() {
            tracing::debug!(
                removed = expired.len(),
                remaining = inner.records.len(),
                "Archive sweep removed expired records"
            );
        }

        expired.len()
    }

    /// Drop every record
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Start the periodic sweep task. Calling it again while a sweeper runs
    /// is a no-op.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let mut slot = self.sweeper.lock();
        if slot.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let store: Weak<Self> = Arc::downgrade(self);
        let interval = self.sweep_interval;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(store) = store.upgrade() else { break };
                        store.sweep();
                    }
                }
            }
            tracing::debug!("Archive sweeper stopped");
        });

        *slot = Some(Sweeper { cancel, task });
        tracing::debug!(interval_secs = interval.as_secs(), "Archive sweeper started");
    }

    /// Halt the sweeper and release all records
    pub fn stop(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.cancel.cancel();
            sweeper.task.abort();
        }
        self.clear();
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .map(|s| !s.task.is_finished())
            .unwrap_or(false)
    }

    /// Number of logical records
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries summed across the strict, loose and id-only maps
    pub fn index_entries(&self) -> usize {
        self.inner.lock().index_entries()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, record: &ArchivedRecord, now: DateTime<Utc>) -> bool {
        // Negative ages (clock skew on replayed timestamps) never expire
        (now - record.inserted_at)
            .to_std()
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }
}

impl Drop for ArchiveStore {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.cancel.cancel();
        }
    }
}
