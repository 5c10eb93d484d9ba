//! Moka store implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use routecache_backend::{
    DeleteStatus, EvictionListener, EvictionSource, Listeners, Store, StoreResult,
};
use routecache_core::{CacheEntry, CacheKey, StoreLabel};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::builder::MokaStoreBuilder;

/// What Moka keeps per key: the entry plus the TTL it was written with.
#[derive(Clone, Debug)]
pub(crate) struct Slot {
    pub(crate) entry: CacheEntry,
    pub(crate) ttl: Option<Duration>,
}

/// Bounded in-process TTL store powered by Moka.
///
/// - **Capacity**: at most `max_entries`; inserting past it evicts the least
///   recently used entry.
/// - **Expiry**: per entry, counted from the `set_ttl` call that wrote it.
///   Expired entries are never returned, even before Moka's maintenance
///   removes them.
/// - **Concurrency**: lock-free reads, fine-grained locking for writes. A read
///   racing with an eviction sees the old entry or a miss.
///
/// Removals caused by expiry or capacity are reported to listeners
/// registered through [`EvictionSource::subscribe`]. Moka delivers them
/// during maintenance; call [`MokaStore::spawn_sweeper`] to run it
/// periodically.
///
/// ```
/// use routecache_moka::MokaStore;
///
/// let store = MokaStore::builder(10_000).build();
/// ```
#[derive(Clone)]
pub struct MokaStore {
    pub(crate) cache: Cache<CacheKey, Slot>,
    pub(crate) label: StoreLabel,
    pub(crate) listeners: Listeners,
}

impl std::fmt::Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("label", &self.label)
            .field("entries", &self.cache.entry_count())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl MokaStore {
    /// Creates a new builder for a store holding at most `max_entries` entries.
    pub fn builder(max_entries: u64) -> MokaStoreBuilder {
        MokaStoreBuilder::new(max_entries)
    }

    /// Returns whether `key` is present, without updating its recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Approximate number of entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance: applies recorded reads, evicts expired and
    /// over-capacity entries and delivers their eviction notifications.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Spawns the single periodic sweep task for this store.
    ///
    /// Every `interval` it runs pending maintenance so expirations are
    /// reported promptly, and publishes the entry count gauge. Abort the
    /// returned handle to stop it.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.run_pending_tasks().await;
                trace!(store = %store.label, entries = store.entry_count(), "Sweep finished");
                crate::metrics::record_capacity(store.label.as_str(), store.entry_count());
            }
        })
    }
}

#[async_trait]
impl Store for MokaStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry>> {
        Ok(self.cache.get(key).await.map(|slot| slot.entry))
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> StoreResult<()> {
        self.cache
            .insert(key.clone(), Slot { entry, ttl: None })
            .await;
        Ok(())
    }

    async fn set_ttl(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        ttl: Duration,
    ) -> StoreResult<()> {
        self.cache
            .insert(
                key.clone(),
                Slot {
                    entry,
                    ttl: Some(ttl),
                },
            )
            .await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        match self.cache.remove(key).await {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn purge(&self) -> StoreResult<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn label(&self) -> StoreLabel {
        self.label.clone()
    }
}

impl EvictionSource for MokaStore {
    fn subscribe(&self, listener: Arc<dyn EvictionListener>) {
        self.listeners.add(listener);
    }
}
