//! Builder for configuring [`MokaStore`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use routecache_backend::{EvictionCause, EvictionEvent, Listeners};
use routecache_core::{CacheKey, StoreLabel};

use crate::store::{MokaStore, Slot};

/// Expiration policy that reads the TTL each slot was written with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Expiration;

impl Expiry<CacheKey, Slot> for Expiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &Slot,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &Slot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // Always use the NEW slot's TTL, counted from the update.
        //
        // Moka's default `expire_after_update` returns `duration_until_expiry`,
        // which keeps the OLD expiration time of the replaced entry.
        value.ttl
    }
}

/// Builder for creating and configuring a [`MokaStore`].
///
/// Use [`MokaStore::builder`] to create a new builder instance.
///
/// ```
/// use routecache_moka::{EvictionPolicy, MokaStore};
///
/// let store = MokaStore::builder(10_000)
///     .label("sessions")
///     .eviction_policy(EvictionPolicy::lru())
///     .build();
/// ```
pub struct MokaStoreBuilder {
    max_entries: u64,
    label: StoreLabel,
    eviction_policy: EvictionPolicy,
}

impl MokaStoreBuilder {
    /// Creates a builder for a store holding at most `max_entries` entries.
    pub fn new(max_entries: u64) -> Self {
        Self {
            max_entries,
            label: StoreLabel::new_static("moka"),
            eviction_policy: EvictionPolicy::lru(),
        }
    }

    /// Sets a custom label for this store.
    pub fn label(mut self, label: impl Into<StoreLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Overrides the eviction policy (least-recently-used by default).
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Builds the store.
    pub fn build(self) -> MokaStore {
        let listeners = Listeners::new();
        let notify = listeners.clone();
        let cache = Cache::builder()
            .max_capacity(self.max_entries)
            .eviction_policy(self.eviction_policy)
            .expire_after(Expiration)
            .eviction_listener(move |key: Arc<CacheKey>, _slot: Slot, cause: RemovalCause| {
                let cause = match cause {
                    RemovalCause::Expired => EvictionCause::Expired,
                    RemovalCause::Size => EvictionCause::Capacity,
                    // Explicit removals and replacements are not evictions.
                    _ => return,
                };
                notify.notify(&EvictionEvent {
                    key: (*key).clone(),
                    cause,
                });
            })
            .build();

        MokaStore {
            cache,
            label: self.label,
            listeners,
        }
    }
}
