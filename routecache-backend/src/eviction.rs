//! Eviction notifications.
//!
//! Bounded stores remove entries on their own: when a TTL elapses or when an
//! insert would exceed capacity. Those removals are reported to subscribed
//! [`EvictionListener`]s so that route caches can count them.
//!
//! Stores that cannot observe their own removals (e.g. a remote store relying
//! on server-side expiry) simply do not implement [`EvictionSource`].

use std::fmt;
use std::sync::{Arc, RwLock};

use routecache_core::CacheKey;
use tracing::trace;

/// Why the store removed an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionCause {
    /// The entry's TTL elapsed.
    Expired,
    /// The entry was the least recently used one when capacity ran out.
    Capacity,
}

impl EvictionCause {
    /// Lowercase cause name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionCause::Expired => "expired",
            EvictionCause::Capacity => "capacity",
        }
    }
}

impl fmt::Display for EvictionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionEvent {
    /// Key of the removed entry.
    pub key: CacheKey,
    /// Why it was removed.
    pub cause: EvictionCause,
}

/// Receives eviction events.
///
/// Called synchronously from the store's maintenance path, so implementations
/// must be cheap and must not block.
pub trait EvictionListener: Send + Sync {
    /// Handles one eviction.
    fn on_eviction(&self, event: &EvictionEvent);
}

impl<F> EvictionListener for F
where
    F: Fn(&EvictionEvent) + Send + Sync,
{
    fn on_eviction(&self, event: &EvictionEvent) {
        self(event)
    }
}

/// A store that reports its own evictions.
pub trait EvictionSource {
    /// Registers `listener` for every future eviction.
    fn subscribe(&self, listener: Arc<dyn EvictionListener>);
}

/// Shared, clonable list of listeners.
///
/// Stores hand a clone to their storage engine's callback at build time and
/// append to it whenever somebody subscribes later.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<RwLock<Vec<Arc<dyn EvictionListener>>>>,
}

impl Listeners {
    /// Creates an empty listener list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener.
    pub fn add(&self, listener: Arc<dyn EvictionListener>) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    /// Delivers `event` to every listener.
    pub fn notify(&self, event: &EvictionEvent) {
        trace!(key = %event.key, cause = %event.cause, "Entry evicted");
        let listeners = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for listener in listeners.iter() {
            listener.on_eviction(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns `true` when nobody listens.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}
