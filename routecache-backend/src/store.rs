use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use routecache_core::{CacheEntry, CacheKey, StoreLabel};

use crate::{DeleteStatus, StoreError};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key/value store with optional per-entry expiry.
///
/// Implementations must be safe to call concurrently from any task. A `get`
/// racing with an eviction of the same key returns either the old entry or a
/// clean miss, never a partially written one.
///
/// A backend failure is reported as `Err`; callers treat it like a miss for
/// availability but record it separately.
#[async_trait]
pub trait Store: Send + Sync {
    /// Looks up `key`. `Ok(None)` is a clean miss.
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry>>;

    /// Stores `entry` without expiry, replacing any previous entry.
    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> StoreResult<()>;

    /// Stores `entry`, replacing any previous entry, and removes it once
    /// `ttl` has elapsed from this call.
    async fn set_ttl(&self, key: &CacheKey, entry: CacheEntry, ttl: Duration)
    -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus>;

    /// Removes every key present before the call.
    ///
    /// Writes racing with the purge may survive it.
    async fn purge(&self) -> StoreResult<()>;

    /// Returns the label of this store for logs and metrics.
    fn label(&self) -> StoreLabel {
        StoreLabel::new_static("store")
    }
}

#[async_trait]
impl<S> Store for &S
where
    S: Store + ?Sized,
{
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> StoreResult<()> {
        (**self).set(key, entry).await
    }

    async fn set_ttl(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        ttl: Duration,
    ) -> StoreResult<()> {
        (**self).set_ttl(key, entry, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn purge(&self) -> StoreResult<()> {
        (**self).purge().await
    }

    fn label(&self) -> StoreLabel {
        (**self).label()
    }
}

#[async_trait]
impl<S> Store for Box<S>
where
    S: Store + ?Sized,
{
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> StoreResult<()> {
        (**self).set(key, entry).await
    }

    async fn set_ttl(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        ttl: Duration,
    ) -> StoreResult<()> {
        (**self).set_ttl(key, entry, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn purge(&self) -> StoreResult<()> {
        (**self).purge().await
    }

    fn label(&self) -> StoreLabel {
        (**self).label()
    }
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> StoreResult<()> {
        (**self).set(key, entry).await
    }

    async fn set_ttl(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        ttl: Duration,
    ) -> StoreResult<()> {
        (**self).set_ttl(key, entry, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn purge(&self) -> StoreResult<()> {
        (**self).purge().await
    }

    fn label(&self) -> StoreLabel {
        (**self).label()
    }
}
