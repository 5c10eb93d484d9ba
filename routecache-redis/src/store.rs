//! Redis store implementation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use redis::{Client, aio::ConnectionManager};
use routecache_backend::{DeleteStatus, Store, StoreError, StoreResult};
use routecache_core::{CacheEntry, CacheKey, StoreLabel};
use smol_str::SmolStr;
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::Error;

/// Hash fields of a stored entry.
const PAYLOAD: &str = "d";
const ETAG: &str = "e";
const STORED_AT: &str = "t";
const TTL: &str = "l";
const CONTENT_TYPE: &str = "c";

/// Keys scanned per `SCAN` round trip while purging.
const SCAN_BATCH: usize = 256;

/// Redis TTL store based on the redis-rs crate.
///
/// Each entry is a hash under `{prefix}{key}`. Writes replace the whole hash
/// in one `MULTI` transaction, so readers never observe a half-written entry.
/// Expiry is delegated to Redis (`PEXPIRE`), which means this store does not
/// report evictions.
///
/// The [`ConnectionManager`] is created lazily on first use and reconnects on
/// its own; an unreachable server surfaces as [`StoreError::ConnectionError`].
///
/// [`ConnectionManager`]: redis::aio::ConnectionManager
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    prefix: SmolStr,
    label: StoreLabel,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("label", &self.label)
            .finish()
    }
}

impl RedisStore {
    /// Create new store instance with default settings.
    ///
    /// # Examples
    /// ```no_run
    /// use routecache_redis::RedisStore;
    ///
    /// let store = RedisStore::new().unwrap();
    /// ```
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self::builder().build()?)
    }

    /// Creates new RedisStore builder with default settings.
    #[must_use]
    pub fn builder() -> RedisStoreBuilder {
        RedisStoreBuilder::default()
    }

    /// Create lazy connection to redis via [`ConnectionManager`]
    pub async fn connection(&self) -> Result<&ConnectionManager, StoreError> {
        trace!("Get connection manager");
        let manager = self
            .connection
            .get_or_try_init(|| {
                trace!("Initialize new redis connection manager");
                self.client.get_connection_manager()
            })
            .await
            .map_err(Error::from)?;
        Ok(manager)
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn write(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let mut con = self.connection().await?.clone();
        let redis_key = self.redis_key(key);

        let mut hset = redis::cmd("HSET");
        hset.arg(&redis_key)
            .arg(PAYLOAD)
            .arg(entry.payload().as_ref())
            .arg(ETAG)
            .arg(entry.etag())
            .arg(STORED_AT)
            .arg(entry.stored_at().timestamp_millis())
            .arg(TTL)
            .arg(entry.ttl().as_millis() as u64);
        if let Some(content_type) = entry.content_type() {
            hset.arg(CONTENT_TYPE).arg(content_type);
        }

        // DEL first: HSET merges fields, a write must replace the entry.
        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(&redis_key).ignore();
        pipe.add_command(hset).ignore();
        if let Some(ttl) = ttl {
            pipe.cmd("PEXPIRE")
                .arg(&redis_key)
                .arg(ttl.as_millis().max(1) as u64)
                .ignore();
        }

        pipe.query_async::<()>(&mut con)
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}

/// Part of builder pattern implementation for RedisStore.
pub struct RedisStoreBuilder {
    connection_info: String,
    prefix: SmolStr,
    label: StoreLabel,
}

impl Default for RedisStoreBuilder {
    fn default() -> Self {
        Self {
            connection_info: "redis://127.0.0.1/".to_owned(),
            prefix: SmolStr::new_static("routecache:"),
            label: StoreLabel::new_static("redis"),
        }
    }
}

impl RedisStoreBuilder {
    /// Set connection info (host, port, database, etc.) for RedisStore.
    pub fn server(mut self, connection_info: impl Into<String>) -> Self {
        self.connection_info = connection_info.into();
        self
    }

    /// Set the prefix every key is stored under.
    ///
    /// `purge` only removes keys with this prefix. An empty prefix makes
    /// `purge` flush the whole database.
    pub fn prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set a custom label for this store.
    pub fn label(mut self, label: impl Into<StoreLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Create new instance of Redis store with passed settings.
    pub fn build(self) -> Result<RedisStore, Error> {
        Ok(RedisStore {
            client: Client::open(self.connection_info)?,
            connection: OnceCell::new(),
            prefix: self.prefix,
            label: self.label,
        })
    }
}

type StoredFields = (
    Option<Vec<u8>>,
    Option<String>,
    Option<i64>,
    Option<u64>,
    Option<String>,
);

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CacheEntry>> {
        let mut con = self.connection().await?.clone();
        let redis_key = self.redis_key(key);

        let (payload, etag, stored_at, ttl, content_type): StoredFields = redis::cmd("HMGET")
            .arg(&redis_key)
            .arg(PAYLOAD)
            .arg(ETAG)
            .arg(STORED_AT)
            .arg(TTL)
            .arg(CONTENT_TYPE)
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;

        // No payload means the key doesn't exist (or already expired)
        let Some(payload) = payload else {
            return Ok(None);
        };
        let malformed = |reason| Error::Malformed {
            key: redis_key.clone(),
            reason,
        };
        let etag = etag.ok_or_else(|| malformed("missing etag"))?;
        let stored_at = stored_at
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| malformed("missing or invalid timestamp"))?;
        let ttl = Duration::from_millis(ttl.unwrap_or_default());

        Ok(Some(CacheEntry::from_parts(
            Bytes::from(payload),
            etag,
            stored_at,
            ttl,
            content_type.map(SmolStr::from),
        )))
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> StoreResult<()> {
        self.write(key, entry, None).await
    }

    async fn set_ttl(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        ttl: Duration,
    ) -> StoreResult<()> {
        self.write(key, entry, Some(ttl)).await
    }

    async fn remove(&self, key: &CacheKey) -> StoreResult<DeleteStatus> {
        let mut con = self.connection().await?.clone();

        let deleted: u32 = redis::cmd("DEL")
            .arg(self.redis_key(key))
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            Ok(DeleteStatus::Deleted(deleted))
        } else {
            Ok(DeleteStatus::Missing)
        }
    }

    async fn purge(&self) -> StoreResult<()> {
        let mut con = self.connection().await?.clone();

        if self.prefix.is_empty() {
            redis::cmd("FLUSHDB")
                .query_async::<()>(&mut con)
                .await
                .map_err(Error::from)?;
            return Ok(());
        }

        let pattern = format!("{}*", self.prefix);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut con)
                .await
                .map_err(Error::from)?;
            if !keys.is_empty() {
                trace!(count = keys.len(), "Purging keys");
                redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<()>(&mut con)
                    .await
                    .map_err(Error::from)?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(())
    }

    fn label(&self) -> StoreLabel {
        self.label.clone()
    }
}
