//! Per-route cache orchestration.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use routecache_backend::{
    DeleteStatus, EvictionEvent, EvictionSource, Store, StoreError, StoreOperation,
    StoreResult,
};
use routecache_core::{
    AgePolicy, CacheEntry, CacheKey, Outcome, Payload, Refresh, RequestCacheControl,
    SystemTimeProvider, TimeProvider, negotiate,
};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::config::RouteConfig;
use crate::error::{CacheError, ConfigErrors};
use crate::metrics::{Counter, MetricsRecorder, MetricsSink};

/// Cache attached to one route.
///
/// Combines a [`Store`], the route's [`AgePolicy`] and the freshness
/// negotiation into the two operations a request needs:
/// [`lookup`](Self::lookup) before the handler and [`store`](Self::store)
/// after it.
///
/// Store failures never escape these two operations. They are logged,
/// counted as [`Counter::StoreErrors`] and the request continues as if the
/// cache were empty.
///
/// Cloning is cheap; clones share the store and the metrics sink.
///
/// ```
/// use std::time::Duration;
/// use routecache::{RouteCache, RouteConfig};
/// use routecache_core::{AgePolicy, RequestCacheControl};
/// use routecache_moka::MokaStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = RouteConfig::new("/users", AgePolicy::max_age(Duration::from_secs(10)));
/// let cache = RouteCache::new(config, MokaStore::builder(1_000).build()).unwrap();
///
/// let key = cache.key("/users", "page=2");
/// let (entry, outcome) = cache.lookup(&key, &RequestCacheControl::default()).await;
/// assert!(entry.is_none() && !outcome.is_hit());
///
/// let stored = cache.store(&key, "[]".into(), None).await.unwrap();
/// let (entry, outcome) = cache.lookup(&key, &RequestCacheControl::default()).await;
/// assert!(outcome.is_hit());
/// assert_eq!(entry.unwrap().etag(), stored.etag());
/// # }
/// ```
pub struct RouteCache<S> {
    route: SmolStr,
    policy: AgePolicy,
    store_timeout: Option<Duration>,
    store: Arc<S>,
    metrics: Arc<dyn MetricsSink>,
    time: Arc<dyn TimeProvider>,
}

impl<S> Clone for RouteCache<S> {
    fn clone(&self) -> Self {
        Self {
            route: self.route.clone(),
            policy: self.policy,
            store_timeout: self.store_timeout,
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
            time: Arc::clone(&self.time),
        }
    }
}

impl<S> fmt::Debug for RouteCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteCache")
            .field("route", &self.route)
            .field("policy", &self.policy)
            .field("store_timeout", &self.store_timeout)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl<S> RouteCache<S>
where
    S: Store,
{
    /// Validates `config` and attaches `store` to the route.
    ///
    /// Counters go to [`MetricsRecorder`] and entries are stamped with the
    /// wall clock until replaced with [`with_metrics`](Self::with_metrics)
    /// and [`with_time_provider`](Self::with_time_provider).
    pub fn new(config: RouteConfig, store: S) -> Result<Self, ConfigErrors> {
        Self::with_shared_store(config, Arc::new(store))
    }

    /// Same as [`new`](Self::new) for a store shared with other routes.
    pub fn with_shared_store(config: RouteConfig, store: Arc<S>) -> Result<Self, ConfigErrors> {
        config.validate()?;
        Ok(Self {
            route: SmolStr::from(config.route),
            policy: config.policy,
            store_timeout: config.store_timeout,
            store,
            metrics: Arc::new(MetricsRecorder),
            time: Arc::new(SystemTimeProvider),
        })
    }

    /// Replaces the metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replaces the clock used to stamp entries and compute their age.
    pub fn with_time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    /// Route pattern this cache belongs to.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Freshness bounds of the route.
    pub fn policy(&self) -> &AgePolicy {
        &self.policy
    }

    /// Returns `false` when the route's policy disables caching.
    pub fn is_enabled(&self) -> bool {
        !self.policy.is_disabled()
    }

    /// Underlying store.
    pub fn backing_store(&self) -> &S {
        &self.store
    }

    /// Builds the key for a request to `path` matched by this route.
    pub fn key(&self, path: &str, raw_query: &str) -> CacheKey {
        CacheKey::for_route(self.route.clone(), path, raw_query)
    }

    /// Decides how to answer a request for `key`.
    ///
    /// Returns the stored entry only for hit outcomes. A store failure is
    /// answered with [`Outcome::ServeFresh`], whatever the client asked for.
    pub async fn lookup(
        &self,
        key: &CacheKey,
        rcc: &RequestCacheControl,
    ) -> (Option<CacheEntry>, Outcome) {
        if self.policy.is_disabled() {
            return (None, Outcome::ServeFresh(Refresh::Disabled));
        }

        let stored = match self.guarded(self.store.get(key)).await {
            Ok(stored) => stored,
            Err(error) => {
                self.report(StoreOperation::Get, key, &error);
                self.count(Counter::Misses);
                return (None, Outcome::ServeFresh(Refresh::Unavailable));
            }
        };

        let age = stored.as_ref().map(|entry| entry.age(self.time.now()));
        let outcome = negotiate(age, &self.policy, rcc);
        debug!(
            route = %self.route,
            key = %key,
            outcome = %outcome,
            age = ?age,
            "Cache lookup"
        );

        match outcome {
            Outcome::ServeFromCache | Outcome::ServeFromCacheWithWarning(_) => {
                self.count(Counter::Hits {
                    warning: outcome.warning().is_some(),
                });
                (stored, outcome)
            }
            Outcome::ServeFresh(_) => {
                self.count(Counter::Misses);
                (None, outcome)
            }
            // Nothing is served from the cache and nothing will be stored.
            Outcome::Reject => (None, outcome),
        }
    }

    /// Stores a fresh response for `key` with `policy.max` as TTL.
    ///
    /// Returns the written entry, or `None` when caching is disabled for the
    /// route or the store failed. Failures are logged and counted; the
    /// caller serves its response either way.
    pub async fn store(
        &self,
        key: &CacheKey,
        payload: Payload,
        content_type: Option<&str>,
    ) -> Option<CacheEntry> {
        if self.policy.is_disabled() {
            return None;
        }

        let ttl = self.policy.max;
        let mut entry = CacheEntry::new(payload, ttl, self.time.now());
        if let Some(content_type) = content_type {
            entry = entry.with_content_type(content_type);
        }

        match self
            .guarded(self.store.set_ttl(key, entry.clone(), ttl))
            .await
        {
            Ok(()) => {
                debug!(route = %self.route, key = %key, etag = entry.etag(), "Response stored");
                self.count(Counter::Additions);
                Some(entry)
            }
            Err(error) => {
                self.report(StoreOperation::Set, key, &error);
                None
            }
        }
    }

    /// Removes the entry stored for `key`.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<DeleteStatus, CacheError> {
        self.guarded(self.store.remove(key)).await.map_err(|error| {
            self.report(StoreOperation::Remove, key, &error);
            CacheError::from(error)
        })
    }

    /// Removes every entry of the underlying store.
    ///
    /// The store may be shared with other routes; their entries go too.
    pub async fn purge(&self) -> Result<(), CacheError> {
        match self.guarded(self.store.purge()).await {
            Ok(()) => {
                debug!(route = %self.route, "Store purged");
                Ok(())
            }
            Err(error) => {
                warn!(route = %self.route, operation = "purge", error = %error, "Store operation failed");
                self.count(Counter::StoreErrors(StoreOperation::Purge));
                Err(error.into())
            }
        }
    }

    /// Counts evictions reported by `source` for keys of this route.
    ///
    /// Call after [`with_metrics`](Self::with_metrics); the subscription
    /// keeps the sink that was current at the time of the call.
    pub fn observe<E>(&self, source: &E)
    where
        E: EvictionSource + ?Sized,
    {
        let route = self.route.clone();
        let metrics = Arc::clone(&self.metrics);
        source.subscribe(Arc::new(move |event: &EvictionEvent| {
            if event.key.route() == route.as_str() {
                metrics.increment(Counter::Evictions(event.cause), &route);
            }
        }));
    }

    async fn guarded<T, F>(&self, operation: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => operation.await,
        }
    }

    fn report(&self, operation: StoreOperation, key: &CacheKey, error: &StoreError) {
        warn!(
            route = %self.route,
            key = %key,
            operation = %operation,
            error = %error,
            "Store operation failed"
        );
        self.count(Counter::StoreErrors(operation));
    }

    #[inline]
    fn count(&self, counter: Counter) {
        self.metrics.increment(counter, &self.route);
    }
}
