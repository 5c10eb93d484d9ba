#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Route and application cache configuration.
///
/// Provides [`RouteConfig`] (pattern, [`AgePolicy`], store timeout) and
/// [`CacheConfig`], both validated before use and loadable from YAML.
pub mod config;

/// Error types for the route cache API.
///
/// Defines [`CacheError`] which covers:
/// - Store errors raised by explicit maintenance calls
/// - Aggregated configuration errors ([`ConfigErrors`])
pub mod error;

/// Counters emitted by route caches.
///
/// When the `metrics` feature is enabled, [`MetricsRecorder`](metrics::MetricsRecorder)
/// reports additions, misses, hits, evictions and store errors per route
/// through the `metrics` facade.
pub mod metrics;

mod route;

pub use config::{CacheConfig, RouteConfig};
pub use error::{CacheError, ConfigError, ConfigErrors};
pub use route::RouteCache;

pub use routecache_backend::{DeleteStatus, Store, StoreError};
pub use routecache_core::{
    AgePolicy, CacheEntry, CacheKey, Outcome, Override, Refresh, RequestCacheControl,
};

/// The `routecache` prelude.
///
/// ```rust
/// use routecache::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{AgePolicy, CacheError, RouteCache, RouteConfig, Store};
}
