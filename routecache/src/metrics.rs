//! Counters reported by route caches.
//!
//! A [`RouteCache`](crate::RouteCache) only needs to increment labeled
//! counters, so the dependency is the narrow [`MetricsSink`] trait. Two sinks
//! ship with the crate:
//!
//! - [`MetricsRecorder`] forwards to the [`metrics`](https://docs.rs/metrics)
//!   facade when the `metrics` feature is enabled and does nothing otherwise.
//! - [`InMemoryMetrics`] keeps the counts in process, for tests and for
//!   applications that expose them on their own.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use routecache_backend::{EvictionCause, StoreOperation};
use smol_str::SmolStr;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of entries written to the store.
    pub static ref CACHE_ADDITIONS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "routecache_additions_total",
            "Total number of responses stored in the cache."
        );
        "routecache_additions_total"
    };
    /// Track number of lookups that found no entry.
    pub static ref CACHE_MISSES_COUNTER: &'static str = {
        metrics::describe_counter!(
            "routecache_misses_total",
            "Total number of cache lookups without a stored entry."
        );
        "routecache_misses_total"
    };
    /// Track number of lookups served from the cache.
    pub static ref CACHE_HITS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "routecache_hits_total",
            "Total number of responses served from the cache."
        );
        "routecache_hits_total"
    };
    /// Track number of entries evicted or superseded.
    pub static ref CACHE_EVICTIONS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "routecache_evictions_total",
            "Total number of cache entries evicted, expired or superseded."
        );
        "routecache_evictions_total"
    };
    /// Track number of failed store calls.
    pub static ref CACHE_STORE_ERRORS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "routecache_store_errors_total",
            "Total number of failed store operations."
        );
        "routecache_store_errors_total"
    };
}

/// A counter a route cache increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// A fresh response was written to the store.
    Additions,
    /// A lookup sent the request to the handler: no entry, an entry too old
    /// or refused by the client, or an unreadable store.
    Misses,
    /// A stored entry was served. `warning` is set when a client directive
    /// was overridden to serve it.
    Hits {
        /// Served with a `Warning` header.
        warning: bool,
    },
    /// The store reported removing an entry of the route.
    Evictions(EvictionCause),
    /// A store call failed or timed out.
    StoreErrors(StoreOperation),
}

impl Counter {
    /// Metric name without labels.
    pub fn name(&self) -> &'static str {
        match self {
            Counter::Additions => "additions",
            Counter::Misses => "misses",
            Counter::Hits { .. } => "hits",
            Counter::Evictions(_) => "evictions",
            Counter::StoreErrors(_) => "store_errors",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counter::Hits { warning: true } => write!(f, "{}{{warning}}", self.name()),
            Counter::Evictions(cause) => write!(f, "{}{{{cause}}}", self.name()),
            Counter::StoreErrors(operation) => write!(f, "{}{{{operation}}}", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Receiver of route cache counters.
pub trait MetricsSink: Send + Sync {
    /// Adds one to `counter` for `route`.
    fn increment(&self, counter: Counter, route: &str);
}

/// Sink backed by the `metrics` facade.
///
/// Without the `metrics` feature every call compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

#[cfg(feature = "metrics")]
impl MetricsSink for MetricsRecorder {
    fn increment(&self, counter: Counter, route: &str) {
        let route = route.to_owned();
        match counter {
            Counter::Additions => {
                metrics::counter!(*CACHE_ADDITIONS_COUNTER, "route" => route).increment(1)
            }
            Counter::Misses => {
                metrics::counter!(*CACHE_MISSES_COUNTER, "route" => route).increment(1)
            }
            Counter::Hits { warning } => metrics::counter!(
                *CACHE_HITS_COUNTER,
                "route" => route,
                "warning" => if warning { "true" } else { "false" }
            )
            .increment(1),
            Counter::Evictions(cause) => metrics::counter!(
                *CACHE_EVICTIONS_COUNTER,
                "route" => route,
                "cause" => cause.as_str()
            )
            .increment(1),
            Counter::StoreErrors(operation) => metrics::counter!(
                *CACHE_STORE_ERRORS_COUNTER,
                "route" => route,
                "operation" => operation.as_str()
            )
            .increment(1),
        }
    }
}

#[cfg(not(feature = "metrics"))]
impl MetricsSink for MetricsRecorder {
    #[inline]
    fn increment(&self, _counter: Counter, _route: &str) {}
}

/// In-process counters, readable at any time.
///
/// ```
/// use routecache::metrics::{Counter, InMemoryMetrics, MetricsSink};
///
/// let metrics = InMemoryMetrics::new();
/// metrics.increment(Counter::Misses, "/users");
/// metrics.increment(Counter::Misses, "/users");
///
/// assert_eq!(metrics.get(Counter::Misses, "/users"), 2);
/// assert_eq!(metrics.get(Counter::Misses, "/orders"), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: DashMap<(Counter, SmolStr), AtomicU64>,
}

impl InMemoryMetrics {
    /// Creates an empty set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `counter` for `route`.
    pub fn get(&self, counter: Counter, route: &str) -> u64 {
        self.counters
            .get(&(counter, SmolStr::new(route)))
            .map_or(0, |value| value.load(Ordering::Relaxed))
    }

    /// Hits for `route`, with and without warning.
    pub fn hits(&self, route: &str) -> u64 {
        self.get(Counter::Hits { warning: false }, route)
            + self.get(Counter::Hits { warning: true }, route)
    }

    /// Evictions for `route`, whatever the cause.
    pub fn evictions(&self, route: &str) -> u64 {
        [EvictionCause::Expired, EvictionCause::Capacity]
            .into_iter()
            .map(|cause| self.get(Counter::Evictions(cause), route))
            .sum()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, counter: Counter, route: &str) {
        if let Some(value) = self.counters.get(&(counter, SmolStr::new(route))) {
            value.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry((counter, SmolStr::new(route)))
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl<T: MetricsSink + ?Sized> MetricsSink for std::sync::Arc<T> {
    fn increment(&self, counter: Counter, route: &str) {
        (**self).increment(counter, route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_route_and_label() {
        let metrics = InMemoryMetrics::new();
        metrics.increment(Counter::Hits { warning: false }, "/a");
        metrics.increment(Counter::Hits { warning: true }, "/a");
        metrics.increment(Counter::Evictions(EvictionCause::Capacity), "/a");
        metrics.increment(Counter::Evictions(EvictionCause::Expired), "/b");

        assert_eq!(metrics.hits("/a"), 2);
        assert_eq!(metrics.get(Counter::Hits { warning: true }, "/a"), 1);
        assert_eq!(metrics.evictions("/a"), 1);
        assert_eq!(metrics.evictions("/b"), 1);
        assert_eq!(metrics.hits("/b"), 0);
    }

    #[test]
    fn test_counter_display() {
        assert_eq!(Counter::Additions.to_string(), "additions");
        assert_eq!(
            Counter::Evictions(EvictionCause::Expired).to_string(),
            "evictions{expired}"
        );
        assert_eq!(
            Counter::StoreErrors(StoreOperation::Get).to_string(),
            "store_errors{get}"
        );
    }

    #[test]
    fn test_recorder_accepts_every_counter() {
        let recorder = MetricsRecorder;
        recorder.increment(Counter::Additions, "/r");
        recorder.increment(Counter::StoreErrors(StoreOperation::Purge), "/r");
    }
}
