//! Moka store capacity metrics.
//!
//! Enable the `metrics` feature to use these metrics.
//!
//! ## Metrics
//!
//! - `routecache_moka_entries` - Current number of entries in the store (gauge)
//!
//! The metric carries a `store` label to distinguish between multiple Moka instances.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for store entry count gauge.
    pub static ref MOKA_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "routecache_moka_entries",
            "Current number of entries in the Moka store."
        );
        "routecache_moka_entries"
    };
}

/// Record the current entry count for the specified store.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(store: &str, entries: u64) {
    metrics::gauge!(*MOKA_ENTRIES, "store" => store.to_string()).set(entries as f64);
}

/// Record the current entry count (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_store: &str, _entries: u64) {}
