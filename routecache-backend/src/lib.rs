#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod error;
pub mod eviction;
mod store;

pub use error::{StoreError, StoreOperation};
pub use eviction::{EvictionCause, EvictionEvent, EvictionListener, EvictionSource, Listeners};
pub use routecache_core::{CacheEntry, CacheKey, StoreLabel};
pub use store::{Store, StoreResult};

/// Status of deleting result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
