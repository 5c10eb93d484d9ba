#![warn(missing_docs)]
//! # routecache-core
//!
//! Core types for the route-level HTTP response cache.
//!
//! This crate holds everything the cache decides **without** touching a
//! network or a storage engine:
//!
//! - **Identify** a cached representation ([`CacheKey`])
//! - **Describe** what is stored ([`CacheEntry`], with its content [`etag`])
//! - **Bound** freshness per route ([`AgePolicy`])
//! - **Read** what the client asked for ([`RequestCacheControl`])
//! - **Decide** whether an entry may be served ([`negotiate`], [`Outcome`])
//!
//! Storage contracts live in `routecache-backend`, orchestration in
//! `routecache` and the HTTP adapter in `routecache-tower`.
//!
//! ## Feature Flags
//!
//! - `test-helpers` - Enable [`time::MockTime`] for deterministic age tests
//!

pub mod cache_control;
pub mod entry;
pub mod freshness;
pub mod key;
pub mod label;
pub mod policy;
pub mod time;

pub use cache_control::RequestCacheControl;
pub use entry::{CacheEntry, etag};
pub use freshness::{Outcome, Override, Refresh, negotiate};
pub use key::CacheKey;
pub use label::StoreLabel;
pub use policy::AgePolicy;
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use time::{SystemTimeProvider, TimeProvider};

/// Raw byte payload of a cached response.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Payload = bytes::Bytes;
