//! Tower middleware for the route response cache.
//!
//! This crate provides [`RouteCacheLayer`], a Tower [`Layer`] that serves
//! `GET` responses of one route from a [`RouteCache`], negotiating freshness
//! with the client's `Cache-Control` request headers.
//!
//! # Core Concepts
//!
//! - **[`RouteCacheLayer`]**: wraps a route handler. Build it from a
//!   validated [`RouteCache`].
//! - **[`RouteCacheService`]**: the wrapped service. Only `GET` requests
//!   reach the cache; every other method is passed through untouched.
//! - **[`CacheBody`]**: response body, either a buffered payload or the
//!   handler's own body.
//!
//! [`Layer`]: tower::Layer
//! [`RouteCache`]: routecache::RouteCache
//!
//! # Response Headers
//!
//! | Header | When |
//! |--------|------|
//! | `ETag` | Every hit, and every fresh response that was stored |
//! | `Warning: 110 - "Response is Stale"` | Hits that override a client directive |
//! | `x-cache-status` | Every `GET` on a cache-enabled route |
//!
//! Cache status values:
//!
//! | Value | Meaning |
//! |-------|---------|
//! | `HIT` | Response served from cache |
//! | `STALE` | Served from cache against the client's stated preference |
//! | `MISS` | Response produced by the handler |
//! | `REJECT` | `only-if-cached` with nothing usable; empty `200 OK` |
//!
//! The status header name can be changed with
//! [`RouteCacheLayer::cache_status_header`].

#![warn(missing_docs)]

/// Response body type.
pub mod body;
/// Header names, values and request header parsing.
pub mod headers;
/// Tower layer.
pub mod layer;
/// The Tower service implementation that performs caching.
pub mod service;

pub use ::http::{Method, StatusCode};
pub use body::CacheBody;
pub use headers::{CacheStatus, DEFAULT_CACHE_STATUS_HEADER};
pub use layer::RouteCacheLayer;
pub use service::RouteCacheService;
