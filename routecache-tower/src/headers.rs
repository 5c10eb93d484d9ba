//! Header names, values and conversions used by the middleware.

use http::header::{CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue};
use routecache_core::{Outcome, RequestCacheControl};

/// Default header name for cache status (HIT/STALE/MISS/REJECT).
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// `Warning` value attached when a client directive was overridden.
pub const STALE_WARNING: HeaderValue = HeaderValue::from_static("110 - \"Response is Stale\"");

/// What the middleware did with a request, as reported in the status header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache.
    Hit,
    /// Served from the cache while overriding a client directive.
    Stale,
    /// Served by the handler.
    Miss,
    /// `only-if-cached` without a usable entry; answered empty.
    Reject,
}

impl CacheStatus {
    /// Status for a negotiated outcome.
    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::ServeFromCache => CacheStatus::Hit,
            Outcome::ServeFromCacheWithWarning(_) => CacheStatus::Stale,
            Outcome::ServeFresh(_) => CacheStatus::Miss,
            Outcome::Reject => CacheStatus::Reject,
        }
    }

    /// Header value.
    pub fn header_value(&self) -> HeaderValue {
        match self {
            CacheStatus::Hit => HeaderValue::from_static("HIT"),
            CacheStatus::Stale => HeaderValue::from_static("STALE"),
            CacheStatus::Miss => HeaderValue::from_static("MISS"),
            CacheStatus::Reject => HeaderValue::from_static("REJECT"),
        }
    }
}

/// Reads every `Cache-Control` header of a request.
///
/// Values that are not visible ASCII are skipped.
pub fn request_cache_control(headers: &HeaderMap) -> RequestCacheControl {
    RequestCacheControl::parse(
        headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    )
}
