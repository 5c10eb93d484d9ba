//! Cache key types and construction.
//!
//! A [`CacheKey`] is derived from the request's concrete path and its raw
//! query string. The query is normalized so that parameter order never
//! influences the key:
//!
//! 1. Parse the query into `(name, value)` pairs, keeping duplicates
//! 2. Sort by name, then by value
//! 3. Re-encode as `name=value&...`
//!
//! The route pattern the request matched travels with the key as a label
//! for metrics and eviction routing; it is not part of the identity.
//!
//! ## Format
//!
//! `{path}?{normalized query}`, or just `{path}` when there are no
//! parameters.
//!
//! ```
//! use routecache_core::CacheKey;
//!
//! let key = CacheKey::new("/users", "page=2&limit=10");
//! assert_eq!(key.to_string(), "/users?limit=10&page=2");
//!
//! let key = CacheKey::for_route("/users/{id}", "/users/7", "");
//! assert_eq!(key.to_string(), "/users/7");
//! assert_eq!(key.route(), "/users/{id}");
//!
//! // Repeated parameters are preserved and their values sorted.
//! let key = CacheKey::new("/tags", "t=b&t=a");
//! assert_eq!(key.to_string(), "/tags?t=a&t=b");
//! ```
//!
//! ## Performance
//!
//! [`CacheKey`] uses `Arc` internally for cheap cloning - copying a key
//! only increments a reference count rather than cloning the strings.

use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct CacheKeyInner {
    route: SmolStr,
    path: SmolStr,
    query: String,
}

/// A cache key identifying one cached representation of a resource.
///
/// Two requests for the same path with the same set of query parameters
/// (in any order) produce equal keys; a differing path or parameter value
/// produces a different key. Equality and hashing ignore the route label.
#[derive(Clone, Debug)]
pub struct CacheKey {
    inner: Arc<CacheKeyInner>,
}

impl CacheKey {
    /// Builds the key for a static route, where the path is the pattern.
    ///
    /// A leading `?` on `raw_query` is ignored.
    pub fn new(path: impl Into<SmolStr>, raw_query: &str) -> Self {
        let path = path.into();
        Self::for_route(path.clone(), path, raw_query)
    }

    /// Builds the key for a request to `path` that matched `route`.
    pub fn for_route(
        route: impl Into<SmolStr>,
        path: impl Into<SmolStr>,
        raw_query: &str,
    ) -> Self {
        let raw_query = raw_query.strip_prefix('?').unwrap_or(raw_query);
        CacheKey {
            inner: Arc::new(CacheKeyInner {
                route: route.into(),
                path: path.into(),
                query: normalize_query(raw_query),
            }),
        }
    }

    /// Returns the route pattern label.
    #[inline]
    pub fn route(&self) -> &str {
        &self.inner.route
    }

    /// Returns the concrete request path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Returns the normalized query part (empty when there are no parameters).
    #[inline]
    pub fn query(&self) -> &str {
        &self.inner.query
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.path == other.inner.path && self.inner.query == other.inner.query)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.path.hash(state);
        self.inner.query.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.query.is_empty() {
            write!(f, "{}", self.inner.path)
        } else {
            write!(f, "{}?{}", self.inner.path, self.inner.query)
        }
    }
}

/// Sorts query pairs by name, then value, and re-encodes them.
///
/// Re-encoding (instead of joining the decoded strings) keeps keys
/// unambiguous when values contain `&` or `=`. Input that cannot be parsed
/// is kept verbatim so that distinct raw queries never collapse into one key.
fn normalize_query(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<(String, String)> = match serde_urlencoded::from_str(raw) {
        Ok(pairs) => pairs,
        Err(_) => return raw.to_owned(),
    };
    pairs.sort();
    serde_urlencoded::to_string(&pairs).unwrap_or_else(|_| raw.to_owned())
}
