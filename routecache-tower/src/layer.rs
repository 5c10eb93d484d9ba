use http::header::HeaderName;
use routecache::RouteCache;
use tower::Layer;

use crate::headers::DEFAULT_CACHE_STATUS_HEADER;
use crate::service::RouteCacheService;

/// Tower [`Layer`] that puts a [`RouteCache`] in front of a route handler.
///
/// ```
/// use std::time::Duration;
/// use routecache::{AgePolicy, RouteCache, RouteConfig};
/// use routecache_moka::MokaStore;
/// use routecache_tower::RouteCacheLayer;
/// use tower::ServiceBuilder;
///
/// let cache = RouteCache::new(
///     RouteConfig::new("/users", AgePolicy::max_age(Duration::from_secs(30))),
///     MokaStore::builder(10_000).build(),
/// )
/// .unwrap();
///
/// let service = ServiceBuilder::new()
///     .layer(RouteCacheLayer::new(cache))
///     .service(tower::service_fn(|_req: http::Request<()>| async {
///         Ok::<_, std::convert::Infallible>(http::Response::new(http_body_util::Full::new(
///             bytes::Bytes::from("[]"),
///         )))
///     }));
/// # let _ = service;
/// ```
pub struct RouteCacheLayer<St> {
    cache: RouteCache<St>,
    status_header: HeaderName,
}

impl<St> Clone for RouteCacheLayer<St> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<St> RouteCacheLayer<St> {
    /// Creates the layer with the default `x-cache-status` header.
    pub fn new(cache: RouteCache<St>) -> Self {
        Self {
            cache,
            status_header: DEFAULT_CACHE_STATUS_HEADER,
        }
    }

    /// Changes the name of the cache status header.
    pub fn cache_status_header(mut self, name: HeaderName) -> Self {
        self.status_header = name;
        self
    }
}

impl<S, St> Layer<S> for RouteCacheLayer<St> {
    type Service = RouteCacheService<S, St>;

    fn layer(&self, upstream: S) -> Self::Service {
        RouteCacheService::new(upstream, self.cache.clone(), self.status_header.clone())
    }
}
