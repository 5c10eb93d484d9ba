//! Request/response behavior of the cache middleware.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, WARNING};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use routecache::metrics::{Counter, InMemoryMetrics};
use routecache::{AgePolicy, RouteCache, RouteConfig};
use routecache_backend::{
    CacheEntry, CacheKey, DeleteStatus, Store, StoreError, StoreOperation, StoreResult,
};
use routecache_core::time::MockTime;
use routecache_moka::MokaStore;
use routecache_tower::{CacheBody, DEFAULT_CACHE_STATUS_HEADER, RouteCacheLayer};
use tower::{Layer, Service, ServiceExt, service_fn};

const ROUTE: &str = "/users";

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

/// Upstream that counts its calls and answers with the call number.
#[derive(Clone, Default)]
struct Upstream {
    calls: Arc<AtomicUsize>,
}

impl Upstream {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn service(
        &self,
        status: StatusCode,
    ) -> impl Service<
        Request<()>,
        Response = Response<Full<Bytes>>,
        Error = Infallible,
        Future = impl Send,
    > + Clone
           + Send
           + 'static {
        let calls = self.calls.clone();
        service_fn(move |_req: Request<()>| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                let mut response = Response::new(Full::new(Bytes::from(format!("response {n}"))));
                *response.status_mut() = status;
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                Ok::<_, Infallible>(response)
            }
        })
    }
}

fn get(uri: &str, cache_control: Option<&'static str>) -> Request<()> {
    let mut builder = Request::get(uri);
    if let Some(value) = cache_control {
        builder = builder.header(CACHE_CONTROL, value);
    }
    builder.body(()).unwrap()
}

async fn body_of(response: Response<CacheBody<Full<Bytes>>>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn header<'a>(response: &'a Response<CacheBody<Full<Bytes>>>, name: &http::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn route_cache(policy: AgePolicy) -> (RouteCache<MokaStore>, Arc<InMemoryMetrics>, MockTime) {
    let metrics = Arc::new(InMemoryMetrics::new());
    let clock = MockTime::new();
    let cache = RouteCache::new(RouteConfig::new(ROUTE, policy), MokaStore::builder(100).build())
        .unwrap()
        .with_metrics(metrics.clone())
        .with_time_provider(Arc::new(clock.clone()));
    (cache, metrics, clock)
}

#[tokio::test]
async fn test_second_get_is_served_from_cache() {
    let (cache, metrics, clock) = route_cache(AgePolicy::max_age(secs(10)));
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    let first = service.clone().oneshot(get("/users?page=1", None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, &DEFAULT_CACHE_STATUS_HEADER), Some("MISS"));
    let etag = header(&first, &ETAG).expect("stored response carries an etag").to_owned();
    assert_eq!(body_of(first).await.as_ref(), b"response 1");

    clock.advance_secs(5);
    let second = service.clone().oneshot(get("/users?page=1", None)).await.unwrap();
    assert_eq!(header(&second, &DEFAULT_CACHE_STATUS_HEADER), Some("HIT"));
    assert_eq!(header(&second, &ETAG), Some(etag.as_str()));
    assert_eq!(header(&second, &CONTENT_TYPE), Some("text/plain"));
    assert!(second.headers().get(WARNING).is_none());
    assert_eq!(body_of(second).await.as_ref(), b"response 1");

    assert_eq!(upstream.calls(), 1);
    assert_eq!(metrics.get(Counter::Additions, ROUTE), 1);
    assert_eq!(metrics.hits(ROUTE), 1);
}

#[tokio::test]
async fn test_get_after_max_age_calls_handler_again() {
    let (cache, _, clock) = route_cache(AgePolicy::max_age(secs(10)));
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    let first = service.clone().oneshot(get("/users", None)).await.unwrap();
    let etag1 = header(&first, &ETAG).map(str::to_owned);

    clock.advance_secs(11);
    let second = service.clone().oneshot(get("/users", None)).await.unwrap();
    assert_eq!(header(&second, &DEFAULT_CACHE_STATUS_HEADER), Some("MISS"));
    assert_ne!(header(&second, &ETAG).map(str::to_owned), etag1);
    assert_eq!(body_of(second).await.as_ref(), b"response 2");
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_overridden_no_cache_adds_warning() {
    let (cache, _, clock) = route_cache(AgePolicy::new(secs(5), secs(60)));
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    service.clone().oneshot(get("/users", None)).await.unwrap();
    clock.advance_secs(6);

    let response = service
        .clone()
        .oneshot(get("/users", Some("no-cache")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, &DEFAULT_CACHE_STATUS_HEADER), Some("STALE"));
    assert_eq!(
        header(&response, &WARNING),
        Some("110 - \"Response is Stale\"")
    );
    assert!(response.headers().contains_key(ETAG));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_only_if_cached_on_empty_cache_is_empty_success() {
    let (cache, _, _) = route_cache(AgePolicy::max_age(secs(10)));
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    let response = service
        .oneshot(get("/users", Some("only-if-cached")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, &DEFAULT_CACHE_STATUS_HEADER), Some("REJECT"));
    assert!(response.headers().get(ETAG).is_none());
    assert!(body_of(response).await.is_empty());
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_non_get_requests_bypass_cache() {
    let (cache, metrics, _) = route_cache(AgePolicy::max_age(secs(10)));
    let store = cache.clone();
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    for method in [Method::POST, Method::POST, Method::PUT, Method::DELETE] {
        let request = Request::builder()
            .method(method)
            .uri("/users")
            .header(CACHE_CONTROL, "only-if-cached")
            .body(())
            .unwrap();
        let response = service.clone().oneshot(request).await.unwrap();
        assert!(response.headers().get(&DEFAULT_CACHE_STATUS_HEADER).is_none());
        assert!(response.headers().get(ETAG).is_none());
    }

    assert_eq!(upstream.calls(), 4);
    assert!(!store.backing_store().contains(&store.key(ROUTE, "")));
    assert_eq!(metrics.get(Counter::Misses, ROUTE), 0);
    assert_eq!(metrics.get(Counter::Additions, ROUTE), 0);
}

#[tokio::test]
async fn test_unsuccessful_responses_are_not_stored() {
    let (cache, metrics, _) = route_cache(AgePolicy::max_age(secs(10)));
    let upstream = Upstream::default();
    let service =
        RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::INTERNAL_SERVER_ERROR));

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/users", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(ETAG).is_none());
    }
    assert_eq!(upstream.calls(), 2);
    assert_eq!(metrics.get(Counter::Additions, ROUTE), 0);
}

#[tokio::test]
async fn test_disabled_route_passes_through() {
    let (cache, _, _) = route_cache(AgePolicy::DISABLED);
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/users", None)).await.unwrap();
        assert!(response.headers().get(&DEFAULT_CACHE_STATUS_HEADER).is_none());
        assert!(response.headers().get(ETAG).is_none());
    }
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_query_order_shares_entry() {
    let (cache, _, _) = route_cache(AgePolicy::max_age(secs(10)));
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    service.clone().oneshot(get("/users?b=2&a=1", None)).await.unwrap();
    let same = service.clone().oneshot(get("/users?a=1&b=2", None)).await.unwrap();
    assert_eq!(header(&same, &DEFAULT_CACHE_STATUS_HEADER), Some("HIT"));

    let other = service.clone().oneshot(get("/users?a=2&b=2", None)).await.unwrap();
    assert_eq!(header(&other, &DEFAULT_CACHE_STATUS_HEADER), Some("MISS"));
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_custom_status_header() {
    let (cache, _, _) = route_cache(AgePolicy::max_age(secs(10)));
    let name = http::HeaderName::from_static("x-route-cache");
    let service = RouteCacheLayer::new(cache)
        .cache_status_header(name.clone())
        .layer(Upstream::default().service(StatusCode::OK));

    let response = service.oneshot(get("/users", None)).await.unwrap();
    assert_eq!(header(&response, &name), Some("MISS"));
    assert!(response.headers().get(&DEFAULT_CACHE_STATUS_HEADER).is_none());
}

/// Store that is always down.
struct DownStore;

impl DownStore {
    fn error() -> StoreError {
        StoreError::ConnectionError(Box::new(io::Error::other("down")))
    }
}

#[async_trait]
impl Store for DownStore {
    async fn get(&self, _key: &CacheKey) -> StoreResult<Option<CacheEntry>> {
        Err(Self::error())
    }

    async fn set(&self, _key: &CacheKey, _entry: CacheEntry) -> StoreResult<()> {
        Err(Self::error())
    }

    async fn set_ttl(&self, _key: &CacheKey, _entry: CacheEntry, _ttl: Duration) -> StoreResult<()> {
        Err(Self::error())
    }

    async fn remove(&self, _key: &CacheKey) -> StoreResult<DeleteStatus> {
        Err(Self::error())
    }

    async fn purge(&self) -> StoreResult<()> {
        Err(Self::error())
    }
}

#[tokio::test]
async fn test_store_failure_behaves_like_no_cache() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let cache = RouteCache::new(RouteConfig::new(ROUTE, AgePolicy::max_age(secs(10))), DownStore)
        .unwrap()
        .with_metrics(metrics.clone());
    let upstream = Upstream::default();
    let service = RouteCacheLayer::new(cache).layer(upstream.service(StatusCode::OK));

    for n in 1..=3 {
        let response = service
            .clone()
            .oneshot(get("/users", Some("only-if-cached")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, &DEFAULT_CACHE_STATUS_HEADER), Some("MISS"));
        assert!(response.headers().get(ETAG).is_none());
        assert_eq!(body_of(response).await, Bytes::from(format!("response {n}")));
    }

    assert_eq!(upstream.calls(), 3);
    assert_eq!(metrics.get(Counter::StoreErrors(StoreOperation::Get), ROUTE), 3);
    assert_eq!(metrics.get(Counter::StoreErrors(StoreOperation::Set), ROUTE), 3);
}

#[tokio::test]
async fn test_parameterised_route_keys_by_concrete_path() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let cache = RouteCache::new(
        RouteConfig::new("/users/{id}", AgePolicy::max_age(secs(60))),
        MokaStore::builder(100).build(),
    )
    .unwrap()
    .with_metrics(metrics.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let echo = service_fn(move |req: Request<()>| {
        counted.fetch_add(1, Ordering::SeqCst);
        let path = req.uri().path().to_owned();
        async move { Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(path)))) }
    });
    let service = RouteCacheLayer::new(cache.clone()).layer(echo);

    let first = service.clone().oneshot(get("/users/1", None)).await.unwrap();
    assert_eq!(body_of(first).await.as_ref(), b"/users/1");
    let second = service.clone().oneshot(get("/users/2", None)).await.unwrap();
    assert_eq!(header(&second, &DEFAULT_CACHE_STATUS_HEADER), Some("MISS"));
    assert_eq!(body_of(second).await.as_ref(), b"/users/2");

    let again = service.clone().oneshot(get("/users/1", None)).await.unwrap();
    assert_eq!(header(&again, &DEFAULT_CACHE_STATUS_HEADER), Some("HIT"));
    assert_eq!(body_of(again).await.as_ref(), b"/users/1");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.backing_store().contains(&cache.key("/users/1", "")));
    assert!(cache.backing_store().contains(&cache.key("/users/2", "")));
    assert_eq!(metrics.get(Counter::Additions, "/users/{id}"), 2);
}
