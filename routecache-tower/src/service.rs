use std::fmt::Debug;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::header::{CONTENT_TYPE, ETAG, HeaderName, HeaderValue, WARNING};
use http::{Method, Request, Response, StatusCode};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use routecache::RouteCache;
use routecache_backend::Store;
use routecache_core::{CacheEntry, Outcome};
use tower::Service;
use tracing::{debug, trace};

use crate::body::CacheBody;
use crate::headers::{CacheStatus, STALE_WARNING, request_cache_control};

/// Tower service that answers `GET` requests from a [`RouteCache`].
///
/// One pass per request:
///
/// - non-`GET` requests and routes with caching disabled go straight to the
///   upstream service; the cache is neither read nor written
/// - hits are answered from the stored entry with `ETag` (and `Warning` when
///   a client directive was overridden); upstream is not called
/// - `only-if-cached` without a usable entry gets an empty `200 OK`
/// - otherwise upstream is called, and a `2xx` response is buffered, stored
///   and returned with the `ETag` of the stored entry
///
/// Cache failures never fail the request; upstream errors are returned as is.
pub struct RouteCacheService<S, St> {
    upstream: S,
    cache: RouteCache<St>,
    status_header: HeaderName,
}

impl<S, St> RouteCacheService<S, St> {
    /// Wraps `upstream` with `cache`.
    pub fn new(upstream: S, cache: RouteCache<St>, status_header: HeaderName) -> Self {
        RouteCacheService {
            upstream,
            cache,
            status_header,
        }
    }
}

impl<S, St> Clone for RouteCacheService<S, St>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            cache: self.cache.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

impl<S, St, ReqBody, ResBody> Service<Request<ReqBody>> for RouteCacheService<S, St>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Debug + Send,
    St: Store + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Send,
{
    type Response = Response<CacheBody<ResBody>>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The ready instance serves this request; a fresh clone waits for the next one.
        let clone = self.upstream.clone();
        let mut upstream = std::mem::replace(&mut self.upstream, clone);
        let cache = self.cache.clone();
        let status_header = self.status_header.clone();

        Box::pin(async move {
            if req.method() != Method::GET || !cache.is_enabled() {
                trace!(method = %req.method(), route = cache.route(), "Cache bypassed");
                let response = upstream.call(req).await?;
                return Ok(response.map(CacheBody::Passthrough));
            }

            let key = cache.key(req.uri().path(), req.uri().query().unwrap_or_default());
            let rcc = request_cache_control(req.headers());
            let (entry, outcome) = cache.lookup(&key, &rcc).await;
            let status = CacheStatus::from_outcome(&outcome);

            match (outcome, entry) {
                (Outcome::Reject, _) => {
                    let mut response = Response::new(CacheBody::empty());
                    response
                        .headers_mut()
                        .insert(status_header, status.header_value());
                    return Ok(response);
                }
                (outcome, Some(entry)) if outcome.is_hit() => {
                    return Ok(cached_response(entry, outcome, status, status_header));
                }
                _ => {}
            }

            let response = upstream.call(req).await?;
            let (mut parts, body) = response.into_parts();
            parts
                .headers
                .insert(status_header, CacheStatus::Miss.header_value());

            if !parts.status.is_success() {
                debug!(route = cache.route(), status = %parts.status, "Response not stored");
                return Ok(Response::from_parts(parts, CacheBody::Passthrough(body)));
            }

            let payload = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(error) => {
                    return Ok(Response::from_parts(parts, CacheBody::Errored(Some(error))));
                }
            };

            let content_type = parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok());
            let stored = cache.store(&key, payload.clone(), content_type).await;
            if let Some(etag) = stored.and_then(|entry| HeaderValue::from_str(entry.etag()).ok()) {
                parts.headers.insert(ETAG, etag);
            }

            Ok(Response::from_parts(parts, CacheBody::complete(payload)))
        })
    }
}

fn cached_response<B>(
    entry: CacheEntry,
    outcome: Outcome,
    status: CacheStatus,
    status_header: HeaderName,
) -> Response<CacheBody<B>>
where
    B: HttpBody,
{
    let mut response = Response::new(CacheBody::complete(entry.payload().clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(etag) = HeaderValue::from_str(entry.etag()) {
        headers.insert(ETAG, etag);
    }
    if let Some(content_type) = entry
        .content_type()
        .and_then(|value| HeaderValue::from_str(value).ok())
    {
        headers.insert(CONTENT_TYPE, content_type);
    }
    if outcome.warning().is_some() {
        headers.insert(WARNING, STALE_WARNING);
    }
    headers.insert(status_header, status.header_value());
    response
}
