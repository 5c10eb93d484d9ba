//! Response body produced by the cache middleware.
//!
//! ## Body States
//!
//! - **Complete**: the payload is in memory, either read from the cache or
//!   buffered from the handler's response so it could be stored
//! - **Errored**: reading the handler's body failed; the error is replayed
//!   to the client once
//! - **Passthrough**: the handler's body is forwarded untouched (non-`GET`
//!   requests, disabled routes and unsuccessful responses)

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::pin_project;

/// Body of a response returned by [`RouteCacheService`](crate::RouteCacheService).
#[pin_project(project = CacheBodyProj)]
pub enum CacheBody<B>
where
    B: HttpBody,
{
    /// Fully buffered payload. The `Option` yields the data once, then ends.
    Complete(Option<Bytes>),

    /// Reading the upstream body failed. Yields the error once, then ends.
    Errored(Option<B::Error>),

    /// Upstream body forwarded without buffering.
    Passthrough(#[pin] B),
}

impl<B: HttpBody> CacheBody<B> {
    /// Body holding `bytes`.
    pub fn complete(bytes: Bytes) -> Self {
        CacheBody::Complete(Some(bytes))
    }

    /// Body with no data.
    pub fn empty() -> Self {
        CacheBody::Complete(None)
    }
}

impl<B> HttpBody for CacheBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            CacheBodyProj::Complete(data) => Poll::Ready(
                data.take()
                    .filter(|bytes| !bytes.is_empty())
                    .map(|bytes| Ok(Frame::data(bytes))),
            ),
            CacheBodyProj::Errored(error) => Poll::Ready(error.take().map(Err)),
            CacheBodyProj::Passthrough(body) => match body.poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            CacheBody::Complete(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            CacheBody::Complete(None) | CacheBody::Errored(_) => SizeHint::with_exact(0),
            CacheBody::Passthrough(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            CacheBody::Complete(data) => data.as_ref().is_none_or(Bytes::is_empty),
            CacheBody::Errored(error) => error.is_none(),
            CacheBody::Passthrough(body) => body.is_end_stream(),
        }
    }
}

impl<B> fmt::Debug for CacheBody<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBody::Complete(data) => f
                .debug_tuple("Complete")
                .field(&data.as_ref().map(Bytes::len))
                .finish(),
            CacheBody::Errored(error) => f
                .debug_tuple("Errored")
                .field(&error.is_some())
                .finish(),
            CacheBody::Passthrough(_) => f.write_str("Passthrough"),
        }
    }
}
