//! Stored cache entries.
//!
//! A [`CacheEntry`] is created once, right after the downstream handler
//! produced a successful response, and is never mutated afterwards. Refreshing
//! a key replaces the whole entry.
//!
//! ```
//! use std::time::Duration;
//! use chrono::Utc;
//! use routecache_core::CacheEntry;
//!
//! let now = Utc::now();
//! let entry = CacheEntry::new("hello", Duration::from_secs(10), now);
//!
//! assert_eq!(entry.payload().as_ref(), b"hello");
//! assert_eq!(entry.age(now + chrono::Duration::seconds(3)), Duration::from_secs(3));
//! assert_eq!(entry.etag(), CacheEntry::new("hello", Duration::ZERO, now).etag());
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use smol_str::SmolStr;

use crate::Payload;

/// A response payload stored under a [`CacheKey`](crate::CacheKey).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    payload: Payload,
    etag: SmolStr,
    stored_at: DateTime<Utc>,
    ttl: Duration,
    content_type: Option<SmolStr>,
}

impl CacheEntry {
    /// Creates an entry for `payload`, computing its ETag.
    pub fn new(payload: impl Into<Payload>, ttl: Duration, stored_at: DateTime<Utc>) -> Self {
        let payload = payload.into();
        let etag = etag::compute(&payload);
        CacheEntry {
            payload,
            etag,
            stored_at,
            ttl,
            content_type: None,
        }
    }

    /// Reassembles an entry read back from a store that persisted its fields.
    ///
    /// The ETag is taken as stored; it is not recomputed.
    pub fn from_parts(
        payload: Payload,
        etag: impl Into<SmolStr>,
        stored_at: DateTime<Utc>,
        ttl: Duration,
        content_type: Option<SmolStr>,
    ) -> Self {
        CacheEntry {
            payload,
            etag: etag.into(),
            stored_at,
            ttl,
            content_type,
        }
    }

    /// Attaches the `Content-Type` the payload was produced with.
    pub fn with_content_type(mut self, content_type: impl Into<SmolStr>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the stored payload.
    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the quoted strong ETag of the payload.
    #[inline]
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Returns when the entry was stored.
    #[inline]
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Returns the time-to-live the entry was stored with.
    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the `Content-Type` of the payload, if known.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Elapsed time since the entry was stored, as seen at `now`.
    ///
    /// Clock skew that would make the age negative yields zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Consumes the entry and returns its payload.
    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

/// Content fingerprints for cached payloads.
pub mod etag {
    use sha2::{Digest, Sha256};
    use smol_str::SmolStr;

    /// Number of digest bytes kept in the ETag.
    const DIGEST_PREFIX: usize = 16;

    /// Computes the quoted strong ETag for `payload`.
    ///
    /// Identical payloads always produce identical tags.
    pub fn compute(payload: &[u8]) -> SmolStr {
        let digest = Sha256::digest(payload);
        SmolStr::from(format!("\"{}\"", hex::encode(&digest[..DIGEST_PREFIX])))
    }
}
