//! Error types for Redis store operations.
//!
//! All errors can be converted to [`StoreError`] for uniform error handling
//! across different stores.
//!
//! [`StoreError`]: routecache_backend::StoreError

use redis::RedisError;
use routecache_backend::StoreError;

/// Error type for Redis store operations.
///
/// You typically don't handle this error directly. It appears when:
///
/// - Using [`RedisStoreBuilder::build`] with an invalid connection URL
/// - Performing the first store operation when Redis is unreachable
///   (connection is established lazily)
/// - Reading back a hash that was not written by this store
///
/// [`RedisStoreBuilder::build`]: crate::RedisStoreBuilder::build
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from the underlying Redis client.
    #[error("Redis store error: {0}")]
    Redis(#[from] RedisError),

    /// A stored hash is missing a field or holds an unexpected value.
    #[error("malformed entry under {key}: {reason}")]
    Malformed {
        /// Redis key of the hash.
        key: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        match error {
            Error::Redis(error) if error.is_io_error()
                || error.is_connection_refusal()
                || error.is_connection_dropped() => {
                Self::ConnectionError(Box::new(error))
            }
            Error::Redis(error) => Self::InternalError(Box::new(error)),
            malformed @ Error::Malformed { .. } => Self::Codec(malformed.to_string()),
        }
    }
}
