//! Error types for store operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Error type for store operations.
///
/// This enum categorizes errors that can occur during TTL store interactions
/// into distinct groups for appropriate handling. Callers treat every variant
/// as "the cache is unavailable" and fall back to the downstream handler.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Internal store error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// Network interaction error.
    ///
    /// Errors occurring during communication with remote stores (e.g., Redis).
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),

    /// The operation did not finish before the caller's deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value could not be decoded back into an entry.
    #[error("malformed stored entry: {0}")]
    Codec(String),
}

/// The store operation an error or metric refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `get`
    Get,
    /// `set` / `set_ttl`
    Set,
    /// `remove`
    Remove,
    /// `purge`
    Purge,
}

impl StoreOperation {
    /// Lowercase operation name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Get => "get",
            StoreOperation::Set => "set",
            StoreOperation::Remove => "remove",
            StoreOperation::Purge => "purge",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
