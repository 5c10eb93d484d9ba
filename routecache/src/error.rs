use std::fmt;
use std::time::Duration;

use routecache_backend::StoreError;
use thiserror::Error;

/// Error type for the route cache API.
///
/// Request handling never returns it: store failures during lookups and
/// stores are logged and counted, then the request proceeds as if the cache
/// were absent. It shows up on construction and on explicit maintenance
/// calls such as [`RouteCache::purge`](crate::RouteCache::purge).
#[derive(Debug, Error)]
pub enum CacheError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The route configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigErrors),
}

/// A single problem found while validating route configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The route pattern is empty.
    #[error("route pattern is empty")]
    EmptyRoute,

    /// The route pattern does not start with `/`.
    #[error("route pattern `{route}` must start with `/`")]
    RelativeRoute {
        /// Offending pattern.
        route: String,
    },

    /// `policy.min` is larger than `policy.max`.
    #[error("route `{route}`: min age {min:?} exceeds max age {max:?}")]
    MinAboveMax {
        /// Route the policy belongs to.
        route: String,
        /// Configured minimum.
        min: Duration,
        /// Configured maximum.
        max: Duration,
    },

    /// `policy.min` is set while `policy.max` is zero.
    #[error("route `{route}`: min age is set but max age is zero")]
    MinWithoutMax {
        /// Route the policy belongs to.
        route: String,
    },

    /// The store timeout is zero, which would fail every store call.
    #[error("route `{route}`: store timeout must be greater than zero")]
    ZeroTimeout {
        /// Route the timeout belongs to.
        route: String,
    },

    /// Two routes share the same pattern.
    #[error("route `{route}` is configured more than once")]
    DuplicateRoute {
        /// Repeated pattern.
        route: String,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// Every problem found in a configuration.
///
/// Validation does not stop at the first error, so a single run reports
/// everything that needs fixing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    pub(crate) fn from_vec(errors: Vec<ConfigError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self(errors))
        }
    }

    /// Returns the individual errors.
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    /// Number of errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a value returned by validation.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the collection and returns the errors.
    pub fn into_inner(self) -> Vec<ConfigError> {
        self.0
    }
}

impl From<ConfigError> for ConfigErrors {
    fn from(error: ConfigError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl IntoIterator for ConfigErrors {
    type Item = ConfigError;
    type IntoIter = std::vec::IntoIter<ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
