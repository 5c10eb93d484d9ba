use std::collections::HashSet;
use std::time::Duration;

use routecache_core::AgePolicy;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigErrors};

/// Cache settings of a single route.
///
/// ```
/// use std::time::Duration;
/// use routecache::RouteConfig;
/// use routecache_core::AgePolicy;
///
/// let config = RouteConfig::new("/users", AgePolicy::new(Duration::from_secs(5), Duration::from_secs(60)))
///     .with_store_timeout(Duration::from_millis(50));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RouteConfig {
    /// Route pattern the cache is attached to (e.g., "/users/{id}").
    pub route: String,
    /// Freshness bounds. Omitted bounds are zero; both zero disables caching.
    #[serde(default)]
    pub policy: AgePolicy,
    /// Deadline for each store call (e.g., "50ms"). No deadline when absent.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub store_timeout: Option<Duration>,
}

impl RouteConfig {
    /// Creates a route configuration without a store timeout.
    pub fn new(route: impl Into<String>, policy: AgePolicy) -> Self {
        Self {
            route: route.into(),
            policy,
            store_timeout: None,
        }
    }

    /// Sets the deadline applied to each store call.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Checks the route on its own.
    pub fn validate(&self) -> Result<(), ConfigErrors> {
        let mut errors = Vec::new();
        self.collect_errors(&mut errors);
        ConfigErrors::from_vec(errors)
    }

    fn collect_errors(&self, errors: &mut Vec<ConfigError>) {
        if self.route.is_empty() {
            errors.push(ConfigError::EmptyRoute);
        } else if !self.route.starts_with('/') {
            errors.push(ConfigError::RelativeRoute {
                route: self.route.clone(),
            });
        }

        let AgePolicy { min, max } = self.policy;
        if max.is_zero() && !min.is_zero() {
            errors.push(ConfigError::MinWithoutMax {
                route: self.route.clone(),
            });
        } else if min > max {
            errors.push(ConfigError::MinAboveMax {
                route: self.route.clone(),
                min,
                max,
            });
        }

        if self.store_timeout.is_some_and(|timeout| timeout.is_zero()) {
            errors.push(ConfigError::ZeroTimeout {
                route: self.route.clone(),
            });
        }
    }
}

/// Cache settings of every route of an application.
///
/// Usually loaded from YAML:
///
/// ```
/// use routecache::CacheConfig;
///
/// let config = CacheConfig::from_yaml(r#"
/// routes:
///   - route: /users
///     policy:
///       min: 5s
///       max: 1m
///     store_timeout: 50ms
///   - route: /health
/// "#).unwrap();
///
/// assert_eq!(config.routes.len(), 2);
/// assert!(config.route("/health").unwrap().policy.is_disabled());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct CacheConfig {
    /// Per-route settings.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl CacheConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigErrors> {
        let config: CacheConfig = serde_saphyr::from_str(document)
            .map_err(|error| ConfigError::Parse(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every route and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigErrors> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for route in &self.routes {
            route.collect_errors(&mut errors);
            if !route.route.is_empty() && !seen.insert(route.route.as_str()) {
                errors.push(ConfigError::DuplicateRoute {
                    route: route.route.clone(),
                });
            }
        }
        ConfigErrors::from_vec(errors)
    }

    /// Returns the settings for `route`, if configured.
    pub fn route(&self, route: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|config| config.route == route)
    }
}
