use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Freshness bounds attached to a route.
///
/// - `max` is the hard ceiling: an entry whose age reaches `max` is never
///   served. It is also the TTL fresh responses are stored with.
/// - `min` is the retention floor: a client `max-age` below it is raised to
///   it, and a client `no-cache` cannot force a refresh while it is non-zero.
///
/// `min == 0 && max == 0` disables caching for the route.
///
/// Durations are written in humantime format:
///
/// ```
/// use std::time::Duration;
/// use routecache_core::AgePolicy;
///
/// let policy: AgePolicy = serde_saphyr::from_str("min: 5s\nmax: 1m\n").unwrap();
/// assert_eq!(policy, AgePolicy::new(Duration::from_secs(5), Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct AgePolicy {
    /// Minimum retention (e.g., "5s", "500ms").
    #[serde(default, with = "humantime_serde")]
    pub min: Duration,
    /// Maximum age an entry may be served at (e.g., "1m").
    #[serde(default, with = "humantime_serde")]
    pub max: Duration,
}

impl AgePolicy {
    /// The sentinel policy that turns caching off.
    pub const DISABLED: AgePolicy = AgePolicy {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Creates a policy with the given bounds.
    pub const fn new(min: Duration, max: Duration) -> Self {
        AgePolicy { min, max }
    }

    /// Creates a policy with no retention floor.
    pub const fn max_age(max: Duration) -> Self {
        AgePolicy {
            min: Duration::ZERO,
            max,
        }
    }

    /// Returns `true` for the `min == 0 && max == 0` sentinel.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.min.is_zero() && self.max.is_zero()
    }
}
