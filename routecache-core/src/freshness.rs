//! Freshness negotiation between the route's [`AgePolicy`] and the client's
//! [`RequestCacheControl`].
//!
//! ## Decision order
//!
//! 1. Disabled policy: always [`Outcome::ServeFresh`].
//! 2. No entry, or `age >= policy.max`: [`Outcome::Reject`] for
//!    `only-if-cached`, otherwise [`Outcome::ServeFresh`].
//! 3. Usable entry (`age < policy.max`):
//!    - the client's `max-age` is floored at `policy.min`, its `min-fresh`
//!      capped at `policy.max`;
//!    - `no-cache`/`no-store` refresh unless `policy.min` pins retention;
//!    - an entry within the effective bounds is served, with a warning when
//!      only the clamping made it acceptable;
//!    - `only-if-cached` takes the entry anyway, with a warning;
//!    - otherwise the response is refreshed.
//!
//! The upper bound is open: an entry is a hit only while `age < policy.max`.
//!
//! ```
//! use std::time::Duration;
//! use routecache_core::{AgePolicy, Outcome, Override, RequestCacheControl, negotiate};
//!
//! let policy = AgePolicy::new(Duration::from_secs(5), Duration::from_secs(60));
//! let rcc = RequestCacheControl::parse(["no-cache"]);
//!
//! let outcome = negotiate(Some(Duration::from_secs(6)), &policy, &rcc);
//! assert_eq!(outcome, Outcome::ServeFromCacheWithWarning(Override::RetentionPinned));
//! ```

use std::fmt;
use std::time::Duration;

use crate::{AgePolicy, RequestCacheControl};

/// Terminal decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Serve the stored entry as is.
    ServeFromCache,
    /// Serve the stored entry although it does not satisfy the client's
    /// stated preference. The response carries a `Warning` header.
    ServeFromCacheWithWarning(Override),
    /// Invoke the downstream handler and store its response.
    ServeFresh(Refresh),
    /// `only-if-cached` without a usable entry: answer without the handler.
    Reject,
}

impl Outcome {
    /// Returns `true` when the stored entry is served.
    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(
            self,
            Outcome::ServeFromCache | Outcome::ServeFromCacheWithWarning(_)
        )
    }

    /// Returns the overridden client directive, if the outcome carries one.
    #[inline]
    pub fn warning(&self) -> Option<Override> {
        match self {
            Outcome::ServeFromCacheWithWarning(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Short lowercase name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::ServeFromCache => "hit",
            Outcome::ServeFromCacheWithWarning(_) => "hit_with_warning",
            Outcome::ServeFresh(_) => "fresh",
            Outcome::Reject => "reject",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which client directive the server overrode to serve a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Override {
    /// The entry is older than the client's `max-age`, but not older than `policy.min`.
    MaxAgeFloor,
    /// The entry expires sooner than the client's `min-fresh` asked for.
    MinFreshCeiling,
    /// The client sent `no-cache`/`no-store` but the route pins a minimum retention.
    RetentionPinned,
    /// The entry misses the client's bounds; `only-if-cached` accepts it anyway.
    OnlyIfCached,
}

impl Override {
    /// Short lowercase name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Override::MaxAgeFloor => "max_age_floor",
            Override::MinFreshCeiling => "min_fresh_ceiling",
            Override::RetentionPinned => "retention_pinned",
            Override::OnlyIfCached => "only_if_cached",
        }
    }
}

/// Why the downstream handler has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Refresh {
    /// Caching is disabled for the route; the store is never consulted.
    Disabled,
    /// There is no entry for the key.
    Absent,
    /// The store could not be read; the request is served as if it missed.
    Unavailable,
    /// The entry reached `policy.max`.
    Expired,
    /// The client sent `no-cache` or `no-store`.
    ClientRequested,
    /// The entry is outside the client's (clamped) bounds.
    TooStale,
}

impl Refresh {
    /// Short lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Refresh::Disabled => "disabled",
            Refresh::Absent => "absent",
            Refresh::Unavailable => "unavailable",
            Refresh::Expired => "expired",
            Refresh::ClientRequested => "client_requested",
            Refresh::TooStale => "too_stale",
        }
    }
}

/// Decides how to answer a request.
///
/// `age` is the age of the stored entry, `None` when there is none.
pub fn negotiate(age: Option<Duration>, policy: &AgePolicy, rcc: &RequestCacheControl) -> Outcome {
    if policy.is_disabled() {
        return Outcome::ServeFresh(Refresh::Disabled);
    }

    let age = match age {
        Some(age) if age < policy.max => age,
        unusable => {
            if rcc.only_if_cached {
                return Outcome::Reject;
            }
            return match unusable {
                Some(_) => Outcome::ServeFresh(Refresh::Expired),
                None => Outcome::ServeFresh(Refresh::Absent),
            };
        }
    };

    let effective_max_age = rcc
        .max_age
        .map_or(policy.max, |max_age| max_age.max(policy.min));
    let effective_min_fresh = rcc
        .min_fresh
        .map_or(Duration::ZERO, |min_fresh| min_fresh.min(policy.max));
    let remaining = policy.max - age;

    if rcc.forbids_stored() {
        return if policy.min.is_zero() {
            Outcome::ServeFresh(Refresh::ClientRequested)
        } else {
            Outcome::ServeFromCacheWithWarning(Override::RetentionPinned)
        };
    }

    if age <= effective_max_age && remaining >= effective_min_fresh {
        if rcc.max_age.is_some_and(|max_age| age > max_age) {
            return Outcome::ServeFromCacheWithWarning(Override::MaxAgeFloor);
        }
        if rcc.min_fresh.is_some_and(|min_fresh| remaining < min_fresh) {
            return Outcome::ServeFromCacheWithWarning(Override::MinFreshCeiling);
        }
        return Outcome::ServeFromCache;
    }

    if rcc.only_if_cached {
        return Outcome::ServeFromCacheWithWarning(Override::OnlyIfCached);
    }
    Outcome::ServeFresh(Refresh::TooStale)
}
