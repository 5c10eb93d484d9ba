//! Names for store instances.
//!
//! Several routes may share one store, and one process may run several
//! stores of the same kind. The label tells them apart in log lines and in
//! the `store` label of store-side gauges such as `routecache_moka_entries`.

use smol_str::SmolStr;
use std::fmt;

/// Name of a TTL store instance, e.g. `"moka"` or `"sessions"`.
///
/// ```
/// use routecache_core::StoreLabel;
///
/// const SESSIONS: StoreLabel = StoreLabel::new_static("sessions");
/// assert_eq!(SESSIONS.as_str(), "sessions");
/// assert_eq!(StoreLabel::from("redis").to_string(), "redis");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreLabel(SmolStr);

impl StoreLabel {
    /// Label known at compile time; never allocates.
    pub const fn new_static(name: &'static str) -> Self {
        Self(SmolStr::new_static(name))
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreLabel {
    fn from(name: &str) -> Self {
        Self(SmolStr::new(name))
    }
}
