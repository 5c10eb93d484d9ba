//! Time source used to compute entry ages.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Route caches stamp entries and compute their age through this trait so
/// tests can move time forward without sleeping.
pub trait TimeProvider: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(feature = "test-helpers")]
pub use mock::MockTime;

#[cfg(feature = "test-helpers")]
mod mock {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    use chrono::{DateTime, Utc};

    use super::TimeProvider;

    /// Manually advanced clock. Clones share the same offset.
    #[derive(Debug, Clone)]
    pub struct MockTime {
        base: DateTime<Utc>,
        offset_ms: Arc<AtomicI64>,
    }

    impl MockTime {
        /// Creates a clock frozen at the current wall-clock time.
        pub fn new() -> Self {
            Self {
                base: Utc::now(),
                offset_ms: Arc::new(AtomicI64::new(0)),
            }
        }

        /// Moves the clock forward.
        pub fn advance(&self, by: Duration) {
            self.offset_ms
                .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
        }

        /// Moves the clock forward by whole seconds.
        pub fn advance_secs(&self, secs: u64) {
            self.advance(Duration::from_secs(secs));
        }

        /// Time elapsed since the clock was created.
        pub fn elapsed(&self) -> Duration {
            Duration::from_millis(self.offset_ms.load(Ordering::SeqCst).max(0) as u64)
        }
    }

    impl Default for MockTime {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TimeProvider for MockTime {
        fn now(&self) -> DateTime<Utc> {
            self.base + chrono::Duration::milliseconds(self.offset_ms.load(Ordering::SeqCst))
        }
    }
}
