//! End-to-end lookup/store behavior of a route cache over the Moka store.

use std::sync::Arc;
use std::time::Duration;

use routecache::metrics::{Counter, InMemoryMetrics};
use routecache::{AgePolicy, Outcome, Override, Refresh, RequestCacheControl, RouteCache, RouteConfig};
use routecache_backend::EvictionCause;
use routecache_core::time::MockTime;
use routecache_moka::MokaStore;

const ROUTE: &str = "/items";

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn rcc(values: &[&str]) -> RequestCacheControl {
    RequestCacheControl::parse(values.iter().copied())
}

struct Harness {
    cache: RouteCache<MokaStore>,
    metrics: Arc<InMemoryMetrics>,
    clock: MockTime,
}

impl Harness {
    fn new(policy: AgePolicy) -> Self {
        let metrics = Arc::new(InMemoryMetrics::new());
        let clock = MockTime::new();
        let cache = RouteCache::new(
            RouteConfig::new(ROUTE, policy),
            MokaStore::builder(1_000).build(),
        )
        .unwrap()
        .with_metrics(metrics.clone())
        .with_time_provider(Arc::new(clock.clone()));
        Self {
            cache,
            metrics,
            clock,
        }
    }

    /// One request through the cache: look up, and on refresh store `body`.
    /// Returns the outcome and the ETag the response would carry.
    async fn request(&self, query: &str, directives: &[&str], body: &'static str) -> (Outcome, Option<String>) {
        let key = self.cache.key(ROUTE, query);
        let (entry, outcome) = self.cache.lookup(&key, &rcc(directives)).await;
        match outcome {
            Outcome::ServeFromCache | Outcome::ServeFromCacheWithWarning(_) => {
                let entry = entry.expect("hit carries the entry");
                (outcome, Some(entry.etag().to_owned()))
            }
            Outcome::ServeFresh(_) => {
                let stored = self.cache.store(&key, body.into(), None).await;
                (outcome, stored.map(|entry| entry.etag().to_owned()))
            }
            Outcome::Reject => (outcome, None),
        }
    }

    fn count(&self, counter: Counter) -> u64 {
        self.metrics.get(counter, ROUTE)
    }
}

#[tokio::test]
async fn test_repeated_request_within_max_is_served_from_cache() {
    let h = Harness::new(AgePolicy::max_age(secs(10)));

    let (first, etag1) = h.request("", &[], "payload").await;
    assert_eq!(first, Outcome::ServeFresh(Refresh::Absent));
    let etag1 = etag1.expect("fresh response is stored");

    h.clock.advance_secs(5);
    let (second, etag2) = h.request("", &[], "other").await;
    assert_eq!(second, Outcome::ServeFromCache);
    assert_eq!(etag2.as_deref(), Some(etag1.as_str()));

    let entry = h.cache.lookup(&h.cache.key(ROUTE, ""), &rcc(&[])).await.0.unwrap();
    assert_eq!(entry.payload().as_ref(), b"payload");
}

#[tokio::test]
async fn test_request_after_max_is_refreshed() {
    let h = Harness::new(AgePolicy::max_age(secs(10)));

    let (_, etag1) = h.request("", &[], "v1").await;
    h.clock.advance_secs(11);
    let (outcome, etag2) = h.request("", &[], "v2").await;

    assert_eq!(outcome, Outcome::ServeFresh(Refresh::Expired));
    assert_ne!(etag1, etag2);
}

#[tokio::test]
async fn test_small_client_max_age_is_floored_at_min() {
    let h = Harness::new(AgePolicy::new(secs(5), secs(60)));
    h.request("", &[], "v1").await;

    h.clock.advance_secs(2);
    let (outcome, _) = h.request("", &["max-age=1"], "v2").await;
    assert_eq!(
        outcome,
        Outcome::ServeFromCacheWithWarning(Override::MaxAgeFloor)
    );

    h.clock.advance_secs(4);
    let (outcome, _) = h.request("", &["max-age=1"], "v2").await;
    assert_eq!(outcome, Outcome::ServeFresh(Refresh::TooStale));
}

#[tokio::test]
async fn test_no_cache_is_overridden_by_min_retention() {
    let h = Harness::new(AgePolicy::new(secs(5), secs(60)));
    let (_, etag1) = h.request("", &[], "v1").await;

    h.clock.advance_secs(6);
    let (outcome, etag2) = h.request("", &["no-cache"], "v2").await;
    assert_eq!(
        outcome,
        Outcome::ServeFromCacheWithWarning(Override::RetentionPinned)
    );
    assert_eq!(etag1, etag2);
    assert_eq!(h.count(Counter::Hits { warning: true }), 1);
}

#[tokio::test]
async fn test_no_cache_without_min_forces_refresh() {
    let h = Harness::new(AgePolicy::max_age(secs(60)));
    h.request("", &[], "v1").await;

    let (outcome, _) = h.request("", &["no-store"], "v2").await;
    assert_eq!(outcome, Outcome::ServeFresh(Refresh::ClientRequested));
}

#[tokio::test]
async fn test_only_if_cached_on_empty_cache_is_rejected() {
    let h = Harness::new(AgePolicy::max_age(secs(10)));

    let (outcome, etag) = h.request("", &["only-if-cached"], "unused").await;
    assert_eq!(outcome, Outcome::Reject);
    assert!(etag.is_none());
    assert!(!h.cache.backing_store().contains(&h.cache.key(ROUTE, "")));
}

#[tokio::test]
async fn test_only_if_cached_accepts_entry_outside_client_bounds() {
    let h = Harness::new(AgePolicy::max_age(secs(10)));
    h.request("", &[], "v1").await;

    h.clock.advance_secs(8);
    let (outcome, _) = h
        .request("", &["only-if-cached", "min-fresh=5"], "v2")
        .await;
    assert_eq!(
        outcome,
        Outcome::ServeFromCacheWithWarning(Override::OnlyIfCached)
    );
}

#[tokio::test]
async fn test_entries_at_or_past_max_are_never_hits() {
    let policy = AgePolicy::new(secs(3), secs(10));
    let directive_sets: [&[&str]; 5] = [
        &[],
        &["max-age=100"],
        &["only-if-cached"],
        &["no-cache"],
        &["min-fresh=0", "max-age=0"],
    ];

    for directives in directive_sets {
        for age in [10, 11, 60] {
            let h = Harness::new(policy);
            h.request("", &[], "v1").await;
            h.clock.advance_secs(age);

            let (outcome, _) = h.request("", directives, "v2").await;
            assert!(
                !outcome.is_hit(),
                "age {age}s with {directives:?} gave {outcome:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_query_parameter_order_does_not_matter() {
    let h = Harness::new(AgePolicy::max_age(secs(10)));

    h.request("b=2&a=1", &[], "ab").await;
    let (outcome, _) = h.request("a=1&b=2", &[], "unused").await;
    assert_eq!(outcome, Outcome::ServeFromCache);

    let (outcome, _) = h.request("a=2&b=2", &[], "other").await;
    assert_eq!(outcome, Outcome::ServeFresh(Refresh::Absent));
}

#[tokio::test]
async fn test_every_refresh_is_a_miss() {
    let h = Harness::new(AgePolicy::max_age(secs(10)));

    h.request("", &[], "v1").await; // absent
    h.request("", &[], "v1").await; // hit
    h.clock.advance_secs(11);
    h.request("", &[], "v2").await; // expired
    h.request("", &["no-cache"], "v3").await; // client refresh
    h.clock.advance_secs(2);
    h.request("", &["max-age=1"], "v4").await; // too stale
    h.request("", &[], "v4").await; // hit
    h.request("other=1", &["only-if-cached"], "unused").await; // reject

    let additions = h.count(Counter::Additions);
    let misses = h.count(Counter::Misses);

    assert_eq!(misses, 4);
    assert_eq!(h.metrics.hits(ROUTE), 2);
    assert_eq!(h.metrics.evictions(ROUTE), 0);
    assert_eq!(additions, misses + h.metrics.evictions(ROUTE));
}

#[tokio::test]
async fn test_additions_equal_misses_plus_store_reported_evictions() {
    let h = Harness::new(AgePolicy::max_age(Duration::from_millis(100)));
    h.cache.observe(h.cache.backing_store());
    let key = h.cache.key(ROUTE, "");

    // Warm the key without a preceding lookup.
    h.cache.store(&key, "v1".into(), None).await.unwrap();

    // The store drops the entry on its own and reports it.
    tokio::time::sleep(Duration::from_millis(250)).await;
    h.cache.backing_store().run_pending_tasks().await;
    assert_eq!(h.count(Counter::Evictions(EvictionCause::Expired)), 1);

    let (outcome, etag) = h.request("", &[], "v2").await;
    assert_eq!(outcome, Outcome::ServeFresh(Refresh::Absent));
    assert!(etag.is_some());

    let additions = h.count(Counter::Additions);
    let misses = h.count(Counter::Misses);
    let evictions = h.metrics.evictions(ROUTE);
    assert_eq!((additions, misses, evictions), (2, 1, 1));
    assert_eq!(additions, misses + evictions);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_leave_one_consistent_entry() {
    let h = Arc::new(Harness::new(AgePolicy::max_age(secs(60))));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move { h.request("", &[], "same").await }));
    }
    for task in tasks {
        let (outcome, etag) = task.await.unwrap();
        assert!(matches!(
            outcome,
            Outcome::ServeFromCache | Outcome::ServeFresh(Refresh::Absent)
        ));
        assert!(etag.is_some());
    }

    let (outcome, _) = h.request("", &[], "unused").await;
    assert_eq!(outcome, Outcome::ServeFromCache);
}
