//! Request `Cache-Control` directives.
//!
//! Only the request directives the freshness negotiator understands are kept:
//! `max-age`, `min-fresh`, `no-cache`, `no-store` and `only-if-cached`.
//! Unknown directives are ignored and numeric values that do not parse as
//! non-negative integer seconds are treated as absent.

use std::time::Duration;

/// Cache preferences a client expressed through `Cache-Control` request headers.
///
/// Every field defaults to "not present".
///
/// ```
/// use std::time::Duration;
/// use routecache_core::RequestCacheControl;
///
/// let rcc = RequestCacheControl::parse(["max-age=30, no-cache", "x-custom"]);
/// assert_eq!(rcc.max_age, Some(Duration::from_secs(30)));
/// assert!(rcc.no_cache);
/// assert!(!rcc.only_if_cached);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCacheControl {
    /// `max-age=N`: the client accepts entries at most `N` seconds old.
    pub max_age: Option<Duration>,
    /// `min-fresh=N`: the entry must stay fresh for at least `N` more seconds.
    pub min_fresh: Option<Duration>,
    /// `no-cache`: the client asks for a response from the origin.
    pub no_cache: bool,
    /// `no-store`: the client asks that nothing be cached on its behalf.
    pub no_store: bool,
    /// `only-if-cached`: the client wants a stored response or nothing.
    pub only_if_cached: bool,
}

impl RequestCacheControl {
    /// Parses every `Cache-Control` header value of a request.
    ///
    /// Values are comma separated lists; directive names are matched
    /// case-insensitively. When a numeric directive repeats, the last value
    /// that parses wins.
    pub fn parse<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut rcc = RequestCacheControl::default();
        for directive in values.into_iter().flat_map(|value| value.split(',')) {
            let (name, argument) = match directive.split_once('=') {
                Some((name, argument)) => (name.trim(), Some(argument)),
                None => (directive.trim(), None),
            };
            if name.eq_ignore_ascii_case("max-age") {
                if let Some(seconds) = argument.and_then(parse_seconds) {
                    rcc.max_age = Some(seconds);
                }
            } else if name.eq_ignore_ascii_case("min-fresh") {
                if let Some(seconds) = argument.and_then(parse_seconds) {
                    rcc.min_fresh = Some(seconds);
                }
            } else if name.eq_ignore_ascii_case("no-cache") {
                rcc.no_cache = true;
            } else if name.eq_ignore_ascii_case("no-store") {
                rcc.no_store = true;
            } else if name.eq_ignore_ascii_case("only-if-cached") {
                rcc.only_if_cached = true;
            }
        }
        rcc
    }

    /// Returns `true` when the client asked to bypass stored responses.
    #[inline]
    pub fn forbids_stored(&self) -> bool {
        self.no_cache || self.no_store
    }
}

/// Delta-seconds, optionally quoted.
fn parse_seconds(argument: &str) -> Option<Duration> {
    let argument = argument.trim();
    let argument = argument
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(argument);
    argument.parse::<u64>().ok().map(Duration::from_secs)
}
