//! Time-bounded response cache for idempotent upstream reads.
//!
//! Successful GET responses are stored under a [`CacheKey`] derived from the
//! request method, path, and ordered query parameters. Entries expire after a
//! fixed TTL measured against an injected [`Clock`]; expiry is lazy, checked
//! only when an entry is looked up. Mutating requests never touch the cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of the current time for TTL checks.
///
/// Production code uses [`SystemClock`]; tests substitute [`ManualClock`] so
/// expiry can be exercised without real elapsed time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::TimeDelta::from_std(by).unwrap_or(chrono::TimeDelta::MAX);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fingerprint of an upstream request.
///
/// Compared by value: method, path, and the query parameters in the order
/// they were appended. Two requests that differ in any parameter value (or
/// in parameter order) never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    path: String,
    query: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        query: &[(String, String)],
    ) -> Self {
        Self {
            method: method.into().to_uppercase(),
            path: path.into(),
            query: query.to_vec(),
        }
    }
}

impl fmt::Display for CacheKey {
    /// Renders `METHOD:PATH:k=v&k=v`. For logs only; lookups use the
    /// structured fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.method, self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

/// Keyed store of upstream responses with lazy TTL eviction.
///
/// All operations take a single lock, so a reader never observes a partially
/// written entry. Concurrent misses on the same key may both fetch and both
/// write; the last write wins.
pub struct TtlCache<V> {
    state: Mutex<CacheState<V>>,
    ttl: Duration,
    clock: Box<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache backed by the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }

    /// Create a cache that reads time from `clock`.
    pub fn with_clock(ttl: Duration, clock: impl Clock + 'static) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
            ttl,
            clock: Box::new(clock),
        }
    }

    /// Look up a live entry. An expired entry is removed and reported absent.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let Some(stored_at) = state.entries.get(key).map(|e| e.stored_at) else {
            state.misses += 1;
            return None;
        };

        if self.is_expired(stored_at, now) {
            state.entries.remove(key);
            state.misses += 1;
            return None;
        }

        state.hits += 1;
        state.entries.get(key).map(|e| e.value.clone())
    }

    /// Store `value`, replacing any existing entry and resetting its age.
    pub fn set(&self, key: CacheKey, value: V) {
        let stored_at = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.insert(key, CacheEntry { value, stored_at });
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache hit count.
    pub fn hits(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).hits
    }

    /// Cache miss count (absent and expired lookups).
    pub fn misses(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).misses
    }

    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.ttl.is_zero() {
            return true;
        }
        // A clock that went backwards counts as zero elapsed time.
        let elapsed = (now - stored_at).to_std().unwrap_or(Duration::ZERO);
        elapsed > self.ttl
    }
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache").field("ttl", &self.ttl).finish()
    }
}
