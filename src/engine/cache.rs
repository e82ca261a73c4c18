//! Resolver memoisation.
//!
//! Resolution is a pure function of `(unit, year, month, text)`, so any cache
//! is only an optimisation. [`SweepingCache`] is the default: a concurrent map
//! with sliding expiry, swept by a background thread that is started only once
//! the map grows past a threshold. Readers never wait on the sweep.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::resolve::Resolution;
use crate::TimeUnit;

/// Cache key. Year and month are zeroed for every unit but `Day`, whose
/// resolution is the only one that depends on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub unit: TimeUnit,
    pub year: i32,
    pub month: u32,
    pub text: String,
}

impl CacheKey {
    pub fn new(unit: TimeUnit, year: i32, month: u32, text: &str) -> Self {
        let (year, month) = if unit == TimeUnit::Day { (year, month) } else { (0, 0) };
        CacheKey { unit, year, month, text: text.to_string() }
    }
}

/// Storage behind [`Resolver`](super::resolve::Resolver).
pub trait ResolverCache: Send + Sync + fmt::Debug {
    fn get(&self, key: &CacheKey) -> Option<Resolution>;
    fn insert(&self, key: CacheKey, value: Resolution);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ResolverCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Option<Resolution> {
        None
    }

    fn insert(&self, _key: CacheKey, _value: Resolution) {}

    fn len(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries idle for longer than this are dropped by the sweep.
    pub ttl: Duration,
    /// Size past which the background sweep is started.
    pub sweep_threshold: usize,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl: Duration::from_secs(10 * 60),
            sweep_threshold: 10_000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Resolution,
    last_access_ms: AtomicU64,
}

/// Concurrent map with sliding expiry.
pub struct SweepingCache {
    entries: DashMap<CacheKey, Entry>,
    config: CacheConfig,
    epoch: Instant,
    sweeper_started: AtomicBool,
    this: Weak<SweepingCache>,
}

impl SweepingCache {
    pub fn new(config: CacheConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| SweepingCache {
            entries: DashMap::new(),
            config,
            epoch: Instant::now(),
            sweeper_started: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Drop entries idle for longer than the TTL. Returns how many went.
    pub fn sweep(&self) -> usize {
        let ttl_ms = u64::try_from(self.config.ttl.as_millis()).unwrap_or(u64::MAX);
        let now = self.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now.saturating_sub(entry.last_access_ms.load(Ordering::Relaxed)) <= ttl_ms);
        let removed = before.saturating_sub(self.entries.len());
        tracing::trace!(removed, remaining = self.entries.len(), "resolver cache swept");
        removed
    }

    fn start_sweeper(&self) {
        if self.sweeper_started.swap(true, Ordering::AcqRel) {
            return;
        }
        let weak = self.this.clone();
        let interval = self.config.sweep_interval;
        let spawned = thread::Builder::new().name("everywhen-cache-sweep".into()).spawn(move || {
            loop {
                thread::sleep(interval);
                match weak.upgrade() {
                    Some(cache) => {
                        cache.sweep();
                    }
                    None => break,
                }
            }
        });
        match spawned {
            Ok(_) => tracing::debug!(threshold = self.config.sweep_threshold, "resolver cache sweeper started"),
            Err(err) => {
                tracing::warn!(error = %err, "could not start resolver cache sweeper");
                self.sweeper_started.store(false, Ordering::Release);
            }
        }
    }
}

impl ResolverCache for SweepingCache {
    fn get(&self, key: &CacheKey) -> Option<Resolution> {
        let entry = self.entries.get(key)?;
        entry.last_access_ms.store(self.now_ms(), Ordering::Relaxed);
        Some(entry.value)
    }

    fn insert(&self, key: CacheKey, value: Resolution) {
        let entry = Entry { value, last_access_ms: AtomicU64::new(self.now_ms()) };
        self.entries.insert(key, entry);
        if self.entries.len() > self.config.sweep_threshold {
            self.start_sweeper();
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for SweepingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepingCache")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .field("sweeper_started", &self.sweeper_started.load(Ordering::Relaxed))
            .finish()
    }
}

static GLOBAL: Lazy<Arc<SweepingCache>> = Lazy::new(|| SweepingCache::new(CacheConfig::default()));

/// Process-wide cache shared by expressions parsed with default options.
pub fn global_cache() -> Arc<dyn ResolverCache> {
    GLOBAL.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_calendar_context_outside_days() {
        assert_eq!(CacheKey::new(TimeUnit::Hour, 2024, 2, "Last"), CacheKey::new(TimeUnit::Hour, 1999, 7, "Last"));
        assert_ne!(CacheKey::new(TimeUnit::Day, 2024, 2, "Last"), CacheKey::new(TimeUnit::Day, 2024, 3, "Last"));
    }

    #[test]
    fn sweep_drops_idle_entries_only() {
        let cache = SweepingCache::new(CacheConfig { ttl: Duration::ZERO, ..CacheConfig::default() });
        cache.insert(CacheKey::new(TimeUnit::Hour, 0, 0, "10"), Resolution::Value(10));
        thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());

        let cache = SweepingCache::new(CacheConfig::default());
        cache.insert(CacheKey::new(TimeUnit::Hour, 0, 0, "10"), Resolution::Value(10));
        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.get(&CacheKey::new(TimeUnit::Hour, 0, 0, "10")), Some(Resolution::Value(10)));
    }

    #[test]
    fn sweeper_starts_past_threshold() {
        let cache = SweepingCache::new(CacheConfig { sweep_threshold: 2, ..CacheConfig::default() });
        for n in 0..3 {
            cache.insert(CacheKey::new(TimeUnit::Minute, 0, 0, &n.to_string()), Resolution::Value(n));
        }
        assert!(cache.sweeper_started.load(Ordering::Relaxed));
    }

    #[test]
    fn no_cache_stores_nothing() {
        NoCache.insert(CacheKey::new(TimeUnit::Hour, 0, 0, "1"), Resolution::Value(1));
        assert!(NoCache.is_empty());
    }
}
