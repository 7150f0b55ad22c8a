//! Priority-aware TTL cache.
//!
//! [`SmartCache`] memoises expensive computations. Entries expire after their
//! own TTL and, when the cache is full, the least valuable entry (see
//! [`eviction_score`]) makes room for the new one.
//!
//! All state lives behind one `parking_lot::Mutex`; no user code (factories,
//! weighers excepted) ever runs while it is held.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hubroute_lib::cache::{CacheConfig, CachePriority, SmartCache};
//!
//! let cache: SmartCache<String, u32> = SmartCache::new(CacheConfig::default());
//! cache.set("answer".to_string(), 42, Duration::from_secs(60), CachePriority::High);
//! assert_eq!(cache.get(&"answer".to_string()), Some(42));
//! ```

mod eviction;

pub use eviction::{eviction_candidate, eviction_score};

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::metrics;
use crate::periodic::PeriodicTask;

/// Importance of a cache entry when choosing what to evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CachePriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Cache sizing and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// TTL used by callers that do not pick their own.
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// Interval of the background expiry sweep.
    #[serde(with = "duration_secs")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::validation("cache.max_entries", "must be at least 1"));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::validation(
                "cache.sweep_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Stored value plus bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub(crate) data: V,
    pub(crate) created_at: Instant,
    pub(crate) ttl: Duration,
    pub(crate) access_count: u64,
    pub(crate) last_accessed_at: Instant,
    pub(crate) priority: CachePriority,
}

impl<V> CacheEntry<V> {
    pub fn new(data: V, ttl: Duration, priority: CachePriority, now: Instant) -> Self {
        Self {
            data,
            created_at: now,
            ttl,
            access_count: 0,
            last_accessed_at: now,
            priority,
        }
    }

    pub fn data(&self) -> &V {
        &self.data
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    pub fn last_accessed_at(&self) -> Instant {
        self.last_accessed_at
    }

    pub fn priority(&self) -> CachePriority {
        self.priority
    }

    /// Expired once strictly more than `ttl` has elapsed since creation.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub memory_estimate_bytes: usize,
    pub oldest_entry_age_ms: Option<u64>,
    pub newest_entry_age_ms: Option<u64>,
}

type Weigher<K, V> = Arc<dyn Fn(&K, &V) -> usize + Send + Sync>;

pub struct SmartCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    weigher: Option<Weigher<K, V>>,
}

impl<K, V> fmt::Debug for SmartCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartCache")
            .field("entries", &self.entries.lock().len())
            .field("max_entries", &self.config.max_entries)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K, V> SmartCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache. A `max_entries` of zero is treated as one.
    pub fn new(config: CacheConfig) -> Self {
        let config = CacheConfig {
            max_entries: config.max_entries.max(1),
            ..config
        };
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            weigher: None,
        }
    }

    /// Attach a weigher estimating heap bytes owned by each entry.
    pub fn with_weigher(mut self, weigher: impl Fn(&K, &V) -> usize + Send + Sync + 'static) -> Self {
        self.weigher = Some(Arc::new(weigher));
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a live value, recording the access.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let value = {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(entry) if !entry.is_expired_at(now) => {
                    entry.access_count += 1;
                    entry.last_accessed_at = now;
                    Some(entry.data.clone())
                }
                Some(_) => {
                    entries.remove(key);
                    None
                }
                None => None,
            }
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        metrics::record_cache_lookup(value.is_some());
        value
    }

    /// Insert or overwrite a value.
    ///
    /// Inserting a new key into a full cache first drops expired entries and,
    /// if it is still full, evicts exactly one live entry.
    pub fn set(&self, key: K, value: V, ttl: Duration, priority: CachePriority) {
        self.set_at(key, value, ttl, priority, Instant::now());
    }

    pub(crate) fn set_at(&self, key: K, value: V, ttl: Duration, priority: CachePriority, now: Instant) {
        let evicted = {
            let mut entries = self.entries.lock();
            let mut evicted = false;
            if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
                entries.retain(|_, entry| !entry.is_expired_at(now));
            }
            if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
                let victim = eviction_candidate(entries.iter(), now).cloned();
                if let Some(victim) = victim {
                    entries.remove(&victim);
                    evicted = true;
                }
            }
            entries.insert(key, CacheEntry::new(value, ttl, priority, now));
            evicted
        };

        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_eviction();
        }
    }

    /// Whether a live value exists. Does not count as an access.
    pub fn has(&self, key: &K) -> bool {
        self.has_at(key, Instant::now())
    }

    pub(crate) fn has_at(&self, key: &K, now: Instant) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Return the cached value or compute, store and return a new one.
    ///
    /// The lock is not held while `factory` runs, so concurrent callers for the
    /// same key may each compute; the last writer's value stays cached. A failed
    /// factory stores nothing.
    pub fn get_or_set<F, E>(
        &self,
        key: K,
        factory: F,
        ttl: Duration,
        priority: CachePriority,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = factory()?;
        self.set(key, value.clone(), ttl, priority);
        Ok(value)
    }

    /// Async counterpart of [`SmartCache::get_or_set`].
    pub async fn get_or_set_async<F, Fut, E>(
        &self,
        key: K,
        factory: F,
        ttl: Duration,
        priority: CachePriority,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = factory().await?;
        self.set(key, value.clone(), ttl, priority);
        Ok(value)
    }

    pub fn remove(&self, key: &K) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every entry whose key matches `predicate`; returns how many.
    pub fn invalidate_pattern(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        before - entries.len()
    }

    /// Remove everything; returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Drop expired entries; returns how many.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock();

        let entry_count = entries.len();
        let base = std::mem::size_of::<K>() + std::mem::size_of::<CacheEntry<V>>();
        let weighed: usize = self
            .weigher
            .as_ref()
            .map(|w| entries.iter().map(|(k, e)| w(k, &e.data)).sum())
            .unwrap_or(0);

        let ages = entries
            .values()
            .map(|e| now.saturating_duration_since(e.created_at).as_millis() as u64);
        let (oldest, newest) = ages.fold((None, None), |(max, min): (Option<u64>, Option<u64>), age| {
            (
                Some(max.map_or(age, |m| m.max(age))),
                Some(min.map_or(age, |m| m.min(age))),
            )
        });
        drop(entries);

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let (hit_rate, miss_rate) = if lookups == 0 {
            (0.0, 0.0)
        } else {
            (hits as f64 / lookups as f64, misses as f64 / lookups as f64)
        };

        CacheStats {
            entry_count,
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
            miss_rate,
            memory_estimate_bytes: entry_count * base + weighed,
            oldest_entry_age_ms: oldest,
            newest_entry_age_ms: newest,
        }
    }
}

/// Start the background expiry sweep for `cache`.
pub fn spawn_sweeper<K, V>(cache: Arc<SmartCache<K, V>>, runtime: &Handle) -> PeriodicTask
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let period = cache.config.sweep_interval;
    PeriodicTask::spawn(runtime, "cache-sweeper", period, move || {
        let removed = cache.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, remaining = cache.len(), "swept expired cache entries");
        }
    })
}

pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
