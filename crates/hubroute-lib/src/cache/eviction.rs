//! Least-valuable-first eviction scoring.

use std::time::Instant;

use super::{CacheEntry, CachePriority};

impl CachePriority {
    /// Importance multiplier applied to the access count.
    pub fn weight(self) -> f64 {
        match self {
            CachePriority::Low => 1.0,
            CachePriority::Medium => 2.0,
            CachePriority::High => 3.0,
        }
    }
}

/// `seconds_since_last_access / (access_count × priority_weight)`.
///
/// Higher means less valuable. Never-read entries count as one access so a
/// fresh insert is comparable with everything else. Expired entries score
/// `f64::INFINITY` and are always evicted first.
pub fn eviction_score<V>(entry: &CacheEntry<V>, now: Instant) -> f64 {
    if entry.is_expired_at(now) {
        return f64::INFINITY;
    }
    let idle = now
        .saturating_duration_since(entry.last_accessed_at)
        .as_secs_f64();
    let accesses = entry.access_count.max(1) as f64;
    idle / (accesses * entry.priority.weight())
}

/// The key that should be evicted from a snapshot of entries.
///
/// Highest score wins; equal scores fall back to the oldest `created_at`,
/// then to iteration order.
pub fn eviction_candidate<'a, K: 'a, V: 'a>(
    entries: impl IntoIterator<Item = (&'a K, &'a CacheEntry<V>)>,
    now: Instant,
) -> Option<&'a K> {
    let mut best: Option<(&K, f64, Instant)> = None;
    for (key, entry) in entries {
        let score = eviction_score(entry, now);
        let replace = match best {
            None => true,
            Some((_, best_score, best_created)) => {
                score > best_score || (score == best_score && entry.created_at < best_created)
            }
        };
        if replace {
            best = Some((key, score, entry.created_at));
        }
    }
    best.map(|(key, _, _)| key)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn entry(
        t0: Instant,
        last_access_secs: u64,
        access_count: u64,
        priority: CachePriority,
    ) -> CacheEntry<u32> {
        CacheEntry {
            data: 0,
            created_at: t0,
            ttl: Duration::from_secs(3600),
            access_count,
            last_accessed_at: t0 + Duration::from_secs(last_access_secs),
            priority,
        }
    }

    #[test]
    fn score_matches_formula() {
        let t0 = Instant::now();
        let now = t0 + Duration::from_secs(100);
        // idle 60s, 3 accesses, medium weight 2 → 60 / 6 = 10
        let e = entry(t0, 40, 3, CachePriority::Medium);
        assert!((eviction_score(&e, now) - 10.0).abs() < 1e-9);
        // never accessed counts as one access
        let e = entry(t0, 0, 0, CachePriority::Low);
        assert!((eviction_score(&e, now) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn expired_entries_score_infinite() {
        let t0 = Instant::now();
        let mut e = entry(t0, 0, 10, CachePriority::High);
        e.ttl = Duration::from_secs(1);
        assert_eq!(eviction_score(&e, t0 + Duration::from_secs(5)), f64::INFINITY);
    }

    #[test]
    fn picks_highest_score() {
        let t0 = Instant::now();
        let now = t0 + Duration::from_secs(100);
        let entries = vec![
            ("hot", entry(t0, 90, 10, CachePriority::Low)),     // 10 / 10 = 1
            ("stale", entry(t0, 10, 1, CachePriority::Medium)), // 90 / 2 = 45
            ("vip", entry(t0, 10, 1, CachePriority::High)),     // 90 / 3 = 30
        ];
        let victim = eviction_candidate(entries.iter().map(|(k, e)| (k, e)), now);
        assert_eq!(victim, Some(&"stale"));
    }

    #[test]
    fn priority_protects_equally_idle_entries() {
        let t0 = Instant::now();
        let now = t0 + Duration::from_secs(30);
        let entries = vec![
            ("high", entry(t0, 0, 1, CachePriority::High)),
            ("low", entry(t0, 0, 1, CachePriority::Low)),
            ("medium", entry(t0, 0, 1, CachePriority::Medium)),
        ];
        let victim = eviction_candidate(entries.iter().map(|(k, e)| (k, e)), now);
        assert_eq!(victim, Some(&"low"));
    }

    #[test]
    fn ties_prefer_oldest_entry() {
        let t0 = Instant::now();
        let now = t0 + Duration::from_secs(50);
        let mut young = entry(t0, 0, 1, CachePriority::Low);
        young.created_at = t0 + Duration::from_secs(1);
        let old = entry(t0, 0, 1, CachePriority::Low);
        let entries = vec![("young", young), ("old", old)];
        let victim = eviction_candidate(entries.iter().map(|(k, e)| (k, e)), now);
        assert_eq!(victim, Some(&"old"));
    }

    #[test]
    fn empty_snapshot_has_no_candidate() {
        let entries: Vec<(&str, CacheEntry<u32>)> = Vec::new();
        assert!(eviction_candidate(entries.iter().map(|(k, e)| (k, e)), Instant::now()).is_none());
    }
}
