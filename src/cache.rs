//! Per-date score cache
//!
//! Results are memoized by date together with the baseline generation they
//! were computed against. An entry from an older generation is stale: the
//! comparison basis has moved, so it is treated as a miss and recomputed.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    generation: u64,
}

/// Cache hit/miss statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses caused by a baseline change since the entry was stored
    pub stale: u64,
}

/// Date-keyed memo of score results
#[derive(Debug)]
pub struct ScoreCache<T> {
    entries: RwLock<HashMap<NaiveDate, CacheEntry<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
}

impl<T> Default for ScoreCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale: AtomicU64::new(0),
        }
    }
}

impl<T: Clone> ScoreCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `date`, if it was computed against `generation`
    pub async fn get(&self, date: NaiveDate, generation: u64) -> Option<T> {
        let entries = self.entries.read().await;
        match entries.get(&date) {
            Some(entry) if entry.generation == generation => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(%date, "score cache hit");
                Some(entry.value.clone())
            }
            Some(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.stale.fetch_add(1, Ordering::Relaxed);
                debug!(
                    %date,
                    cached_generation = entry.generation,
                    generation,
                    "score cache entry stale"
                );
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(%date, "score cache miss");
                None
            }
        }
    }

    pub async fn insert(&self, date: NaiveDate, generation: u64, value: T) {
        let mut entries = self.entries.write().await;
        entries.insert(date, CacheEntry { value, generation });
    }

    /// Drop the entry for one date
    pub async fn invalidate(&self, date: NaiveDate) {
        self.entries.write().await.remove(&date);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_hit_for_same_generation() {
        let cache = ScoreCache::new();
        cache.insert(day(15), 3, 72u8).await;

        assert_eq!(cache.get(day(15), 3).await, Some(72));
        assert_eq!(cache.get(day(16), 3).await, None);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                stale: 0
            }
        );
    }

    #[tokio::test]
    async fn test_newer_generation_is_stale() {
        let cache = ScoreCache::new();
        cache.insert(day(15), 1, 72u8).await;

        assert_eq!(cache.get(day(15), 2).await, None);
        assert_eq!(cache.stats().stale, 1);

        cache.insert(day(15), 2, 80u8).await;
        assert_eq!(cache.get(day(15), 2).await, Some(80));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = ScoreCache::new();
        cache.insert(day(15), 1, 72u8).await;
        cache.insert(day(16), 1, 64u8).await;

        cache.invalidate(day(15)).await;
        assert_eq!(cache.get(day(15), 1).await, None);
        assert_eq!(cache.get(day(16), 1).await, Some(64));

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
