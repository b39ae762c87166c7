//! Blast-radius result cache.
//!
//! Keyed by `<node id>_<max depth>`; entries expire after a fixed TTL and the
//! cache evicts its oldest entry once it would otherwise grow past its size
//! bound (an LRU-by-insertion policy, not LRU-by-access — the cheapest option
//! that still bounds memory, since blast-radius results for the same key are
//! identical until the next write invalidates the whole cache).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use codeindex_domain::constants::{DEFAULT_BLAST_RADIUS_CACHE_SIZE, DEFAULT_BLAST_RADIUS_CACHE_TTL_MS};

use super::risk::ChangeSafetyAssessment;

fn cache_key(node_id: &str, max_depth: u32) -> String {
    format!("{node_id}_{max_depth}")
}

struct Entry {
    value: ChangeSafetyAssessment,
    inserted_at: Instant,
    sequence: u64,
}

/// Configuration for the cache.
#[derive(Debug, Clone, Copy)]
pub struct BlastRadiusCacheConfig {
    pub ttl: Duration,
    pub max_entries: u64,
}

impl Default for BlastRadiusCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(DEFAULT_BLAST_RADIUS_CACHE_TTL_MS),
            max_entries: DEFAULT_BLAST_RADIUS_CACHE_SIZE,
        }
    }
}

struct Inner {
    entries: HashMap<String, Entry>,
    sequence: u64,
}

/// The cache itself.
pub struct BlastRadiusCache {
    config: BlastRadiusCacheConfig,
    inner: Mutex<Inner>,
}

impl BlastRadiusCache {
    #[must_use]
    pub fn new(config: BlastRadiusCacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                sequence: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a cached assessment, returning `None` on a miss or an expired
    /// entry (expired entries are evicted lazily on lookup).
    #[must_use]
    pub fn get(&self, node_id: &str, max_depth: u32) -> Option<ChangeSafetyAssessment> {
        let key = cache_key(node_id, max_depth);
        let mut inner = self.lock();
        let expired = inner
            .entries
            .get(&key)
            .map(|e| e.inserted_at.elapsed() >= self.config.ttl)
            .unwrap_or(false);
        if expired {
            inner.entries.remove(&key);
            return None;
        }
        inner.entries.get(&key).map(|e| e.value.clone())
    }

    /// Insert (or overwrite) an entry, evicting the oldest by insertion order
    /// if the cache would otherwise exceed its size bound.
    pub fn insert(&self, node_id: &str, max_depth: u32, value: ChangeSafetyAssessment) {
        let key = cache_key(node_id, max_depth);
        let mut inner = self.lock();
        let sequence = inner.sequence;
        inner.sequence += 1;

        if !inner.entries.contains_key(&key) && inner.entries.len() as u64 >= self.config.max_entries {
            if let Some(oldest_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.sequence)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&oldest_key);
            }
        }

        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                sequence,
            },
        );
    }

    /// Drop every cached entry (called on any graph write, since a write can
    /// change any node's blast radius).
    pub fn invalidate_all(&self) {
        self.lock().entries.clear();
    }

    /// Current number of live (not-yet-evicted) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::risk::{ImpactCounts, SafetyLevel};

    fn sample(score: u32) -> ChangeSafetyAssessment {
        ChangeSafetyAssessment {
            score,
            level: SafetyLevel::Safe,
            counts: ImpactCounts::default(),
            reasons: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn hit_after_insert() {
        let cache = BlastRadiusCache::new(BlastRadiusCacheConfig::default());
        cache.insert("n1", 3, sample(10));
        let hit = cache.get("n1", 3);
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().score, 10);
    }

    #[test]
    fn distinct_depths_are_distinct_keys() {
        let cache = BlastRadiusCache::new(BlastRadiusCacheConfig::default());
        cache.insert("n1", 1, sample(5));
        assert!(cache.get("n1", 2).is_none());
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let cache = BlastRadiusCache::new(BlastRadiusCacheConfig {
            ttl: Duration::from_millis(5),
            max_entries: 10,
        });
        cache.insert("n1", 1, sample(5));
        std::thread::sleep(Duration::from_millis(15));
        assert!(cache.get("n1", 1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn oldest_entry_is_evicted_when_over_capacity() {
        let cache = BlastRadiusCache::new(BlastRadiusCacheConfig {
            ttl: Duration::from_secs(60),
            max_entries: 2,
        });
        cache.insert("n1", 1, sample(1));
        cache.insert("n2", 1, sample(2));
        cache.insert("n3", 1, sample(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("n1", 1).is_none());
        assert!(cache.get("n3", 1).is_some());
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let cache = BlastRadiusCache::new(BlastRadiusCacheConfig::default());
        cache.insert("n1", 1, sample(1));
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
