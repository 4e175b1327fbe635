//! Bounded LRU cache of query embeddings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;

use crate::matching::text::collapse_whitespace;
use crate::utils::truncate_chars;

/// Lowercased, whitespace-collapsed query text.
pub fn normalize_query(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
}

/// Query embeddings keyed by a prefix of the normalized query.
///
/// Entries are kept in recency order (oldest first); inserting past capacity
/// evicts the least recently used one. A capacity of zero disables caching.
/// Concurrent searches may race to fill the same key, which only costs a
/// duplicate provider call.
pub struct QueryCache {
    capacity: usize,
    key_chars: usize,
    entries: Mutex<IndexMap<String, Arc<Vec<f32>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit/miss counters since startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl QueryCache {
    pub fn new(capacity: usize, key_chars: usize) -> Self {
        Self {
            capacity,
            key_chars,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Arc<Vec<f32>>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cache key for already-normalized query text.
    pub fn key_for(&self, normalized: &str) -> String {
        truncate_chars(normalized, self.key_chars)
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        let mut entries = self.lock();
        let Some(index) = entries.get_index_of(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        let last = entries.len() - 1;
        entries.move_index(index, last);
        self.hits.fetch_add(1, Ordering::Relaxed);
        entries.get_index(last).map(|(_, v)| v.clone())
    }

    pub fn insert(&self, key: String, vector: Arc<Vec<f32>>) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        if let Some(index) = entries.get_index_of(&key) {
            let last = entries.len() - 1;
            entries.move_index(index, last);
            entries[last] = vector;
            return;
        }
        while entries.len() >= self.capacity {
            entries.shift_remove_index(0);
        }
        entries.insert(key, vector);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
