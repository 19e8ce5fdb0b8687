//! In-memory store for produced and uploaded documents

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

struct CacheInner {
    lru: LruCache<String, Vec<u8>>,
    total_bytes: usize,
}

/// LRU document cache with entry count and byte budget limits.
///
/// Every generated document lands here so later tool calls can refer to it
/// by key, the way a browser keeps a blob alive behind an object URL.
pub struct OutputCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
}

impl OutputCache {
    /// Create a cache with the given entry capacity and byte budget
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Store data under `key`. Returns false when the entry alone exceeds the
    /// byte budget and was not stored.
    pub fn put(&self, key: String, data: Vec<u8>) -> bool {
        let new_size = data.len();
        if new_size > self.max_bytes {
            return false;
        }

        let mut inner = self.inner.lock();

        if let Some(old) = inner.lru.pop(&key) {
            inner.total_bytes = inner.total_bytes.saturating_sub(old.len());
        }

        while inner.total_bytes + new_size > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((evicted_key, evicted)) => {
                    tracing::debug!(key = %evicted_key, bytes = evicted.len(), "evicting cached document");
                    inner.total_bytes = inner.total_bytes.saturating_sub(evicted.len());
                }
                None => break,
            }
        }

        // A full entry-count cache evicts silently inside `push`
        if let Some((_, evicted)) = inner.lru.push(key, data) {
            inner.total_bytes = inner.total_bytes.saturating_sub(evicted.len());
        }
        inner.total_bytes += new_size;
        true
    }

    /// Store data under a freshly generated key and return the key, or
    /// `None` when the document alone exceeds the byte budget.
    pub fn insert(&self, data: Vec<u8>) -> Option<String> {
        let key = self.generate_unique_key();
        let bytes = data.len();
        if self.put(key.clone(), data) {
            Some(key)
        } else {
            tracing::warn!(bytes, max_bytes = self.max_bytes, "document exceeds cache budget and was not cached");
            None
        }
    }

    /// Get data from the cache
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().lru.get(key).cloned()
    }

    /// Check if a key exists in the cache
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().lru.contains(key)
    }

    /// Remove an entry from the cache
    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock();
        let val = inner.lru.pop(key)?;
        inner.total_bytes = inner.total_bytes.saturating_sub(val.len());
        Some(val)
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    /// Total bytes currently stored
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    /// Generate a key that does not collide with existing entries.
    fn generate_unique_key(&self) -> String {
        let inner = self.inner.lock();
        loop {
            let key = uuid::Uuid::new_v4().to_string();
            if !inner.lru.contains(&key) {
                return key;
            }
        }
    }
}
