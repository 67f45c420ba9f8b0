use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

/// A single stored value with its expiry deadline.
///
/// Deadlines are wall-clock instants; a system clock jump moves expiry with
/// it, and no attempt is made to compensate.
#[derive(Debug)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

impl CacheEntry {
    fn is_expired(&self, now: SystemTime) -> bool {
        match self.expires_at {
            Some(deadline) => now > deadline,
            None => false,
        }
    }
}

/// Map, recency order, and byte accounting, guarded together.
///
/// `order` keeps keys most-recent-first; `used` is the sum of value lengths
/// over all live entries.
#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    used: usize,
}

impl StoreInner {
    /// Moves a key to the most-recent end of the order.
    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_front(key.to_string());
    }

    /// Removes an entry and its recency slot, fixing up `used`.
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.used -= entry.value.len();
                self.order.retain(|k| k != key);
                true
            }
            None => false,
        }
    }

    /// Evicts from the least-recent end until the store fits its cap.
    ///
    /// A single remaining entry is never evicted, even when it alone exceeds
    /// the cap: the freshly written value must stay retrievable.
    fn evict_to_cap(&mut self, cap: usize) {
        while self.used > cap && self.order.len() > 1 {
            if let Some(victim) = self.order.pop_back() {
                if let Some(entry) = self.entries.remove(&victim) {
                    self.used -= entry.value.len();
                }
            }
        }
    }
}

/// Byte-capped in-memory store with LRU eviction and lazy TTL expiry.
///
/// All operations succeed; capacity pressure is resolved by eviction, never
/// by rejecting a write. Values are copied on insert and on read, so callers
/// never share buffers with the store.
#[derive(Debug)]
pub struct KvStore {
    cap: usize,
    inner: Mutex<StoreInner>,
}

impl KvStore {
    /// Creates a store bounded to `capacity_bytes` of value data.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            cap: capacity_bytes,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Stores a value under `key`, replacing any previous value.
    ///
    /// A `ttl` of `None` (or zero) means the entry never expires. Overwrites
    /// reset the deadline and move the entry to the most-recent end; the byte
    /// counter is adjusted by the size delta. After the write, entries are
    /// evicted from the least-recent end until the store fits its cap again.
    pub fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        let expires_at = ttl
            .filter(|t| !t.is_zero())
            .map(|t| SystemTime::now() + t);

        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(key) {
            let old_len = entry.value.len();
            entry.value = value.to_vec();
            entry.expires_at = expires_at;
            inner.used = inner.used - old_len + value.len();
            inner.touch(key);
        } else {
            inner.entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.to_vec(),
                    expires_at,
                },
            );
            inner.order.push_front(key.to_string());
            inner.used += value.len();
        }
        inner.evict_to_cap(self.cap);
    }

    /// Returns a copy of the value for `key`, refreshing its recency.
    ///
    /// An expired entry is removed on the spot and reported as absent.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(SystemTime::now()),
            None => return None,
        };
        if expired {
            inner.remove(key);
            return None;
        }
        inner.touch(key);
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Removes `key` if present. Idempotent; reports whether anything was
    /// removed.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().remove(key)
    }

    /// Number of live entries (expired-but-untouched entries count).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total value bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.inner.lock().used
    }

    /// Configured capacity in value bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.cap
    }
}
