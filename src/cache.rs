use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    hash::Hash,
};

struct Entry<V> {
    value: V,
    /// Logical access time; the smallest tick is the least recently used.
    tick: u64,
}

type EvictedFn<K, V> = Box<dyn Fn(K, V) + Send>;

/// Bounded least-recently-used cache.
pub struct Cache<K, V>
where
    K: PartialEq + Eq + Hash + Clone + Debug,
{
    capacity: usize,
    entries: HashMap<K, Entry<V>>,
    /// access order, oldest first
    order: BTreeMap<u64, K>,
    tick: u64,
    evicted_fn: Option<EvictedFn<K, V>>,
    stats: Stats,
}

impl<K, V> Cache<K, V>
where
    K: PartialEq + Eq + Hash + Clone + Debug,
{
    pub fn new(capacity: usize, evicted_fn: Option<EvictedFn<K, V>>) -> Self {
        Cache {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            tick: 0,
            evicted_fn,
            stats: Stats::default(),
        }
    }

    /// Returns the value for `key` and marks it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.order.remove(&entry.tick);
                self.tick += 1;
                entry.tick = self.tick;
                self.order.insert(self.tick, key.clone());
                self.stats.hits += 1;
                Some(&entry.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces `key`, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }

        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(&key) {
            self.order.remove(&entry.tick);
            entry.value = value;
            entry.tick = self.tick;
            self.order.insert(self.tick, key);
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict();
        }
        self.order.insert(self.tick, key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                tick: self.tick,
            },
        );
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.tick);
        Some(entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        (self.stats.hits, self.stats.misses)
    }

    fn evict(&mut self) {
        let Some((_, key)) = self.order.pop_first() else {
            return;
        };
        if let Some(entry) = self.entries.remove(&key) {
            if let Some(evicted_fn) = &self.evicted_fn {
                evicted_fn(key, entry.value);
            }
        }
    }
}

#[derive(Default)]
struct Stats {
    hits: usize,
    misses: usize,
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use super::*;

    fn blob(n: u8) -> Vec<u8> {
        vec![n; n as usize]
    }

    #[test]
    fn test_get_returns_inserted_blob() {
        let mut cache: Cache<i32, Vec<u8>> = Cache::new(4, None);
        cache.insert(7, blob(3));
        cache.insert(9, blob(5));

        assert_eq!(cache.get(&7), Some(&blob(3)));
        assert_eq!(cache.get(&9), Some(&blob(5)));
        assert_eq!(cache.get(&8), None);
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let mut cache = Cache::new(3, None);
        for id in 0..10 {
            cache.insert(id, blob(id as u8));
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.capacity(), 3);
        for id in 0..7 {
            assert!(!cache.contains(&id), "record {} should be gone", id);
        }
        for id in 7..10 {
            assert!(cache.contains(&id));
        }
    }

    #[test]
    fn test_recently_read_record_survives() {
        let mut cache = Cache::new(2, None);
        cache.insert(1, blob(1));
        cache.insert(2, blob(2));
        assert!(cache.get(&1).is_some());

        cache.insert(3, blob(3));

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut cache = Cache::new(2, None);
        cache.insert(1, blob(1));
        cache.insert(1, blob(4));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1), Some(&blob(4)));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = Cache::new(4, None);
        cache.insert(1, blob(1));
        cache.insert(2, blob(2));

        assert_eq!(cache.remove(&1), Some(blob(1)));
        assert_eq!(cache.remove(&1), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&2).is_none());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = Cache::new(0, None);
        cache.insert(1, blob(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicted_values_are_dropped() {
        static LIVE: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;

        impl Tracked {
            fn new() -> Self {
                LIVE.fetch_add(1, Ordering::SeqCst);
                Tracked
            }
        }

        impl Drop for Tracked {
            fn drop(&mut self) {
                LIVE.fetch_sub(1, Ordering::SeqCst);
            }
        }

        {
            let mut cache = Cache::new(5, None);
            for id in 0..50 {
                cache.insert(id, Tracked::new());
            }
            assert_eq!(LIVE.load(Ordering::SeqCst), 5);
        }
        assert_eq!(LIVE.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_eviction_callback_sees_oldest() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let on_evict: EvictedFn<i32, Vec<u8>> = {
            let seen = seen.clone();
            Box::new(move |id, value| seen.lock().unwrap().push((id, value.len())))
        };

        let mut cache = Cache::new(2, Some(on_evict));
        cache.insert(10, blob(1));
        cache.insert(11, blob(2));
        cache.insert(12, blob(3));
        cache.insert(13, blob(4));

        assert_eq!(*seen.lock().unwrap(), vec![(10, 1), (11, 2)]);
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let mut cache = Cache::new(8, None);
        for id in 0..4 {
            cache.insert(id, blob(1));
        }
        for id in 0..6 {
            cache.get(&id);
        }

        assert_eq!(cache.stats(), (4, 2));
    }
}
