//! Size-bounded get-or-compute caches.
//!
//! [`BoundedCache`] is a keyed value cache with a maximum size and
//! second-chance (clock) eviction — an approximate LRU. Eviction may drop
//! any entry at any time; a later query simply recomputes, so eviction is
//! only ever observable as extra work.
//!
//! [`NullableCache`] layers negative-result caching on top: a compute
//! function returning `None` stores an explicit "this key has no value"
//! entry, distinct from the key never having been queried. Eviction never
//! distinguishes positive and negative entries.
//!
//! The compute function runs *outside* the cache's internal lock, because
//! resolvers legitimately re-enter the cache for other keys while computing.
//! Two workers racing on the same key may therefore both compute; the first
//! stored value wins and is returned to both. Compute functions must be
//! pure with respect to the current snapshot of their underlying source; if
//! the source changes, the owner discards the whole cache instance rather
//! than invalidating entries selectively.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

struct Slot<V> {
    value: V,
    /// Set on every hit; grants one round of survival during eviction.
    referenced: bool,
}

struct ClockMap<K, V> {
    map: FxHashMap<K, Slot<V>>,
    /// Insertion-ordered clock queue; each map entry appears exactly once.
    order: VecDeque<K>,
}

pub struct BoundedCache<K, V> {
    capacity: usize,
    inner: Mutex<ClockMap<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a bounded cache needs room for one entry");
        BoundedCache {
            capacity,
            inner: Mutex::new(ClockMap {
                map: FxHashMap::default(),
                order: VecDeque::new(),
            }),
        }
    }

    // Guarded sections never run compute functions; a poisoned map is still
    // consistent.
    fn inner_guard(&self) -> MutexGuard<'_, ClockMap<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached value for `key`, if present. Marks the entry recently
    /// used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner_guard();
        let slot = inner.map.get_mut(key)?;
        slot.referenced = true;
        Some(slot.value.clone())
    }

    /// Returns the cached value for `key` or computes, stores, and returns
    /// it. On a racing double-compute the first stored value wins.
    pub fn get_or_compute(&self, key: &K, compute: impl FnOnce(&K) -> V) -> V {
        if let Some(value) = self.get(key) {
            return value;
        }

        let value = compute(key);

        let mut guard = self.inner_guard();
        let ClockMap { map, order } = &mut *guard;
        if let Some(slot) = map.get_mut(key) {
            // Another worker stored a value while we were computing.
            slot.referenced = true;
            return slot.value.clone();
        }
        map.insert(
            key.clone(),
            Slot {
                value: value.clone(),
                referenced: false,
            },
        );
        order.push_back(key.clone());
        Self::evict_over_capacity(map, order, self.capacity);
        value
    }

    pub fn len(&self) -> usize {
        self.inner_guard().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Second chance: rotate referenced entries to the back once, evict the
    // first unreferenced entry. Terminates because a full rotation clears
    // every referenced flag.
    fn evict_over_capacity(
        map: &mut FxHashMap<K, Slot<V>>,
        order: &mut VecDeque<K>,
        capacity: usize,
    ) {
        while map.len() > capacity {
            let Some(key) = order.pop_front() else {
                return;
            };
            match map.get_mut(&key) {
                Some(slot) if slot.referenced => {
                    slot.referenced = false;
                    order.push_back(key);
                }
                Some(_) => {
                    map.remove(&key);
                }
                None => {}
            }
        }
    }
}

/// A bounded cache with first-class negative results.
///
/// `get` returns `None` both for a cached negative entry and for a compute
/// function that produced `None`; the difference is that a cached negative
/// does not invoke the compute function again.
pub struct NullableCache<K, V> {
    inner: BoundedCache<K, Option<V>>,
}

impl<K, V> NullableCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        NullableCache {
            inner: BoundedCache::new(capacity),
        }
    }

    pub fn get(&self, key: &K, compute: impl FnOnce(&K) -> Option<V>) -> Option<V> {
        self.inner.get_or_compute(key, compute)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
