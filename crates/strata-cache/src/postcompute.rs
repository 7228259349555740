//! A keyed cache of deferred two-phase values.
//!
//! [`PostComputeCache`] owns one [`DeferredCell`] per key, created on
//! demand; the compute and post-compute closures are shared by all cells.
//! `get` has the cell's semantics per key: compute-once, post-compute
//! confined to the producing worker, rollback on failure.
//!
//! When post-computations of different keys (or of different caches) may
//! query each other, construct the cache with [`PostComputeCache::in_domain`]
//! so all cells share the domain lock. Confinement per *cache* would not be
//! enough: the deadlock can span two caches whose values reference each
//! other.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use strata_common::{AnalysisError, WorkerContext};

use crate::deferred::{ComputeFn, DeferredCell, PostComputeFn};
use crate::domain::ComputationDomain;
use crate::locking::CellLock;

pub struct PostComputeCache<K, V, A> {
    cells: DashMap<K, Arc<DeferredCell<K, V, A>>>,
    compute: Arc<ComputeFn<K, V, A>>,
    post_compute: Arc<PostComputeFn<K, V, A>>,
    /// Present when the cache belongs to a computation domain; otherwise
    /// each cell gets a private lock.
    shared_lock: Option<Arc<CellLock>>,
}

impl<K, V, A> PostComputeCache<K, V, A>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    pub fn new(
        compute: impl Fn(&K, &WorkerContext) -> Result<(V, A), AnalysisError> + Send + Sync + 'static,
        post_compute: impl Fn(&K, &V, A, &WorkerContext) -> Result<(), AnalysisError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        PostComputeCache {
            cells: DashMap::new(),
            compute: Arc::new(compute),
            post_compute: Arc::new(post_compute),
            shared_lock: None,
        }
    }

    /// A cache whose cells all share `domain`'s lock.
    pub fn in_domain(
        domain: &ComputationDomain,
        compute: impl Fn(&K, &WorkerContext) -> Result<(V, A), AnalysisError> + Send + Sync + 'static,
        post_compute: impl Fn(&K, &V, A, &WorkerContext) -> Result<(), AnalysisError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        PostComputeCache {
            cells: DashMap::new(),
            compute: Arc::new(compute),
            post_compute: Arc::new(post_compute),
            shared_lock: Some(domain.shared_lock()),
        }
    }

    /// Returns the value for `key`, computing and post-computing it if this
    /// is the first query. See [`DeferredCell::get`] for the full contract.
    pub fn get(&self, key: &K, ctx: &WorkerContext) -> Result<V, AnalysisError> {
        let cell = self.cell_for(key);
        cell.get(ctx)
    }

    /// Non-blocking peek; `None` unless the value for `key` is published.
    pub fn get_if_computed(&self, key: &K) -> Option<V> {
        let cell = self.cells.get(key)?;
        let cell = Arc::clone(cell.value());
        cell.get_if_computed()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // The map shard lock is held only while cloning the cell handle out,
    // never while the cell computes; re-entrant `get` calls from
    // post-computation therefore cannot deadlock on the map.
    fn cell_for(&self, key: &K) -> Arc<DeferredCell<K, V, A>> {
        if let Some(cell) = self.cells.get(key) {
            return Arc::clone(cell.value());
        }
        let entry = self.cells.entry(key.clone()).or_insert_with(|| {
            let lock = self
                .shared_lock
                .as_ref()
                .map(Arc::clone)
                .unwrap_or_else(|| Arc::new(CellLock::new()));
            Arc::new(DeferredCell::from_shared(
                key.clone(),
                lock,
                Arc::clone(&self.compute),
                Arc::clone(&self.post_compute),
            ))
        });
        Arc::clone(entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_one_cell_per_key() {
        let computes = Arc::new(AtomicU32::new(0));
        let cache: PostComputeCache<u32, u32, ()> = PostComputeCache::new(
            {
                let computes = Arc::clone(&computes);
                move |key, _ctx| {
                    computes.fetch_add(1, Ordering::SeqCst);
                    Ok((key * 2, ()))
                }
            },
            |_key, _value, (), _ctx| Ok(()),
        );
        let ctx = WorkerContext::current_thread();

        assert_eq!(cache.get(&1, &ctx), Ok(2));
        assert_eq!(cache.get(&1, &ctx), Ok(2));
        assert_eq!(cache.get(&2, &ctx), Ok(4));
        assert_eq!(computes.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_if_computed_peeks_without_computing() {
        let cache: PostComputeCache<u32, u32, ()> = PostComputeCache::new(
            |key, _ctx| Ok((*key, ())),
            |_key, _value, (), _ctx| Ok(()),
        );
        let ctx = WorkerContext::current_thread();

        assert_eq!(cache.get_if_computed(&1), None);
        assert_eq!(cache.get(&1, &ctx), Ok(1));
        assert_eq!(cache.get_if_computed(&1), Some(1));
    }
}
