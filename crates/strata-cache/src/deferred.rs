//! A lazily computed value with a two-phase publish protocol.
//!
//! # Design
//!
//! A [`DeferredCell`] computes its value in two phases: `compute` produces
//! the value (plus auxiliary data), then `post_compute` runs while the value
//! is already stored in the cell. Post-computation exists so that building a
//! value can query other cached values, including values that are currently
//! being computed in case of cycles: during post-computation the cell
//! answers re-entrant reads from the producing worker with the in-flight
//! value, while every other worker keeps waiting for publication.
//!
//! The visibility state machine is monotonic:
//!
//! ```text
//! NotComputed -> Computing -> PostComputing(owner) -> Published
//!      ^                                   |
//!      +--------- failure / cancellation --+
//! ```
//!
//! Regression to `NotComputed` happens only when computation fails or is
//! cancelled before publication, so a later uncancelled caller can retry.
//! Once published, the value is immutable, the read path is lock-free, and
//! the compute closures and the lock handle are dropped (releasing captured
//! environments and, for private locks, the lock itself).
//!
//! # Deadlocks
//!
//! Two cells whose post-computations query each other from two workers would
//! deadlock on their private locks: each worker holds its own cell's lock
//! and waits on the other's. Cells with such mutual dependencies must share
//! one lock through a [`ComputationDomain`](crate::domain::ComputationDomain),
//! which serializes the whole compute/post-compute region of the domain.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use strata_common::{AnalysisError, WorkerContext, WorkerId};

use crate::domain::ComputationDomain;
use crate::locking::CellLock;

/// Computes the value and the auxiliary data handed to post-computation.
pub type ComputeFn<K, V, A> =
    dyn Fn(&K, &WorkerContext) -> Result<(V, A), AnalysisError> + Send + Sync;

/// Runs after the value is stored in the cell; may re-enter `get` on this
/// cell (from the same worker) or on sibling cells of the same domain.
pub type PostComputeFn<K, V, A> =
    dyn Fn(&K, &V, A, &WorkerContext) -> Result<(), AnalysisError> + Send + Sync;

enum CellState<V> {
    NotComputed,
    Computing,
    PostComputing { value: V, owner: WorkerId },
    /// Terminal marker; the value itself lives in [`DeferredCell::published`].
    Published,
}

struct CellFns<K, V, A> {
    compute: Arc<ComputeFn<K, V, A>>,
    post_compute: Arc<PostComputeFn<K, V, A>>,
}

impl<K, V, A> Clone for CellFns<K, V, A> {
    fn clone(&self) -> Self {
        CellFns {
            compute: Arc::clone(&self.compute),
            post_compute: Arc::clone(&self.post_compute),
        }
    }
}

struct CellInner<K, V, A> {
    state: CellState<V>,
    /// `None` once published; shared with every cell of the same domain
    /// otherwise.
    lock: Option<Arc<CellLock>>,
    /// `None` once published.
    fns: Option<CellFns<K, V, A>>,
}

/// A single lazily-computed, two-phase value. See the module docs.
///
/// `V` is expected to be a cheap handle (an id or an `Arc`ed node); `get`
/// clones it out of the cell.
pub struct DeferredCell<K, V, A> {
    key: K,
    inner: Mutex<CellInner<K, V, A>>,
    published: OnceLock<V>,
}

impl<K, V, A> DeferredCell<K, V, A>
where
    K: fmt::Debug,
    V: Clone,
{
    /// A cell with a private lock.
    pub fn new(
        key: K,
        compute: impl Fn(&K, &WorkerContext) -> Result<(V, A), AnalysisError> + Send + Sync + 'static,
        post_compute: impl Fn(&K, &V, A, &WorkerContext) -> Result<(), AnalysisError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::with_parts(
            key,
            Arc::new(CellLock::new()),
            CellFns {
                compute: Arc::new(compute),
                post_compute: Arc::new(post_compute),
            },
        )
    }

    /// A cell whose compute and post-compute phases are serialized with
    /// every other cell of `domain`.
    pub fn in_domain(
        key: K,
        domain: &ComputationDomain,
        compute: impl Fn(&K, &WorkerContext) -> Result<(V, A), AnalysisError> + Send + Sync + 'static,
        post_compute: impl Fn(&K, &V, A, &WorkerContext) -> Result<(), AnalysisError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::with_parts(
            key,
            domain.shared_lock(),
            CellFns {
                compute: Arc::new(compute),
                post_compute: Arc::new(post_compute),
            },
        )
    }

    pub(crate) fn with_parts(key: K, lock: Arc<CellLock>, fns: CellFns<K, V, A>) -> Self {
        DeferredCell {
            key,
            inner: Mutex::new(CellInner {
                state: CellState::NotComputed,
                lock: Some(lock),
                fns: Some(fns),
            }),
            published: OnceLock::new(),
        }
    }

    pub(crate) fn from_shared(
        key: K,
        lock: Arc<CellLock>,
        compute: Arc<ComputeFn<K, V, A>>,
        post_compute: Arc<PostComputeFn<K, V, A>>,
    ) -> Self {
        Self::with_parts(
            key,
            lock,
            CellFns {
                compute,
                post_compute,
            },
        )
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    // The guarded sections never run user code; a poisoned inner state is
    // still consistent.
    fn inner_guard(&self) -> MutexGuard<'_, CellInner<K, V, A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value, computing it if necessary.
    ///
    /// Idempotent; computes at most once per cell under correct concurrent
    /// use. The published fast path takes no lock and never checks
    /// cancellation. A worker that is post-computing this very cell reads
    /// its own in-flight value back. Everyone else blocks (cancellably) on
    /// the cell lock until the value is published.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Cancelled`] if the context is cancelled while
    ///   waiting or computing; the cell rolls back to "not computed".
    /// - [`AnalysisError::RecursiveComputation`] if `compute` re-enters
    ///   `get` on this cell. Fatal: the resolver queried its own
    ///   not-yet-existing result.
    /// - Any error the compute closures return, after rollback.
    pub fn get(&self, ctx: &WorkerContext) -> Result<V, AnalysisError> {
        if let Some(value) = self.published.get() {
            return Ok(value.clone());
        }

        let lock = {
            let inner = self.inner_guard();
            if let CellState::PostComputing { value, owner } = &inner.state {
                if *owner == ctx.worker() {
                    // Re-entrant self-read during post-compute: the logic
                    // producing this value is allowed to query it.
                    return Ok(value.clone());
                }
            }
            match &inner.lock {
                Some(lock) => Arc::clone(lock),
                // Published while we were between the fast path and here.
                None => return Ok(self.published_value()),
            }
        };

        let guard = match lock.acquire(ctx) {
            Ok(guard) => guard,
            Err(err) => {
                // The value may have been published while we were waiting;
                // returning it is strictly better than discarding it on the
                // way out of a cancelled wait.
                if let Some(value) = self.published.get() {
                    return Ok(value.clone());
                }
                return Err(err);
            }
        };
        let result = self.compute_locked(ctx);
        drop(guard);
        result
    }

    /// Non-blocking peek: the value if it has been published, `None` while
    /// unpublished (including mid-compute and mid-post-compute).
    pub fn get_if_computed(&self) -> Option<V> {
        self.published.get().cloned()
    }

    // Runs with the cell lock held by the current worker.
    fn compute_locked(&self, ctx: &WorkerContext) -> Result<V, AnalysisError> {
        let fns = {
            let mut inner = self.inner_guard();
            let fns = match &inner.state {
                CellState::NotComputed => inner
                    .fns
                    .clone()
                    .expect("an unpublished cell retains its compute closures"),
                CellState::Computing => {
                    // Only a re-entrant acquisition can observe `Computing`
                    // under the lock: our own `compute` queried this cell.
                    return Err(AnalysisError::RecursiveComputation {
                        key: format!("{:?}", self.key),
                    });
                }
                CellState::PostComputing { value, owner } => {
                    if *owner == ctx.worker() {
                        return Ok(value.clone());
                    }
                    // A foreign worker cannot be post-computing while we
                    // hold the lock that confines post-computation.
                    panic!(
                        "foreign post-computation observed under the cell lock for {:?}",
                        self.key
                    );
                }
                // Another worker computed the value while we were waiting.
                CellState::Published => return Ok(self.published_value()),
            };
            inner.state = CellState::Computing;
            fns
        };

        // Roll back to NotComputed on any non-publishing exit, including a
        // panic unwinding out of the resolver closures, so a later caller
        // can retry instead of tripping the recursion check.
        let rollback = RollbackGuard { cell: self };

        let (value, data) = (fns.compute)(&self.key, ctx)?;
        {
            let mut inner = self.inner_guard();
            inner.state = CellState::PostComputing {
                value: value.clone(),
                owner: ctx.worker(),
            };
        }
        (fns.post_compute)(&self.key, &value, data, ctx)?;
        rollback.defuse();

        // Publish the value first; only then drop the closures and the lock
        // handle, whose absence implies "published" to late arrivals.
        if self.published.set(value.clone()).is_err() {
            panic!("cell for {:?} published twice", self.key);
        }
        let mut inner = self.inner_guard();
        inner.state = CellState::Published;
        inner.fns = None;
        inner.lock = None;
        drop(inner);

        tracing::trace!(target: "strata::cache", key = ?self.key, "published deferred value");
        Ok(value)
    }

    fn published_value(&self) -> V {
        self.published
            .get()
            .expect("a cell without a lock has been published")
            .clone()
    }
}

struct RollbackGuard<'a, K, V, A> {
    cell: &'a DeferredCell<K, V, A>,
}

impl<K, V, A> RollbackGuard<'_, K, V, A> {
    fn defuse(self) {
        std::mem::forget(self);
    }
}

impl<K, V, A> Drop for RollbackGuard<'_, K, V, A> {
    fn drop(&mut self) {
        let mut inner = self
            .cell
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        inner.state = CellState::NotComputed;
    }
}
