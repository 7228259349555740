//! The cancellable reentrant lock guarding cell computation.
//!
//! Acquisition is a bounded poll: the waiter parks for at most
//! [`LOCK_POLL_INTERVAL`] at a time and checks its cancellation token
//! between attempts, so an external cancellation signal is propagated
//! instead of blocking indefinitely. Reentrancy is required because a cell's
//! post-computation may enter sibling cells that share the same lock through
//! a [`ComputationDomain`](crate::domain::ComputationDomain).

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use strata_common::limits::LOCK_POLL_INTERVAL;
use strata_common::{AnalysisError, WorkerContext, WorkerId};

struct LockState {
    owner: Option<WorkerId>,
    depth: u32,
}

/// A reentrant mutex keyed by [`WorkerId`] with cancellable acquisition.
pub struct CellLock {
    state: Mutex<LockState>,
    freed: Condvar,
}

impl CellLock {
    pub fn new() -> Self {
        CellLock {
            state: Mutex::new(LockState {
                owner: None,
                depth: 0,
            }),
            freed: Condvar::new(),
        }
    }

    // The guarded sections never run user code, so a poisoned state is still
    // consistent and can be reused.
    fn state_guard(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the lock for `ctx`'s worker, re-entrantly.
    ///
    /// While another worker holds the lock, waits in [`LOCK_POLL_INTERVAL`]
    /// slices and checks the cancellation token after each slice. An
    /// uncontended or re-entrant acquisition never checks cancellation.
    pub fn acquire(&self, ctx: &WorkerContext) -> Result<CellLockGuard<'_>, AnalysisError> {
        let worker = ctx.worker();
        let mut state = self.state_guard();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(worker);
                    state.depth = 1;
                    return Ok(CellLockGuard { lock: self, worker });
                }
                Some(current) if current == worker => {
                    state.depth += 1;
                    return Ok(CellLockGuard { lock: self, worker });
                }
                Some(_) => {
                    let (next, _timed_out) = self
                        .freed
                        .wait_timeout(state, LOCK_POLL_INTERVAL)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = next;
                    if ctx.token().is_cancelled() {
                        return Err(AnalysisError::Cancelled);
                    }
                }
            }
        }
    }

    /// Whether the calling context's worker currently holds the lock.
    pub fn is_held_by(&self, worker: WorkerId) -> bool {
        self.state_guard().owner == Some(worker)
    }

    fn release(&self, worker: WorkerId) {
        let mut state = self.state_guard();
        debug_assert_eq!(state.owner, Some(worker), "released by a non-owner");
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.freed.notify_all();
        }
    }
}

impl Default for CellLock {
    fn default() -> Self {
        CellLock::new()
    }
}

/// Releases one level of the reentrant lock on drop.
pub struct CellLockGuard<'a> {
    lock: &'a CellLock,
    worker: WorkerId,
}

impl Drop for CellLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(self.worker);
    }
}
