//! Worker identity and the per-query call context.
//!
//! Cache entries in a post-computing state are visible only to the worker
//! that is producing them. Rather than reading a thread id from the runtime
//! inside the caches, the current worker travels explicitly in a
//! [`WorkerContext`]; this keeps the design portable to cooperative-task
//! schedulers where "current worker" is a task handle, not an OS thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cancel::CancellationToken;
use crate::error::AnalysisError;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_THREAD_WORKER: WorkerId =
        WorkerId(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed));
}

/// Opaque identity of a worker. Two contexts created on the same OS thread
/// share a worker id; ids are never reused within a process.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    /// The worker id assigned to the calling thread.
    pub fn current_thread() -> WorkerId {
        CURRENT_THREAD_WORKER.with(|worker| *worker)
    }
}

impl fmt::Debug for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker#{}", self.0)
    }
}

/// The context a query carries through every cache operation: who is asking,
/// and how to observe cancellation while blocked.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    worker: WorkerId,
    token: CancellationToken,
}

impl WorkerContext {
    /// A context for the calling thread with a fresh, never-cancelled token.
    pub fn current_thread() -> Self {
        WorkerContext {
            worker: WorkerId::current_thread(),
            token: CancellationToken::new(),
        }
    }

    /// A context for the calling thread observing the given token.
    pub fn with_token(token: CancellationToken) -> Self {
        WorkerContext {
            worker: WorkerId::current_thread(),
            token,
        }
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Propagates [`AnalysisError::Cancelled`] if the token has been
    /// cancelled. Resolvers are expected to call this at their own
    /// checkpoints; the caches call it between lock-polling intervals.
    pub fn check_cancelled(&self) -> Result<(), AnalysisError> {
        self.token.check()
    }
}
