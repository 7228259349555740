//! Cooperative cancellation.
//!
//! All blocking waits in the caches are bounded polls that observe a
//! [`CancellationToken`] between attempts, so cancellation latency is
//! bounded by the polling interval rather than by the longest computation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AnalysisError;

/// A shared, one-way cancellation flag. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Requests cancellation. Irrevocable.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}
