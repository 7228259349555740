//! The error taxonomy of the analysis caches.
//!
//! Only three things can go wrong from a caller's perspective: the query was
//! cancelled, the resolver failed, or the resolver queried its own
//! not-yet-existing result. Everything else (unmappable syntax nodes, cache
//! eviction) is reported as "no result", never as an error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The query observed its cancellation token while waiting or computing.
    ///
    /// Recoverable: any unpublished cache state has been rolled back, and a
    /// later uncancelled query recomputes from scratch.
    #[error("analysis cancelled")]
    Cancelled,

    /// A value computation re-entered `get` on its own cache entry.
    ///
    /// Fatal and non-retriable: the resolver queried a result it is itself
    /// in the middle of producing. Re-entrant reads are only permitted during
    /// post-computation.
    #[error("value computation re-entered its own cache entry for `{key}`")]
    RecursiveComputation { key: String },

    /// The underlying resolver failed while computing a value.
    ///
    /// Propagated after the cache entry is rolled back; the cache adds no
    /// retry policy of its own.
    #[error("resolver failure while {context}: {message}")]
    Resolver { context: String, message: String },
}

impl AnalysisError {
    pub fn resolver(context: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Resolver {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}
