//! Common types for the strata semantic-analysis cache engine.
//!
//! This crate carries the vocabulary shared by every other strata crate:
//!
//! - **Names and keys**: interned name newtypes and the composite keys used
//!   to address classifiers, callables, and physical facades.
//! - **Worker identity**: an opaque [`WorkerId`] and the [`WorkerContext`]
//!   that travels explicitly through every blocking cache operation, so the
//!   engine never depends on a particular threading runtime's identity
//!   primitive.
//! - **Cancellation**: a cooperative [`CancellationToken`] observed by all
//!   cancellable lock waits.
//! - **Errors**: the [`AnalysisError`] taxonomy (cancellation, reentrancy,
//!   resolver failure).
//! - **Limits**: centralized cache sizes and lock-polling tunables.

pub mod cancel;
pub mod error;
pub mod limits;
pub mod names;
pub mod worker;

pub use cancel::CancellationToken;
pub use error::AnalysisError;
pub use names::{
    CallableKey, ClassKey, DeclId, FacadeKey, PackageName, SemanticId, SimpleName, SyntaxId,
};
pub use worker::{WorkerContext, WorkerId};
