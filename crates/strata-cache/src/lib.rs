//! Concurrency-safe deferred computation for semantic-analysis caches.
//!
//! This crate implements the lazily-computed, once-published value machinery
//! underneath the symbol caches:
//!
//! - [`DeferredCell`]: a single two-phase (compute, post-compute) value with
//!   a visibility state machine. The value is computed at most once; while
//!   post-computation runs, the value is visible only to the worker
//!   producing it.
//! - [`CellLock`]: the cancellable reentrant lock serializing a cell's
//!   compute and post-compute phases. Waits are bounded polls so a
//!   cancellation signal is observed instead of blocking indefinitely.
//! - [`ComputationDomain`] / [`DomainRegistry`]: a shared lock for groups of
//!   cells whose post-computations may query each other, converting a
//!   potential cross-thread deadlock into serialization.
//! - [`PostComputeCache`]: a concurrent keyed map of deferred cells created
//!   on demand.
//! - [`BoundedCache`] / [`NullableCache`]: size-bounded get-or-compute maps
//!   with approximate-LRU eviction and first-class negative entries.
//!
//! Key guarantees:
//! - A published value is immutable and its read path is lock-free.
//! - Cancellation before publication rolls an entry back to "not computed";
//!   a later uncancelled caller recomputes from scratch.
//! - Eviction from bounded caches is only ever observable as extra work,
//!   never as a wrong result.

pub mod bounded;
pub mod deferred;
pub mod domain;
pub mod locking;
pub mod postcompute;

pub use bounded::{BoundedCache, NullableCache};
pub use deferred::DeferredCell;
pub use domain::{ComputationDomain, DomainRegistry};
pub use locking::CellLock;
pub use postcompute::PostComputeCache;
