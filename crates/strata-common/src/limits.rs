//! Centralized limits and tunables for the analysis caches.
//!
//! Keeping these in one place prevents duplicate definitions with
//! inconsistent values and documents the rationale for each limit. Cache
//! sizes can be overridden per instance through constructor parameters; the
//! constants here are the defaults used by the standard provider stack.

use std::time::Duration;

/// Interval between acquisition attempts while waiting on a cell or domain
/// lock.
///
/// Blocking waits are implemented as repeated short-interval lock attempts
/// rather than a single long wait, so an external cancellation signal is
/// observed within one interval. This is a tunable, not a contract: it
/// bounds cancellation latency and does not scale with contention.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Classifier cache size for a module-scope symbol provider.
///
/// Classifiers are the hottest lookups (every type reference resolves one),
/// so the module scope gets the largest cache.
pub const MODULE_CLASSIFIER_CACHE_SIZE: usize = 1_000;

/// Package cache size for a module-scope symbol provider.
///
/// Package existence checks are few and cheap to recompute; the cache mostly
/// absorbs repeated negative lookups from unresolved imports.
pub const MODULE_PACKAGE_CACHE_SIZE: usize = 200;

/// Function/property cache size for a module-scope symbol provider.
///
/// Callable lookups are requested rarely compared to classifiers; this is
/// the individual size of the function and property caches, not their
/// combined size.
pub const MODULE_CALLABLE_CACHE_SIZE: usize = 500;

/// Classifier cache size for a dependency-scope symbol provider.
///
/// Most dependency results are already cached at module scope; the
/// dependency caches only optimize direct queries, so they are half the
/// module sizes.
pub const DEPENDENCY_CLASSIFIER_CACHE_SIZE: usize = 500;

/// Package cache size for a dependency-scope symbol provider.
pub const DEPENDENCY_PACKAGE_CACHE_SIZE: usize = 100;

/// Function/property cache size for a dependency-scope symbol provider.
pub const DEPENDENCY_CALLABLE_CACHE_SIZE: usize = 250;

/// Classifier cache size for a combined deserialized provider.
pub const COMBINED_CLASSIFIER_CACHE_SIZE: usize = 1_000;

/// Callable cache size for a combined deserialized provider. Applies
/// individually to the callable, function, and property caches.
pub const COMBINED_CALLABLE_CACHE_SIZE: usize = 250;
