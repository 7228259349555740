//! Bounded caching over a single symbol source.

use std::sync::Arc;

use strata_cache::{BoundedCache, NullableCache};
use strata_common::limits;
use strata_common::{CallableKey, ClassKey, PackageName};

use crate::providers::SymbolSource;
use crate::symbols::{CallableBatch, ClassSymbol};

/// Cache sizes for one caching provider. `callables` is the individual size
/// of the function and property caches, not their combined size.
#[derive(Clone, Copy, Debug)]
pub struct ProviderCacheSizes {
    pub classifiers: usize,
    pub packages: usize,
    pub callables: usize,
}

impl ProviderCacheSizes {
    /// Defaults for a module-scope provider.
    pub const fn module_scope() -> Self {
        ProviderCacheSizes {
            classifiers: limits::MODULE_CLASSIFIER_CACHE_SIZE,
            packages: limits::MODULE_PACKAGE_CACHE_SIZE,
            callables: limits::MODULE_CALLABLE_CACHE_SIZE,
        }
    }

    /// Defaults for a dependency-scope provider.
    pub const fn dependency_scope() -> Self {
        ProviderCacheSizes {
            classifiers: limits::DEPENDENCY_CLASSIFIER_CACHE_SIZE,
            packages: limits::DEPENDENCY_PACKAGE_CACHE_SIZE,
            callables: limits::DEPENDENCY_CALLABLE_CACHE_SIZE,
        }
    }
}

impl Default for ProviderCacheSizes {
    fn default() -> Self {
        ProviderCacheSizes::module_scope()
    }
}

/// A symbol provider that caches lookups into one source in bounded caches.
///
/// Classifier and package lookups cache negative results explicitly: a key
/// that resolved to nothing is remembered and does not hit the source
/// again (until the entry is evicted, which only costs a recomputation).
/// Function and property batches are cached including empty batches.
pub struct CachingSymbolProvider {
    source: Arc<dyn SymbolSource>,
    classifiers: NullableCache<ClassKey, ClassSymbol>,
    packages: NullableCache<PackageName, PackageName>,
    functions: BoundedCache<CallableKey, CallableBatch>,
    properties: BoundedCache<CallableKey, CallableBatch>,
}

impl CachingSymbolProvider {
    pub fn new(source: Arc<dyn SymbolSource>, sizes: ProviderCacheSizes) -> Self {
        CachingSymbolProvider {
            source,
            classifiers: NullableCache::new(sizes.classifiers),
            packages: NullableCache::new(sizes.packages),
            functions: BoundedCache::new(sizes.callables),
            properties: BoundedCache::new(sizes.callables),
        }
    }

    pub fn classifier(&self, key: &ClassKey) -> Option<ClassSymbol> {
        self.classifiers.get(key, |key| self.source.classifier(key))
    }

    pub fn package(&self, name: &PackageName) -> Option<PackageName> {
        self.packages.get(name, |name| self.source.package(name))
    }

    pub fn functions(&self, key: &CallableKey) -> CallableBatch {
        self.functions
            .get_or_compute(key, |key| self.source.functions(key))
    }

    pub fn properties(&self, key: &CallableKey) -> CallableBatch {
        self.properties
            .get_or_compute(key, |key| self.source.properties(key))
    }

    /// Functions and properties as one batch. A single source's batch is
    /// internally consistent and is never deduplicated against itself.
    pub fn callables(&self, key: &CallableKey) -> CallableBatch {
        let mut batch = self.functions(key);
        batch.extend(self.properties(key));
        batch
    }
}
