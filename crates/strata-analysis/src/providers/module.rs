//! The per-module resolution surface: own providers plus dependencies.

use strata_cache::{BoundedCache, NullableCache};
use strata_common::{CallableKey, ClassKey, PackageName};

use crate::providers::combined::collect_considering_facades;
use crate::providers::{ProviderCacheSizes, SymbolProviderKind};
use crate::symbols::{CallableBatch, ClassSymbol};

/// A flattened list of dependency providers behind dependency-scope caches.
///
/// Most dependency results are cached again at module scope by
/// [`ModuleSymbolProvider`], which calls the `*_uncached` entry points here
/// to avoid two cache accesses in sequence. The caches on this type only
/// optimize direct queries against the dependency set.
///
/// Nesting a module provider inside the dependency list is unrepresentable:
/// [`SymbolProviderKind`] has no module variant, so dependency providers are
/// flattened by construction.
pub struct DependencySymbolProvider {
    providers: Vec<SymbolProviderKind>,
    classifiers: NullableCache<ClassKey, ClassSymbol>,
    packages: NullableCache<PackageName, PackageName>,
    functions: BoundedCache<CallableKey, CallableBatch>,
    properties: BoundedCache<CallableKey, CallableBatch>,
}

impl DependencySymbolProvider {
    pub fn new(providers: Vec<SymbolProviderKind>) -> Self {
        Self::with_cache_sizes(providers, ProviderCacheSizes::dependency_scope())
    }

    pub fn with_cache_sizes(providers: Vec<SymbolProviderKind>, sizes: ProviderCacheSizes) -> Self {
        DependencySymbolProvider {
            providers,
            classifiers: NullableCache::new(sizes.classifiers),
            packages: NullableCache::new(sizes.packages),
            functions: BoundedCache::new(sizes.callables),
            properties: BoundedCache::new(sizes.callables),
        }
    }

    pub fn classifier(&self, key: &ClassKey) -> Option<ClassSymbol> {
        self.classifiers.get(key, |key| self.classifier_uncached(key))
    }

    pub fn classifier_uncached(&self, key: &ClassKey) -> Option<ClassSymbol> {
        self.providers
            .iter()
            .find_map(|provider| provider.classifier(key))
    }

    pub fn package(&self, name: &PackageName) -> Option<PackageName> {
        self.packages.get(name, |name| self.package_uncached(name))
    }

    pub fn package_uncached(&self, name: &PackageName) -> Option<PackageName> {
        self.providers
            .iter()
            .find_map(|provider| provider.package(name))
    }

    pub fn functions(&self, key: &CallableKey) -> CallableBatch {
        self.functions
            .get_or_compute(key, |key| self.functions_uncached(key))
    }

    pub fn functions_uncached(&self, key: &CallableKey) -> CallableBatch {
        collect_considering_facades(&self.providers, |provider| provider.functions(key))
    }

    pub fn properties(&self, key: &CallableKey) -> CallableBatch {
        self.properties
            .get_or_compute(key, |key| self.properties_uncached(key))
    }

    pub fn properties_uncached(&self, key: &CallableKey) -> CallableBatch {
        collect_considering_facades(&self.providers, |provider| provider.properties(key))
    }

    /// Callables are requested rarely, so the combined batch is assembled
    /// on every call (still with per-batch facade deduplication) rather
    /// than cached.
    pub fn callables(&self, key: &CallableKey) -> CallableBatch {
        collect_considering_facades(&self.providers, |provider| provider.callables(key))
    }
}

/// The full lookup surface of one module: the module's own providers in
/// order, then the dependency provider. Own providers fully shadow
/// dependencies for single-valued lookups; callable batches concatenate
/// (facade deduplication applies only inside the dependency set — a
/// module's own sources are never deduplicated against its dependencies).
pub struct ModuleSymbolProvider {
    own: Vec<SymbolProviderKind>,
    dependencies: DependencySymbolProvider,
    classifiers: NullableCache<ClassKey, ClassSymbol>,
    packages: NullableCache<PackageName, PackageName>,
    functions: BoundedCache<CallableKey, CallableBatch>,
    properties: BoundedCache<CallableKey, CallableBatch>,
}

impl ModuleSymbolProvider {
    pub fn new(own: Vec<SymbolProviderKind>, dependencies: DependencySymbolProvider) -> Self {
        Self::with_cache_sizes(own, dependencies, ProviderCacheSizes::module_scope())
    }

    pub fn with_cache_sizes(
        own: Vec<SymbolProviderKind>,
        dependencies: DependencySymbolProvider,
        sizes: ProviderCacheSizes,
    ) -> Self {
        ModuleSymbolProvider {
            own,
            dependencies,
            classifiers: NullableCache::new(sizes.classifiers),
            packages: NullableCache::new(sizes.packages),
            functions: BoundedCache::new(sizes.callables),
            properties: BoundedCache::new(sizes.callables),
        }
    }

    pub fn dependencies(&self) -> &DependencySymbolProvider {
        &self.dependencies
    }

    pub fn classifier(&self, key: &ClassKey) -> Option<ClassSymbol> {
        self.classifiers.get(key, |key| {
            self.classifier_without_dependencies(key)
                .or_else(|| self.dependencies.classifier_uncached(key))
        })
    }

    pub fn classifier_without_dependencies(&self, key: &ClassKey) -> Option<ClassSymbol> {
        self.own.iter().find_map(|provider| provider.classifier(key))
    }

    pub fn package(&self, name: &PackageName) -> Option<PackageName> {
        self.packages.get(name, |name| {
            self.package_without_dependencies(name)
                .or_else(|| self.dependencies.package_uncached(name))
        })
    }

    pub fn package_without_dependencies(&self, name: &PackageName) -> Option<PackageName> {
        self.own.iter().find_map(|provider| provider.package(name))
    }

    pub fn functions(&self, key: &CallableKey) -> CallableBatch {
        self.functions.get_or_compute(key, |key| {
            let mut batch = self.functions_without_dependencies(key);
            batch.extend(self.dependencies.functions_uncached(key));
            batch
        })
    }

    pub fn functions_without_dependencies(&self, key: &CallableKey) -> CallableBatch {
        let mut batch = CallableBatch::new();
        for provider in &self.own {
            batch.extend(provider.functions(key));
        }
        batch
    }

    pub fn properties(&self, key: &CallableKey) -> CallableBatch {
        self.properties.get_or_compute(key, |key| {
            let mut batch = self.properties_without_dependencies(key);
            batch.extend(self.dependencies.properties_uncached(key));
            batch
        })
    }

    pub fn properties_without_dependencies(&self, key: &CallableKey) -> CallableBatch {
        let mut batch = CallableBatch::new();
        for provider in &self.own {
            batch.extend(provider.properties(key));
        }
        batch
    }

    /// Callables are assembled per call; the dependency part deduplicates
    /// by facade internally, the own part is trusted as-is.
    pub fn callables(&self, key: &CallableKey) -> CallableBatch {
        let mut batch = CallableBatch::new();
        for provider in &self.own {
            batch.extend(provider.callables(key));
        }
        batch.extend(self.dependencies.callables(key));
        batch
    }
}
