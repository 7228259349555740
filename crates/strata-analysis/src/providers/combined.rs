//! Merging several providers into one lookup surface.

use rustc_hash::{FxHashMap, FxHashSet};

use strata_cache::{BoundedCache, NullableCache};
use strata_common::limits;
use strata_common::{CallableKey, ClassKey, FacadeKey, PackageName};

use crate::providers::SymbolProviderKind;
use crate::symbols::{CallableBatch, ClassSymbol, SignatureKey, SourcePriority};

/// A symbol provider that merges the results of several providers, in
/// priority order: for single-valued lookups the first provider with a
/// result fully shadows later ones; for callable lookups the batches are
/// concatenated with facade deduplication and the source-priority rule.
///
/// The callable cache is separate from the function and property caches:
/// a combined callables result cannot be assembled from the cached function
/// and property batches, because facade deduplication must walk the symbols
/// provider by provider in a single pass.
pub struct CombinedSymbolProvider {
    providers: Vec<SymbolProviderKind>,
    classifiers: NullableCache<ClassKey, ClassSymbol>,
    callables: BoundedCache<CallableKey, CallableBatch>,
    functions: BoundedCache<CallableKey, CallableBatch>,
    properties: BoundedCache<CallableKey, CallableBatch>,
}

impl CombinedSymbolProvider {
    pub fn new(
        providers: Vec<SymbolProviderKind>,
        classifier_cache_size: usize,
        callable_cache_size: usize,
    ) -> Self {
        CombinedSymbolProvider {
            providers,
            classifiers: NullableCache::new(classifier_cache_size),
            callables: BoundedCache::new(callable_cache_size),
            functions: BoundedCache::new(callable_cache_size),
            properties: BoundedCache::new(callable_cache_size),
        }
    }

    /// Combines `providers` behind one cache when there is more than one;
    /// a single provider is returned as-is, and an empty list collapses to
    /// `None`.
    pub fn merge(providers: Vec<SymbolProviderKind>) -> Option<SymbolProviderKind> {
        match providers.len() {
            0 => None,
            1 => providers.into_iter().next(),
            _ => Some(SymbolProviderKind::Combined(Box::new(
                CombinedSymbolProvider::new(
                    providers,
                    limits::COMBINED_CLASSIFIER_CACHE_SIZE,
                    limits::COMBINED_CALLABLE_CACHE_SIZE,
                ),
            ))),
        }
    }

    pub fn classifier(&self, key: &ClassKey) -> Option<ClassSymbol> {
        self.classifiers.get(key, |key| {
            self.providers
                .iter()
                .find_map(|provider| provider.classifier(key))
        })
    }

    pub fn package(&self, name: &PackageName) -> Option<PackageName> {
        self.providers
            .iter()
            .find_map(|provider| provider.package(name))
    }

    pub fn callables(&self, key: &CallableKey) -> CallableBatch {
        self.callables.get_or_compute(key, |key| {
            collect_considering_facades(&self.providers, |provider| provider.callables(key))
        })
    }

    pub fn functions(&self, key: &CallableKey) -> CallableBatch {
        self.functions.get_or_compute(key, |key| {
            collect_considering_facades(&self.providers, |provider| provider.functions(key))
        })
    }

    pub fn properties(&self, key: &CallableKey) -> CallableBatch {
        self.properties.get_or_compute(key, |key| {
            collect_considering_facades(&self.providers, |provider| provider.properties(key))
        })
    }
}

/// Walks the providers in priority order, appending each provider's batch
/// with facade deduplication, then applies the source-priority rule to the
/// merged result.
pub(crate) fn collect_considering_facades(
    providers: &[SymbolProviderKind],
    get_batch: impl Fn(&SymbolProviderKind) -> CallableBatch,
) -> CallableBatch {
    let mut collected = CallableBatch::new();
    let mut seen_facades: FxHashSet<FacadeKey> = FxHashSet::default();
    for provider in providers {
        push_batch_considering_facades(&mut collected, get_batch(provider), &mut seen_facades);
    }
    prefer_higher_priority_sources(collected)
}

/// Appends `batch` to `collected`, dropping symbols whose facade was
/// already contributed by an *earlier* provider's batch.
///
/// `batch` must be the unit produced by a single provider: symbols within
/// it may legitimately share a facade that is new in this batch, so the
/// batch is never deduplicated against itself — only against
/// `seen_facades`. Calling this with results from multiple providers merged
/// into one batch would let duplicate callables slip through.
pub(crate) fn push_batch_considering_facades(
    collected: &mut CallableBatch,
    batch: CallableBatch,
    seen_facades: &mut FxHashSet<FacadeKey>,
) {
    if batch.is_empty() {
        return;
    }
    let mut batch_facades: FxHashSet<FacadeKey> = FxHashSet::default();
    for symbol in batch {
        match symbol.facade.clone() {
            Some(facade) => {
                let seen_earlier = seen_facades.contains(&facade);
                batch_facades.insert(facade);
                if !seen_earlier {
                    collected.push(symbol);
                }
            }
            // Symbols without a physical facade are never deduplicated.
            None => collected.push(symbol),
        }
    }
    seen_facades.extend(batch_facades);
}

/// Applies the source-priority shadowing rule: among symbols with the same
/// signature key, only those with the highest declared priority survive.
/// Symbols of equal priority are never considered equivalent, so a group
/// whose members all share one priority is kept whole.
pub(crate) fn prefer_higher_priority_sources(batch: CallableBatch) -> CallableBatch {
    if batch.len() < 2 {
        return batch;
    }
    let mut highest: FxHashMap<SignatureKey, SourcePriority> = FxHashMap::default();
    for symbol in &batch {
        let entry = highest.entry(symbol.signature).or_insert(symbol.priority);
        if symbol.priority > *entry {
            *entry = symbol.priority;
        }
    }
    batch
        .into_iter()
        .filter(|symbol| highest[&symbol.signature] == symbol.priority)
        .collect()
}
