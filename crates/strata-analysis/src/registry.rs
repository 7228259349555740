//! Per-declaration ownership of element providers.

use std::sync::Arc;

use dashmap::DashMap;

use strata_common::{AnalysisError, DeclId};

use crate::body::DeclarationElementProvider;

/// Owns one element provider per declaration, created on first query.
///
/// Invalidation is wholesale: when a declaration's syntax changes (detected
/// by its owner through modification stamps), [`invalidate`] discards the
/// provider and the next query builds a fresh one, starting a new analysis
/// lineage. Providers are never patched in place.
///
/// [`invalidate`]: ElementProviderRegistry::invalidate
#[derive(Default)]
pub struct ElementProviderRegistry {
    providers: DashMap<DeclId, Arc<DeclarationElementProvider>>,
}

impl ElementProviderRegistry {
    pub fn new() -> Self {
        ElementProviderRegistry::default()
    }

    /// The provider for `decl`, building it with `build` if absent. When
    /// two workers race, the first stored provider wins and the loser's
    /// build result is dropped.
    pub fn provider_for(
        &self,
        decl: DeclId,
        build: impl FnOnce() -> Result<DeclarationElementProvider, AnalysisError>,
    ) -> Result<Arc<DeclarationElementProvider>, AnalysisError> {
        if let Some(provider) = self.providers.get(&decl) {
            return Ok(Arc::clone(provider.value()));
        }
        // Built outside the map lock: building may drive the resolver.
        let built = Arc::new(build()?);
        let entry = self.providers.entry(decl).or_insert(built);
        Ok(Arc::clone(entry.value()))
    }

    /// Discards the provider of a changed declaration.
    pub fn invalidate(&self, decl: DeclId) {
        self.providers.remove(&decl);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
