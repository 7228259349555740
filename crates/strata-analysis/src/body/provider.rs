//! Element providers: the syntax-to-semantic query surface per declaration.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rustc_hash::FxHashMap;

use strata_common::{AnalysisError, DeclId, SemanticId, SyntaxId, WorkerContext};

use crate::body::container::{ElementContainer, classify};
use crate::body::state::BodyAnalysisState;
use crate::resolver::{BodyResolver, MappingRegion, ResolvePhase, SyntaxTree};

/// One parameter of a declaration, as seen by container classification.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ParameterShape {
    pub node: SyntaxId,
    /// The default value expression, if the parameter has one. Nodes under
    /// it require full resolution capability even though they sit in the
    /// signature.
    pub default_value: Option<SyntaxId>,
}

/// The syntactic shape of a declaration: everything container
/// classification needs, enumerated in source order by the syntax tree
/// provider.
#[derive(Clone, Debug)]
pub struct DeclarationShape {
    pub declaration: SyntaxId,
    pub body_block: Option<SyntaxId>,
    /// The topmost statements of the body block, in source order.
    pub statements: Vec<SyntaxId>,
    pub parameters: Vec<ParameterShape>,
    /// A delegated constructor call, for constructors.
    pub delegated_call: Option<SyntaxId>,
}

/// The consistent pair a reader observes: the analysis state and the body
/// mapping built from exactly that state. Replaced wholesale, never mutated
/// in place.
struct BodySnapshot {
    state: Arc<BodyAnalysisState>,
    mappings: Arc<FxHashMap<SyntaxId, SemanticId>>,
}

impl Clone for BodySnapshot {
    fn clone(&self) -> Self {
        BodySnapshot {
            state: Arc::clone(&self.state),
            mappings: Arc::clone(&self.mappings),
        }
    }
}

/// Answers "which semantic node is behind this syntax node" for one
/// declaration with a decomposable body, analyzing only as much of the body
/// as queries require.
///
/// The signature mapping is built eagerly at construction. Body mappings
/// start empty and grow: each analysis round builds a *new* map by copying
/// the previously registered entries forward unchanged and appending
/// entries for the newly analyzed statements, then swaps it in together
/// with the new state. Readers on the fast path only clone the snapshot's
/// two `Arc`s; they never see a partially-filled map.
pub struct PartialBodyElementProvider {
    decl: DeclId,
    shape: DeclarationShape,
    tree: Arc<dyn SyntaxTree>,
    resolver: Arc<dyn BodyResolver>,
    signature_mappings: FxHashMap<SyntaxId, SemanticId>,
    snapshot: RwLock<BodySnapshot>,
    /// Serializes analysis rounds and snapshot publication for this
    /// declaration. Fast-path readers never take it.
    analysis_lock: Mutex<()>,
}

impl PartialBodyElementProvider {
    /// Builds the provider and its eager signature mapping. The declaration
    /// is resolved to [`ResolvePhase::Types`] first so the signature can be
    /// read back.
    pub fn new(
        decl: DeclId,
        shape: DeclarationShape,
        tree: Arc<dyn SyntaxTree>,
        resolver: Arc<dyn BodyResolver>,
        ctx: &WorkerContext,
    ) -> Result<Self, AnalysisError> {
        resolver.resolve_to_phase(decl, ResolvePhase::Types, ctx)?;

        let mut signature_mappings = FxHashMap::default();
        resolver.record_mappings(decl, MappingRegion::Signature, &mut |syntax, semantic| {
            signature_mappings.insert(syntax, semantic);
        });

        let total_unit_count = shape.statements.len();
        Ok(PartialBodyElementProvider {
            decl,
            shape,
            tree,
            resolver,
            signature_mappings,
            snapshot: RwLock::new(BodySnapshot {
                state: Arc::new(BodyAnalysisState::empty(total_unit_count)),
                mappings: Arc::new(FxHashMap::default()),
            }),
            analysis_lock: Mutex::new(()),
        })
    }

    pub fn decl(&self) -> DeclId {
        self.decl
    }

    /// The latest analysis state observed by this provider.
    pub fn analysis_state(&self) -> Arc<BodyAnalysisState> {
        Arc::clone(&self.read_snapshot().state)
    }

    /// The semantic node behind `node`, analyzing more of the body if the
    /// query requires it.
    ///
    /// Returns `Ok(None)` for nodes that have no mapping: unknown
    /// containers (logged as an internal inconsistency) and syntax shapes
    /// the resolver produced no semantic node for.
    pub fn mapping_for(
        &self,
        node: SyntaxId,
        ctx: &WorkerContext,
    ) -> Result<Option<SemanticId>, AnalysisError> {
        let container = classify(self.tree.as_ref(), &self.shape, node);
        let required_units = match container {
            ElementContainer::Unknown => {
                tracing::error!(
                    target: "strata::body",
                    decl = %self.decl,
                    node = %node,
                    "cannot find the container of a queried element"
                );
                return Ok(None);
            }
            ElementContainer::Signature => return Ok(self.signature_mappings.get(&node).copied()),
            // Parameter analysis is performed before any body statement, so
            // one round with no statements suffices.
            ElementContainer::SignatureBody => 0,
            ElementContainer::Body(index) => index + 1,
            ElementContainer::BodyBlock => self.shape.statements.len(),
        };

        // Fast track: the required prefix is already analyzed and its
        // elements are registered. No lock, no cancellation check; the
        // snapshot swap keeps state and mappings consistent.
        if let Some(mapping) = self.covered_lookup(node, required_units) {
            return Ok(mapping);
        }

        let _round = self
            .analysis_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Double-check under the lock: another worker may have analyzed
        // enough while this one waited.
        if let Some(mapping) = self.covered_lookup(node, required_units) {
            return Ok(mapping);
        }

        self.perform_body_analysis(required_units, ctx)?;
        self.sync_resolver_state();

        Ok(self.read_snapshot().mappings.get(&node).copied())
    }

    fn read_snapshot(&self) -> BodySnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // `Some(lookup result)` when at least one analysis round has run and it
    // covered `required_units` statements; `None` when analysis is needed.
    fn covered_lookup(&self, node: SyntaxId, required_units: usize) -> Option<Option<SemanticId>> {
        let snapshot = self.read_snapshot();
        let state = &snapshot.state;
        if state.rounds_performed > 0 && state.analyzed_unit_count >= required_units {
            Some(snapshot.mappings.get(&node).copied())
        } else {
            None
        }
    }

    /// Drives the external resolver far enough for `required_units`
    /// statements. Anything short of the whole body goes through partial
    /// analysis; a query needing every statement resolves the declaration
    /// to the final phase outright.
    fn perform_body_analysis(
        &self,
        required_units: usize,
        ctx: &WorkerContext,
    ) -> Result<(), AnalysisError> {
        if required_units < self.shape.statements.len() {
            let state = self
                .resolver
                .analyze_partial_body(self.decl, required_units, ctx)?;
            debug_assert!(
                state.analyzed_unit_count >= required_units.min(state.total_unit_count),
                "resolver analyzed less than requested: {state}"
            );
            tracing::debug!(
                target: "strata::body",
                decl = %self.decl,
                state = %state,
                "partial body analysis round"
            );
            Ok(())
        } else {
            self.resolver
                .resolve_to_phase(self.decl, ResolvePhase::BodyResolve, ctx)
        }
    }

    // Folds the resolver's current state into the snapshot. Runs under the
    // analysis lock.
    fn sync_resolver_state(&self) {
        match self.resolver.partial_state(self.decl) {
            Some(new_state) => self.append_newly_analyzed(new_state),
            // The body was resolved without partial analysis; register the
            // whole declaration at once.
            None => self.register_everything(),
        }
    }

    fn append_newly_analyzed(&self, new_state: Arc<BodyAnalysisState>) {
        let snapshot = self.read_snapshot();
        let old_state = &snapshot.state;

        let last_semantic_count = old_state.analyzed_semantic_unit_count;
        let new_semantic_count = new_state.analyzed_semantic_unit_count;

        let register_statements = new_semantic_count > last_semantic_count;
        // The first round also analyzes default parameter values and the
        // delegated constructor call.
        let register_signature_body = old_state.rounds_performed == 0;
        if !register_statements && !register_signature_body {
            return;
        }

        // Entries for previously analyzed statements are copied forward
        // unchanged; they are never recomputed.
        let mut mappings = if old_state.rounds_performed > 0 {
            (*snapshot.mappings).clone()
        } else {
            FxHashMap::default()
        };
        let mut sink = |syntax: SyntaxId, semantic: SemanticId| {
            mappings.insert(syntax, semantic);
        };

        if register_signature_body {
            self.resolver
                .record_mappings(self.decl, MappingRegion::SignatureBody, &mut sink);
        }
        if register_statements {
            for index in last_semantic_count..new_semantic_count {
                self.resolver
                    .record_mappings(self.decl, MappingRegion::Statement(index), &mut sink);
            }
            // The block element itself becomes available once all of its
            // content is analyzed.
            if new_state.analyzed_unit_count == new_state.total_unit_count {
                self.resolver
                    .record_mappings(self.decl, MappingRegion::BodyBlock, &mut sink);
            }
        }

        self.publish(BodySnapshot {
            state: new_state,
            mappings: Arc::new(mappings),
        });
    }

    fn register_everything(&self) {
        let mut mappings = FxHashMap::default();
        let mut sink = |syntax: SyntaxId, semantic: SemanticId| {
            mappings.insert(syntax, semantic);
        };
        self.resolver
            .record_mappings(self.decl, MappingRegion::SignatureBody, &mut sink);
        let total = self.shape.statements.len();
        for index in 0..total {
            self.resolver
                .record_mappings(self.decl, MappingRegion::Statement(index), &mut sink);
        }
        self.resolver
            .record_mappings(self.decl, MappingRegion::BodyBlock, &mut sink);

        let snapshot = self.read_snapshot();
        // A fresh lineage: the declaration went straight to fully analyzed.
        let state = BodyAnalysisState {
            total_unit_count: total,
            analyzed_unit_count: total,
            analyzed_semantic_unit_count: total.max(snapshot.state.analyzed_semantic_unit_count),
            rounds_performed: snapshot.state.rounds_performed + 1,
            previous: None,
        };
        self.publish(BodySnapshot {
            state: Arc::new(state),
            mappings: Arc::new(mappings),
        });
    }

    fn publish(&self, snapshot: BodySnapshot) {
        let mut slot = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = snapshot;
    }
}

/// An eagerly built mapping for a declaration without a decomposable body
/// (or one where partial analysis is not worth it): the declaration is
/// resolved fully once and every element is registered up front.
pub struct EagerElementProvider {
    mappings: FxHashMap<SyntaxId, SemanticId>,
}

impl EagerElementProvider {
    pub fn new(
        decl: DeclId,
        resolver: &dyn BodyResolver,
        ctx: &WorkerContext,
    ) -> Result<Self, AnalysisError> {
        resolver.resolve_to_phase(decl, ResolvePhase::BodyResolve, ctx)?;
        let mut mappings = FxHashMap::default();
        resolver.record_mappings(decl, MappingRegion::Declaration, &mut |syntax, semantic| {
            mappings.insert(syntax, semantic);
        });
        Ok(EagerElementProvider { mappings })
    }

    pub fn mapping_for(&self, node: SyntaxId) -> Option<SemanticId> {
        self.mappings.get(&node).copied()
    }
}

/// The closed set of element provider shapes, dispatched by matching.
pub enum DeclarationElementProvider {
    Eager(EagerElementProvider),
    PartialBody(PartialBodyElementProvider),
}

impl DeclarationElementProvider {
    pub fn mapping_for(
        &self,
        node: SyntaxId,
        ctx: &WorkerContext,
    ) -> Result<Option<SemanticId>, AnalysisError> {
        match self {
            DeclarationElementProvider::Eager(provider) => Ok(provider.mapping_for(node)),
            DeclarationElementProvider::PartialBody(provider) => provider.mapping_for(node, ctx),
        }
    }
}
