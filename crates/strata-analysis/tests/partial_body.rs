//! Incremental partial-body analysis: analyze-just-enough, monotonic
//! mapping growth, container handling, and wholesale registration.
//!
//! The scripted resolver below is a reference implementation of the
//! [`BodyResolver`] contract over a fixed declaration:
//!
//! ```text
//! decl(1) { param(3) = default(4); body(2): stmt(10..14) }
//! ```
//!
//! Each statement `10 + i` has one child `20 + i`; statement regions map
//! `10 + i -> sem(100 + i)` and `20 + i -> sem(150 + i)`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;

use rustc_hash::FxHashMap;

use strata_analysis::{
    BodyAnalysisState, BodyResolver, DeclarationElementProvider, DeclarationShape,
    EagerElementProvider, ElementProviderRegistry, MappingRegion, ParameterShape,
    PartialBodyElementProvider, ResolvePhase, SyntaxTree,
};
use strata_common::{AnalysisError, DeclId, SemanticId, SyntaxId, WorkerContext};

const DECL: SyntaxId = SyntaxId(1);
const BLOCK: SyntaxId = SyntaxId(2);
const PARAM: SyntaxId = SyntaxId(3);
const DEFAULT_VALUE: SyntaxId = SyntaxId(4);
const STATEMENT_COUNT: usize = 5;

fn statement(index: usize) -> SyntaxId {
    SyntaxId(10 + index as u32)
}

fn statement_child(index: usize) -> SyntaxId {
    SyntaxId(20 + index as u32)
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env("STRATA_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

struct FixtureTree {
    parents: FxHashMap<SyntaxId, SyntaxId>,
}

impl FixtureTree {
    fn new() -> Self {
        let mut parents = FxHashMap::default();
        parents.insert(BLOCK, DECL);
        parents.insert(PARAM, DECL);
        parents.insert(DEFAULT_VALUE, PARAM);
        for index in 0..STATEMENT_COUNT {
            parents.insert(statement(index), BLOCK);
            parents.insert(statement_child(index), statement(index));
        }
        // An extra child of statement 3 the resolver produces no semantic
        // node for.
        parents.insert(SyntaxId(30), statement(3));
        FixtureTree { parents }
    }
}

impl SyntaxTree for FixtureTree {
    fn parent(&self, node: SyntaxId) -> Option<SyntaxId> {
        self.parents.get(&node).copied()
    }

    fn modification_stamp(&self, _node: SyntaxId) -> u64 {
        1
    }
}

fn fixture_shape() -> DeclarationShape {
    DeclarationShape {
        declaration: DECL,
        body_block: Some(BLOCK),
        statements: (0..STATEMENT_COUNT).map(statement).collect(),
        parameters: vec![ParameterShape {
            node: PARAM,
            default_value: Some(DEFAULT_VALUE),
        }],
        delegated_call: None,
    }
}

/// Analyzes exactly what it is asked to and tracks its own partial state,
/// unless `tracks_partial_state` is off — then it behaves like a resolver
/// that only ever resolves declarations wholesale.
struct ScriptedResolver {
    tracks_partial_state: bool,
    state: Mutex<Option<Arc<BodyAnalysisState>>>,
    analyze_calls: AtomicUsize,
    full_resolve_calls: AtomicUsize,
}

impl ScriptedResolver {
    fn new() -> Self {
        ScriptedResolver {
            tracks_partial_state: true,
            state: Mutex::new(None),
            analyze_calls: AtomicUsize::new(0),
            full_resolve_calls: AtomicUsize::new(0),
        }
    }

    fn without_partial_tracking() -> Self {
        ScriptedResolver {
            tracks_partial_state: false,
            ..ScriptedResolver::new()
        }
    }

    fn advance_to(&self, target_unit_count: usize) -> Arc<BodyAnalysisState> {
        let target = target_unit_count.min(STATEMENT_COUNT);
        let mut slot = self.state.lock().expect("resolver state lock");
        let next = match &*slot {
            None => Arc::new(BodyAnalysisState {
                total_unit_count: STATEMENT_COUNT,
                analyzed_unit_count: target,
                analyzed_semantic_unit_count: target,
                rounds_performed: 1,
                previous: None,
            }),
            Some(current) if target > current.analyzed_unit_count => {
                Arc::new(BodyAnalysisState::advanced(current, target, target))
            }
            Some(current) => Arc::clone(current),
        };
        *slot = Some(Arc::clone(&next));
        next
    }
}

impl BodyResolver for ScriptedResolver {
    fn resolve_to_phase(
        &self,
        _decl: DeclId,
        phase: ResolvePhase,
        _ctx: &WorkerContext,
    ) -> Result<(), AnalysisError> {
        if phase == ResolvePhase::BodyResolve {
            self.full_resolve_calls.fetch_add(1, Ordering::SeqCst);
            if self.tracks_partial_state {
                self.advance_to(STATEMENT_COUNT);
            }
        }
        Ok(())
    }

    fn analyze_partial_body(
        &self,
        _decl: DeclId,
        target_unit_count: usize,
        _ctx: &WorkerContext,
    ) -> Result<Arc<BodyAnalysisState>, AnalysisError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.advance_to(target_unit_count))
    }

    fn partial_state(&self, _decl: DeclId) -> Option<Arc<BodyAnalysisState>> {
        if !self.tracks_partial_state {
            return None;
        }
        self.state.lock().expect("resolver state lock").clone()
    }

    fn record_mappings(
        &self,
        decl: DeclId,
        region: MappingRegion,
        sink: &mut dyn FnMut(SyntaxId, SemanticId),
    ) {
        match region {
            MappingRegion::Signature => {
                sink(DECL, SemanticId(200));
                sink(PARAM, SemanticId(201));
            }
            MappingRegion::SignatureBody => sink(DEFAULT_VALUE, SemanticId(300)),
            MappingRegion::Statement(index) => {
                sink(statement(index), SemanticId(100 + index as u32));
                sink(statement_child(index), SemanticId(150 + index as u32));
            }
            MappingRegion::BodyBlock => sink(BLOCK, SemanticId(400)),
            MappingRegion::Declaration => {
                self.record_mappings(decl, MappingRegion::Signature, sink);
                self.record_mappings(decl, MappingRegion::SignatureBody, sink);
                for index in 0..STATEMENT_COUNT {
                    self.record_mappings(decl, MappingRegion::Statement(index), sink);
                }
                self.record_mappings(decl, MappingRegion::BodyBlock, sink);
            }
        }
    }
}

fn build_provider(resolver: &Arc<ScriptedResolver>) -> PartialBodyElementProvider {
    init_tracing();
    let ctx = WorkerContext::current_thread();
    let resolver_dyn: Arc<dyn BodyResolver> = resolver.clone();
    PartialBodyElementProvider::new(
        DeclId(1),
        fixture_shape(),
        Arc::new(FixtureTree::new()),
        resolver_dyn,
        &ctx,
    )
    .expect("provider built")
}

#[test]
fn test_analyzes_just_enough_then_extends_to_the_full_body() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    // Query under statement index 2: exactly the first three statements
    // get analyzed.
    let mapping = provider.mapping_for(statement_child(2), &ctx).expect("query succeeded");
    assert_eq!(mapping, Some(SemanticId(152)));
    assert_eq!(provider.analysis_state().analyzed_unit_count, 3);
    assert_eq!(resolver.analyze_calls.load(Ordering::SeqCst), 1);
    assert!(!provider.analysis_state().is_fully_analyzed());

    // The body block is not mapped yet.
    // (No further analysis is triggered by asking for covered statements.)
    let mapping = provider.mapping_for(statement(1), &ctx).expect("query succeeded");
    assert_eq!(mapping, Some(SemanticId(101)));
    assert_eq!(resolver.analyze_calls.load(Ordering::SeqCst), 1);

    // Query at the last statement: the remainder is analyzed and the body
    // block node itself becomes mapped.
    let mapping = provider.mapping_for(statement_child(4), &ctx).expect("query succeeded");
    assert_eq!(mapping, Some(SemanticId(154)));
    assert_eq!(provider.analysis_state().analyzed_unit_count, 5);
    assert!(provider.analysis_state().is_fully_analyzed());

    let block = provider.mapping_for(BLOCK, &ctx).expect("query succeeded");
    assert_eq!(block, Some(SemanticId(400)));
}

#[test]
fn test_established_mappings_survive_later_rounds_unchanged() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    let before = provider.mapping_for(statement(0), &ctx).expect("query succeeded");
    assert_eq!(before, Some(SemanticId(100)));

    for index in 1..STATEMENT_COUNT {
        provider.mapping_for(statement(index), &ctx).expect("query succeeded");
        let after = provider.mapping_for(statement(0), &ctx).expect("query succeeded");
        assert_eq!(after, before);
    }
}

#[test]
fn test_monotonic_analysis_across_increasing_queries() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    let mut last_analyzed = 0;
    for index in 0..STATEMENT_COUNT {
        provider.mapping_for(statement(index), &ctx).expect("query succeeded");
        let analyzed = provider.analysis_state().analyzed_unit_count;
        assert!(analyzed >= last_analyzed, "analysis shrank: {analyzed} < {last_analyzed}");
        assert!(analyzed >= index + 1);
        last_analyzed = analyzed;
    }
}

#[test]
fn test_signature_queries_need_no_body_analysis() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    assert_eq!(
        provider.mapping_for(PARAM, &ctx).expect("query succeeded"),
        Some(SemanticId(201))
    );
    assert_eq!(
        provider.mapping_for(DECL, &ctx).expect("query succeeded"),
        Some(SemanticId(200))
    );
    assert_eq!(resolver.analyze_calls.load(Ordering::SeqCst), 0);
    assert_eq!(resolver.full_resolve_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_default_parameter_value_triggers_a_zero_statement_round() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    let mapping = provider.mapping_for(DEFAULT_VALUE, &ctx).expect("query succeeded");
    assert_eq!(mapping, Some(SemanticId(300)));
    assert_eq!(resolver.analyze_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.analysis_state().analyzed_unit_count, 0);

    // Covered thereafter without further rounds.
    let mapping = provider.mapping_for(DEFAULT_VALUE, &ctx).expect("query succeeded");
    assert_eq!(mapping, Some(SemanticId(300)));
    assert_eq!(resolver.analyze_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_container_is_a_logged_miss() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    assert_eq!(provider.mapping_for(SyntaxId(99), &ctx).expect("query succeeded"), None);
    assert_eq!(resolver.analyze_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_node_without_semantic_counterpart_is_a_miss_not_an_error() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    // Node 30 sits under statement 3, which gets analyzed, but the
    // resolver reports no semantic node for it.
    assert_eq!(provider.mapping_for(SyntaxId(30), &ctx).expect("query succeeded"), None);
    assert_eq!(provider.analysis_state().analyzed_unit_count, 4);
}

#[test]
fn test_wholesale_registration_when_resolver_has_no_partial_state() {
    let resolver = Arc::new(ScriptedResolver::without_partial_tracking());
    let provider = build_provider(&resolver);
    let ctx = WorkerContext::current_thread();

    // The block query needs the whole body; the resolver resolves it
    // wholesale and every element is registered at once.
    assert_eq!(
        provider.mapping_for(BLOCK, &ctx).expect("query succeeded"),
        Some(SemanticId(400))
    );
    assert_eq!(resolver.full_resolve_calls.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.analyze_calls.load(Ordering::SeqCst), 0);
    assert!(provider.analysis_state().is_fully_analyzed());

    assert_eq!(
        provider.mapping_for(statement_child(0), &ctx).expect("query succeeded"),
        Some(SemanticId(150))
    );
    assert_eq!(resolver.full_resolve_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_queries_observe_growing_coverage() {
    let resolver = Arc::new(ScriptedResolver::new());
    let provider = Arc::new(build_provider(&resolver));

    let handles: Vec<_> = (0..STATEMENT_COUNT)
        .map(|index| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                let ctx = WorkerContext::current_thread();
                provider.mapping_for(statement(index), &ctx)
            })
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let mapping = handle.join().expect("thread completed").expect("query succeeded");
        assert_eq!(mapping, Some(SemanticId(100 + index as u32)));
    }
    assert!(provider.analysis_state().analyzed_unit_count >= STATEMENT_COUNT);
    assert!(provider.analysis_state().is_fully_analyzed());
}

#[test]
fn test_eager_provider_maps_the_whole_declaration() {
    init_tracing();
    let resolver = Arc::new(ScriptedResolver::new());
    let ctx = WorkerContext::current_thread();
    let provider =
        EagerElementProvider::new(DeclId(1), resolver.as_ref(), &ctx).expect("provider built");

    assert_eq!(provider.mapping_for(statement(0)), Some(SemanticId(100)));
    assert_eq!(provider.mapping_for(BLOCK), Some(SemanticId(400)));
    assert_eq!(provider.mapping_for(PARAM), Some(SemanticId(201)));
    assert_eq!(provider.mapping_for(SyntaxId(99)), None);
    assert_eq!(resolver.full_resolve_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_registry_builds_once_and_rebuilds_after_invalidation() {
    init_tracing();
    let resolver = Arc::new(ScriptedResolver::new());
    let registry = ElementProviderRegistry::new();
    let builds = AtomicUsize::new(0);
    let ctx = WorkerContext::current_thread();

    let build = |resolver: &Arc<ScriptedResolver>,
                 builds: &AtomicUsize|
     -> Result<DeclarationElementProvider, AnalysisError> {
        builds.fetch_add(1, Ordering::SeqCst);
        Ok(DeclarationElementProvider::Eager(EagerElementProvider::new(
            DeclId(1),
            resolver.as_ref(),
            &ctx,
        )?))
    };

    let provider = registry
        .provider_for(DeclId(1), || build(&resolver, &builds))
        .expect("provider built");
    assert_eq!(
        provider.mapping_for(statement(0), &ctx).expect("query succeeded"),
        Some(SemanticId(100))
    );

    registry
        .provider_for(DeclId(1), || build(&resolver, &builds))
        .expect("provider built");
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);

    // The declaration changed: its owner drops the provider, the next
    // query starts a fresh one.
    registry.invalidate(DeclId(1));
    assert!(registry.is_empty());
    registry
        .provider_for(DeclId(1), || build(&resolver, &builds))
        .expect("provider built");
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}
