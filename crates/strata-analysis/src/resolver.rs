//! Trait boundaries to the underlying resolver and syntax tree.
//!
//! The semantics of resolution (type inference, overload resolution) are
//! out of scope for this crate; these traits pin down only what the caches
//! rely on: monotonic phase advancement, "analyze at least this much"
//! partial body analysis, and readback of syntax-to-semantic pairs for a
//! region of a declaration.

use std::sync::Arc;

use strata_common::{AnalysisError, DeclId, SemanticId, SyntaxId, WorkerContext};

use crate::body::BodyAnalysisState;

/// Resolution phases, in order. A declaration only ever moves forward
/// through this ladder.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ResolvePhase {
    Raw,
    Imports,
    SuperTypes,
    Types,
    Status,
    Contracts,
    ImplicitTypes,
    BodyResolve,
}

/// A region of a declaration whose syntax-to-semantic pairs can be read
/// back after the corresponding analysis has run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MappingRegion {
    /// Everything outside the executable parts: the declaration header,
    /// parameter declarations, type references.
    Signature,
    /// Signature parts that need full resolution capability: default
    /// parameter values and delegated constructor calls.
    SignatureBody,
    /// One analyzed body statement, by semantic statement index.
    Statement(usize),
    /// The body block node itself (available once the body is fully
    /// analyzed).
    BodyBlock,
    /// The whole declaration at once, for eager providers.
    Declaration,
}

/// The external resolver driving a declaration's analysis.
pub trait BodyResolver: Send + Sync {
    /// Advances `decl` to at least `phase`. Idempotent if the declaration
    /// is already at or past it.
    fn resolve_to_phase(
        &self,
        decl: DeclId,
        phase: ResolvePhase,
        ctx: &WorkerContext,
    ) -> Result<(), AnalysisError>;

    /// Analyzes at least the first `target_unit_count` body statements of
    /// `decl` (the count form of "analyze through statement index
    /// `target_unit_count - 1`"); may over-analyze if that is cheaper. The
    /// returned state must satisfy
    /// `analyzed_unit_count >= min(target_unit_count, total_unit_count)`.
    /// A target of zero analyzes only the signature-body parts.
    fn analyze_partial_body(
        &self,
        decl: DeclId,
        target_unit_count: usize,
        ctx: &WorkerContext,
    ) -> Result<Arc<BodyAnalysisState>, AnalysisError>;

    /// The resolver-side partial analysis state after the last round, or
    /// `None` if the body was resolved without partial analysis (or never
    /// analyzed).
    fn partial_state(&self, decl: DeclId) -> Option<Arc<BodyAnalysisState>>;

    /// Reports every syntax-to-semantic pair of `region` into `sink`. Only
    /// regions covered by prior analysis may be requested.
    fn record_mappings(
        &self,
        decl: DeclId,
        region: MappingRegion,
        sink: &mut dyn FnMut(SyntaxId, SemanticId),
    );
}

/// The syntax tree owned by the embedding engine.
pub trait SyntaxTree: Send + Sync {
    /// The parent of `node`, or `None` at the root.
    fn parent(&self, node: SyntaxId) -> Option<SyntaxId>;

    /// Monotonically increasing modification stamp of the subtree at
    /// `node`. Callers of this crate compare stamps to decide when to
    /// discard and rebuild cached providers; the caches themselves never
    /// inspect stamps.
    fn modification_stamp(&self, node: SyntaxId) -> u64;
}
