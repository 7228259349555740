//! Incremental syntax-to-semantic mapping for declaration bodies.
//!
//! A query for "the semantic node behind this syntax node" should not force
//! analysis of a whole function body. The providers here classify the
//! queried node against the declaration's shape, drive the external
//! resolver just far enough (at least through the statement containing the
//! node), and extend an append-only mapping with the newly analyzed
//! statements. Repeated queries reuse prior partial work; the analyzed
//! prefix only ever grows within a provider's lifetime.
//!
//! Invalidation is wholesale: when a declaration's source changes, its
//! owner discards the provider (see
//! [`ElementProviderRegistry`](crate::registry::ElementProviderRegistry))
//! and a fresh one starts a new lineage. A published state is never mutated
//! to reflect a changed declaration.

mod container;
mod provider;
mod state;

pub use container::ElementContainer;
pub use provider::{
    DeclarationElementProvider, DeclarationShape, EagerElementProvider, ParameterShape,
    PartialBodyElementProvider,
};
pub use state::BodyAnalysisState;
