//! The query surface of the strata semantic-analysis cache engine.
//!
//! Two independent families of queries live here:
//!
//! - **Symbol resolution** ([`providers`]): "which declaration does this
//!   name refer to". Multiple sources of declarations (hand-written sources,
//!   deserialized binaries) are merged into one lookup surface with bounded
//!   caches, negative-result caching, and deduplication of symbols exposed
//!   by the same physical facade.
//! - **Syntax-to-semantic mapping** ([`body`], [`registry`]): "what does
//!   this piece of syntax mean". Per-declaration providers analyze only as
//!   many body statements as a query needs and monotonically extend their
//!   mapping instead of restarting.
//!
//! The resolution algorithm itself is out of scope; it is consumed through
//! the trait boundaries in [`resolver`] and [`providers::SymbolSource`].

pub mod body;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod symbols;

pub use body::{
    BodyAnalysisState, DeclarationElementProvider, DeclarationShape, EagerElementProvider,
    ElementContainer, ParameterShape, PartialBodyElementProvider,
};
pub use providers::{
    CachingSymbolProvider, CombinedSymbolProvider, DependencySymbolProvider, ModuleSymbolProvider,
    ProviderCacheSizes, SymbolProviderKind, SymbolSource,
};
pub use registry::ElementProviderRegistry;
pub use resolver::{BodyResolver, MappingRegion, ResolvePhase, SyntaxTree};
pub use symbols::{CallableBatch, CallableSymbol, ClassSymbol, SignatureKey, SourcePriority};
