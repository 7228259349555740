//! Symbol handles returned by the provider stack.
//!
//! Symbols are cheap, clonable handles pointing at declarations owned by
//! the embedding engine. A deserialized symbol additionally remembers the
//! physical facade it was loaded from, which drives deduplication when
//! several binary sources expose overlapping artifacts.

use smallvec::SmallVec;

use strata_common::{CallableKey, ClassKey, DeclId, FacadeKey};

/// Declared priority of a symbol's logical source.
///
/// When two *equivalent* callable declarations come from sources of
/// different priority (e.g. a common and a platform variant of one
/// declaration), the higher-priority one shadows the other. Declarations
/// from equal-priority sources are never considered equivalent — that is a
/// semantic rule preventing silent collapsing of intentionally-distinct
/// same-module declarations, not a cache artifact.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SourcePriority(pub u8);

impl SourcePriority {
    /// Shared (common) sources visible to every platform.
    pub const COMMON: SourcePriority = SourcePriority(0);
    /// Platform-refined sources, preferred over their common counterparts.
    pub const PLATFORM: SourcePriority = SourcePriority(1);
}

/// Opaque equivalence key for a callable declaration (a signature hash).
///
/// Two callables with the same [`CallableKey`] and the same signature key
/// are candidate duplicates for the source-priority rule.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SignatureKey(pub u64);

/// A resolved top-level classifier.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClassSymbol {
    pub key: ClassKey,
    pub decl: DeclId,
}

impl ClassSymbol {
    pub fn new(key: ClassKey, decl: DeclId) -> Self {
        ClassSymbol { key, decl }
    }
}

/// A resolved top-level callable (function or property).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CallableSymbol {
    pub key: CallableKey,
    pub decl: DeclId,
    /// The physical compiled unit this symbol was deserialized from;
    /// `None` for symbols built directly from hand-written sources.
    pub facade: Option<FacadeKey>,
    pub priority: SourcePriority,
    pub signature: SignatureKey,
}

impl CallableSymbol {
    pub fn new(key: CallableKey, decl: DeclId, signature: SignatureKey) -> Self {
        CallableSymbol {
            key,
            decl,
            facade: None,
            priority: SourcePriority::COMMON,
            signature,
        }
    }

    pub fn with_facade(mut self, facade: FacadeKey) -> Self {
        self.facade = Some(facade);
        self
    }

    pub fn with_priority(mut self, priority: SourcePriority) -> Self {
        self.priority = priority;
        self
    }
}

/// One provider's result batch for a callable key. Most names resolve to a
/// handful of overloads, so batches stay inline.
pub type CallableBatch = SmallVec<[CallableSymbol; 4]>;
