//! Names, keys, and id newtypes used across the analysis caches.
//!
//! Names are interned as `Arc<str>` so that keys can be cloned into cache
//! maps and eviction queues without reallocating. Ids are plain `u32`
//! newtypes; they identify nodes owned by the embedding engine (this crate
//! never dereferences them).

use std::fmt;
use std::sync::Arc;

/// A single identifier segment, e.g. a class or callable name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimpleName(Arc<str>);

impl SimpleName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        SimpleName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SimpleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SimpleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimpleName({})", self.0)
    }
}

/// A dot-separated package name. The empty string is the root package.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(Arc<str>);

impl PackageName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        PackageName(name.into())
    }

    pub fn root() -> Self {
        PackageName(Arc::from(""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageName({})", self.0)
    }
}

/// Addresses a top-level classifier (class, interface, type alias).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClassKey {
    pub package: PackageName,
    pub name: SimpleName,
}

impl ClassKey {
    pub fn new(package: PackageName, name: SimpleName) -> Self {
        ClassKey { package, name }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.name)
    }
}

/// Addresses all top-level callables (functions and properties) of one name
/// in one package.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CallableKey {
    pub package: PackageName,
    pub name: SimpleName,
}

impl CallableKey {
    pub fn new(package: PackageName, name: SimpleName) -> Self {
        CallableKey { package, name }
    }
}

impl fmt::Display for CallableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.name)
    }
}

/// The physical compiled artifact a deserialized symbol came from.
///
/// One facade may expose several logical symbols; overlapping sources are
/// deduplicated by this key when providers are combined.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FacadeKey(Arc<str>);

impl FacadeKey {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        FacadeKey(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacadeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FacadeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FacadeKey({})", self.0)
    }
}

/// Identity of a declaration owned by the embedding engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

/// Stable identity of a node in the parsed source representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SyntaxId(pub u32);

impl fmt::Display for SyntaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syn#{}", self.0)
    }
}

/// Identity of a resolved, typed semantic node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SemanticId(pub u32);

impl fmt::Display for SemanticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sem#{}", self.0)
    }
}
