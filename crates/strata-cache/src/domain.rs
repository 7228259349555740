//! Shared computation domains.
//!
//! A [`ComputationDomain`] is a named lock shared by cells that are known to
//! call into each other during post-computation. With private locks, two
//! workers post-computing two mutually dependent values deadlock: each holds
//! its own cell's lock and waits for the value the other is producing.
//! Routing every compute/post-compute of the group through one shared,
//! reentrant lock converts that distributed deadlock into serialization.
//!
//! The trade-off is explicit: post-compute work inside a domain never runs
//! in parallel. That is acceptable because post-compute work is short
//! relative to the resolution it guards; it is a deliberate simplification,
//! not a fully concurrent solution.
//!
//! Domains live in a [`DomainRegistry`] created once at engine start-up and
//! passed by reference to whoever builds cells, rather than being reachable
//! through ambient global state.

use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

use crate::locking::CellLock;

/// A named set of cells sharing one lock. Owns no data.
pub struct ComputationDomain {
    name: Arc<str>,
    lock: Arc<CellLock>,
}

impl ComputationDomain {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        ComputationDomain {
            name: name.into(),
            lock: Arc::new(CellLock::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lock handle installed into every cell of this domain.
    pub fn shared_lock(&self) -> Arc<CellLock> {
        Arc::clone(&self.lock)
    }
}

/// Get-or-create registry of computation domains, one per mutually-recursive
/// cell group (e.g. "binary classifier post-computation").
#[derive(Default)]
pub struct DomainRegistry {
    domains: Mutex<FxHashMap<Arc<str>, Arc<ComputationDomain>>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        DomainRegistry::default()
    }

    pub fn domain(&self, name: &str) -> Arc<ComputationDomain> {
        let mut domains = self
            .domains
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(domain) = domains.get(name) {
            return Arc::clone(domain);
        }
        let domain = Arc::new(ComputationDomain::new(name));
        domains.insert(Arc::from(name), Arc::clone(&domain));
        domain
    }
}
