//! The per-declaration partial analysis state.

use std::fmt;
use std::sync::Arc;

/// How much of a declaration's body has been analyzed.
///
/// States are immutable; each analysis round produces a new state linked to
/// its predecessor. Within a lineage the analyzed counts are strictly
/// increasing (a round that analyzes nothing new produces no state), so a
/// reader can never observe a shrinking view. The `previous` pointer is not
/// required for correctness; it exists to diagnose regressions.
///
/// The statement counts are tracked in two unit systems: syntax statements
/// (`analyzed_unit_count` out of `total_unit_count`) and semantic
/// statements (`analyzed_semantic_unit_count`), which can differ when
/// desugaring splits or merges statements.
#[derive(Debug)]
pub struct BodyAnalysisState {
    pub total_unit_count: usize,
    pub analyzed_unit_count: usize,
    pub analyzed_semantic_unit_count: usize,
    pub rounds_performed: usize,
    pub previous: Option<Arc<BodyAnalysisState>>,
}

impl BodyAnalysisState {
    /// The all-zero state of a body with `total_unit_count` statements.
    pub fn empty(total_unit_count: usize) -> Self {
        BodyAnalysisState {
            total_unit_count,
            analyzed_unit_count: 0,
            analyzed_semantic_unit_count: 0,
            rounds_performed: 0,
            previous: None,
        }
    }

    /// A new state in the lineage of `previous`.
    pub fn advanced(
        previous: &Arc<BodyAnalysisState>,
        analyzed_unit_count: usize,
        analyzed_semantic_unit_count: usize,
    ) -> Self {
        let state = BodyAnalysisState {
            total_unit_count: previous.total_unit_count,
            analyzed_unit_count,
            analyzed_semantic_unit_count,
            rounds_performed: previous.rounds_performed + 1,
            previous: Some(Arc::clone(previous)),
        };
        state.assert_consistent();
        state
    }

    pub fn is_fully_analyzed(&self) -> bool {
        self.analyzed_unit_count == self.total_unit_count
    }

    fn assert_consistent(&self) {
        assert!(
            self.analyzed_unit_count <= self.total_unit_count,
            "analyzed past the end of the body: {self}"
        );
        if let Some(previous) = &self.previous {
            assert!(
                previous.analyzed_unit_count < self.analyzed_unit_count
                    && previous.analyzed_semantic_unit_count < self.analyzed_semantic_unit_count,
                "analysis state regressed: {previous} -> {self}"
            );
        }
    }
}

impl fmt::Display for BodyAnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}/{}) #{}",
            self.analyzed_semantic_unit_count,
            self.analyzed_unit_count,
            self.total_unit_count,
            self.rounds_performed
        )
    }
}
