//! The pivot map (component C2): an ordered map from input position to the
//! per-position memoization record the match engine reads and writes.
//!
//! `spec.md` §4.2 describes a hand-rolled doubly-linked list walked from a
//! moving cursor. We use a [`std::collections::BTreeMap`] instead: it keeps
//! the same invariants (unique by position, sorted ascending, insert-on-miss
//! via `find_or_insert`) with `O(log n)` access rather than the spec's
//! worst-case `O(n)` cursor walk, which is a strict improvement for a
//! from-scratch Rust implementation and doesn't change any observable
//! matching behavior — the cursor is purely an access-pattern optimization
//! in the source material, not part of the match semantics.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ast::SyntaxTreeNode;
use crate::symbol::SymbolId;

/// The record kept per visited position: what's currently on the call
/// stack (cycle guard), what's known to fail, and what's memoized as a
/// success (with the position just past the match, so a cache hit can
/// `seek` there directly instead of replaying the match).
#[derive(Debug, Default)]
pub(crate) struct MatchAttempt<P> {
    pub calling: HashSet<SymbolId>,
    pub fails: HashSet<SymbolId>,
    pub successes: HashMap<SymbolId, (P, SyntaxTreeNode)>,
}

impl<P> MatchAttempt<P> {
    fn new() -> Self {
        Self {
            calling: HashSet::new(),
            fails: HashSet::new(),
            successes: HashMap::new(),
        }
    }
}

/// Ordered map keyed by position, one [`MatchAttempt`] per visited position.
#[derive(Debug)]
pub(crate) struct PivotMap<P: Ord> {
    pivots: BTreeMap<P, MatchAttempt<P>>,
}

impl<P: Ord + Copy> PivotMap<P> {
    pub(crate) fn new() -> Self {
        Self {
            pivots: BTreeMap::new(),
        }
    }

    /// Returns the pivot at `pos`, inserting a fresh empty one if absent.
    pub(crate) fn find_or_insert(&mut self, pos: P) -> &mut MatchAttempt<P> {
        self.pivots.entry(pos).or_insert_with(MatchAttempt::new)
    }

    /// Number of distinct positions visited during this parse. Surfaced for
    /// diagnostics/benchmarking only; not part of match semantics.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pivots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_once_per_position() {
        let mut pivots: PivotMap<usize> = PivotMap::new();
        pivots.find_or_insert(3).fails.insert(SymbolId(0));
        pivots.find_or_insert(3).calling.insert(SymbolId(1));
        assert_eq!(pivots.len(), 1);
        let p = pivots.find_or_insert(3);
        assert!(p.fails.contains(&SymbolId(0)));
        assert!(p.calling.contains(&SymbolId(1)));
    }
}
