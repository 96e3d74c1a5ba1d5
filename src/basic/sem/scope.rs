//! # Procedure scope and name resolution
//!
//! The analyzer's lexical frame for one SUB/FUNCTION body (spec.md §4.3,
//! §9). The source realizes this via a stack of RAII objects that record
//! delta lists; here a single snapshot of every tracked table is taken on
//! scope entry and restored verbatim on exit, which gives the same
//! "no global residue" guarantee without destructor-ordering subtleties.
//! Scope objects are strictly nested (LIFO), so a plain stack suffices —
//! there are no true cycles, just a chain of owned frames.
//!
//! [`SemanticAnalyzer`](crate::basic::sem::analyzer::SemanticAnalyzer)
//! analyzes one procedure body at a time and restores the global state
//! before starting the next, so only one non-global frame is ever open —
//! today a parameter or local never actually collides with a name bound in
//! an outer frame, and [`ScopeTracker::bind`] always binds a name to itself.
//! The mapping is still real state spec.md §3 names (`bind` is called from
//! every variable-registration site, not just this module's tests) and
//! starts doing real renaming work the moment nested procedure scopes are
//! introduced.

use std::collections::{HashMap, HashSet};

use crate::basic::sem::types::SemType;

/// Maps user-written names to canonical names across nested lexical scopes.
/// A plain stack of frames: innermost frame is consulted first.
#[derive(Debug, Default, Clone)]
pub struct ScopeTracker {
    frames: Vec<HashMap<String, String>>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self { frames: vec![HashMap::new()] }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
        if self.frames.is_empty() {
            self.frames.push(HashMap::new());
        }
    }

    pub fn bind(&mut self, source_name: &str, canonical: &str) {
        self.frames
            .last_mut()
            .expect("scope tracker always has a frame")
            .insert(source_name.to_string(), canonical.to_string());
    }

    /// Resolves `name` through the scope chain, innermost first. Falls back
    /// to the name itself when unbound (global/main-sequence names are not
    /// renamed).
    pub fn resolve(&self, name: &str) -> String {
        for frame in self.frames.iter().rev() {
            if let Some(canonical) = frame.get(name) {
                return canonical.clone();
            }
        }
        name.to_string()
    }
}

/// Error-handler state: whether a handler is installed and, if so, its
/// target label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorHandlerState {
    pub active: bool,
    pub target: Option<String>,
}

/// Everything a procedure scope snapshots on entry and restores on exit.
#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    pub symbols: HashSet<String>,
    pub var_types: HashMap<String, SemType>,
    pub arrays: HashMap<String, i64>,
    pub open_channels: HashSet<i64>,
    pub labels: HashSet<String>,
    pub label_refs: HashSet<String>,
    pub error_handler: ErrorHandlerState,
}

/// A snapshot taken at procedure-scope entry, reconciled at exit.
pub struct ScopeSnapshot {
    state: AnalysisState,
    loop_depth: usize,
    for_depth: usize,
}

impl AnalysisState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes an immutable snapshot of the current state plus the loop/FOR
    /// stack depths, to be reconciled by [`ScopeSnapshot::restore`].
    pub fn snapshot(&self, loop_depth: usize, for_depth: usize) -> ScopeSnapshot {
        ScopeSnapshot { state: self.clone(), loop_depth, for_depth }
    }
}

impl ScopeSnapshot {
    /// Restores `state` to exactly what it was at snapshot time, and returns
    /// the loop/FOR stack depths the caller should truncate back to.
    pub fn restore(self, state: &mut AnalysisState) -> (usize, usize) {
        *state = self.state;
        (self.loop_depth, self.for_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_tracker_resolves_innermost_binding_first() {
        let mut t = ScopeTracker::new();
        t.bind("x", "x$global");
        t.push();
        t.bind("x", "x$local_1");
        assert_eq!(t.resolve("x"), "x$local_1");
        t.pop();
        assert_eq!(t.resolve("x"), "x$global");
    }

    #[test]
    fn unbound_name_resolves_to_itself() {
        let t = ScopeTracker::new();
        assert_eq!(t.resolve("Y"), "Y");
    }

    #[test]
    fn snapshot_restore_rolls_back_all_mutations() {
        let mut state = AnalysisState::new();
        state.symbols.insert("A".to_string());
        let snap = state.snapshot(0, 0);

        state.symbols.insert("B".to_string());
        state.var_types.insert("B".to_string(), SemType::Int);
        state.labels.insert("10".to_string());

        let (loop_depth, for_depth) = snap.restore(&mut state);
        assert_eq!(loop_depth, 0);
        assert_eq!(for_depth, 0);
        assert!(state.symbols.contains("A"));
        assert!(!state.symbols.contains("B"));
        assert!(state.labels.is_empty());
    }
}
