//! C3: state manager.
//!
//! The single source of truth the rewriter consults and mutates. Unlike
//! the original's `InstrumentationManager` (`parser/manager.go`, kept only
//! as reference, never translated), this crate loads one flat package per
//! run, so there is no `set_current_package` switch to model: every table
//! here is already scoped to "the current package."

use indexmap::IndexMap;

use crate::callgraph::{CallGraph, FunctionLocation};

#[derive(Debug, Clone)]
pub struct DeclEntry {
    pub location: FunctionLocation,
    pub traced: bool,
    pub requires_txn: bool,
}

/// Owns spec.md §3's three tables: `decls`, `imports_added`, `txn_var_names`.
#[derive(Debug)]
pub struct InstrumentState {
    decls: IndexMap<String, DeclEntry>,
    imports_added: IndexMap<String, ()>,
    txn_var_names: IndexMap<String, usize>,
}

impl InstrumentState {
    pub fn from_call_graph(graph: &CallGraph) -> Self {
        let mut decls = IndexMap::new();
        for name in graph.names_in_source_order() {
            let location = graph.location_of(name).expect("name came from the graph itself");
            decls.insert(
                name.to_string(),
                DeclEntry { location, traced: false, requires_txn: false },
            );
        }
        Self { decls, imports_added: IndexMap::new(), txn_var_names: IndexMap::new() }
    }

    /// Idempotent: an import path is recorded at most once (invariant 5).
    pub fn add_import(&mut self, path: impl Into<String>) {
        self.imports_added.entry(path.into()).or_insert(());
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports_added.keys().map(|s| s.as_str())
    }

    /// Marks `name` as having completed one full rewrite pass (invariant 3).
    /// A no-op if `name` isn't a known declaration.
    pub fn mark_traced(&mut self, name: &str) {
        if let Some(entry) = self.decls.get_mut(name) {
            entry.traced = true;
        }
    }

    /// `main` is the root that creates the application handle; it is never
    /// assigned `requires_txn` (invariant 4): callers simply never call
    /// this for `"main"`.
    pub fn add_transaction_parameter(&mut self, name: &str) {
        debug_assert_ne!(name, "main", "main never requires a transaction parameter");
        if let Some(entry) = self.decls.get_mut(name) {
            entry.requires_txn = true;
        }
    }

    /// `true` iff the entry exists and has not yet been traced.
    pub fn should_instrument(&self, name: &str) -> bool {
        self.decls.get(name).map(|e| !e.traced).unwrap_or(false)
    }

    pub fn requires_transaction_argument(&self, name: &str) -> bool {
        self.decls.get(name).map(|e| e.requires_txn).unwrap_or(false)
    }

    pub fn get_declaration(&self, name: &str) -> Option<&DeclEntry> {
        self.decls.get(name)
    }

    /// `base` the first time a given base name is requested, `base1`,
    /// `base2`, ... thereafter: a per-package monotonic counter so
    /// multiple entry points in the same package never collide on `nrTxn`.
    pub fn generate_transaction_variable_name(&mut self, base: &str) -> String {
        let counter = self.txn_var_names.entry(base.to_string()).or_insert(0);
        let name = if *counter == 0 { base.to_string() } else { format!("{base}{counter}") };
        *counter += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(names: &[&str]) -> InstrumentState {
        let mut decls = IndexMap::new();
        for (i, n) in names.iter().enumerate() {
            decls.insert(
                n.to_string(),
                DeclEntry { location: FunctionLocation { file: 0, item: i }, traced: false, requires_txn: false },
            );
        }
        InstrumentState { decls, imports_added: IndexMap::new(), txn_var_names: IndexMap::new() }
    }

    #[test]
    fn import_is_added_at_most_once() {
        let mut state = state_with(&["main"]);
        state.add_import("telemetry");
        state.add_import("telemetry");
        assert_eq!(state.imports().count(), 1);
    }

    #[test]
    fn should_instrument_becomes_false_once_traced() {
        let mut state = state_with(&["helper"]);
        assert!(state.should_instrument("helper"));
        state.mark_traced("helper");
        assert!(!state.should_instrument("helper"));
    }

    #[test]
    fn variable_name_generation_is_monotonic_per_base() {
        let mut state = state_with(&["main"]);
        assert_eq!(state.generate_transaction_variable_name("nrTxn"), "nrTxn");
        assert_eq!(state.generate_transaction_variable_name("nrTxn"), "nrTxn1");
        assert_eq!(state.generate_transaction_variable_name("nrTxn"), "nrTxn2");
    }

    #[test]
    fn unknown_function_queries_are_false_not_panics() {
        let state = state_with(&["main"]);
        assert!(!state.should_instrument("ghost"));
        assert!(!state.requires_transaction_argument("ghost"));
        assert!(state.get_declaration("ghost").is_none());
    }
}
