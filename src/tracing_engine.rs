//! C4: tracing engine.
//!
//! Walks from `main` and from every HTTP-handler entry point through the
//! call graph, appending transaction machinery at each function boundary
//! [`InstrumentState`] says still needs it. Every rewrite is a text splice
//! recorded in a per-file [`EditList`]; the parsed tree itself is never
//! touched, so recursing into a callee that lives in a different file never
//! needs two live mutable borrows into the same file (grounded on
//! `linker/partial_linker.rs`'s recursive rewrite driver; the
//! init/shutdown/segment shape is grounded on the original's
//! `parser/agent.go`, read for contract only, never translated).

use syn::spanned::Spanned;
use syn::{Expr, Item, Pat, Stmt};

use crate::callgraph::{outermost_call, resolve_invocation, statement_expr, CallGraph, FunctionLocation};
use crate::edit::EditList;
use crate::http::{self, registration::AgentSource};
use crate::loader::LoadedPackage;
use crate::oracle::{self, TypeOracle};
use crate::state::InstrumentState;

/// Fixed literal used for every propagated transaction parameter and for
/// the per-statement segment it starts: spec.md's `trace_function` always
/// recurses with the same name (`"nrTxn"`), never a freshly generated one;
/// [`InstrumentState::generate_transaction_variable_name`] is reserved for
/// *minting* new transactions at an entry point (see `instrument_main`).
const PROPAGATED_TXN: &str = "nrTxn";

pub struct Engine<'a> {
    pkg: &'a LoadedPackage,
    graph: &'a CallGraph,
    state: InstrumentState,
    edits: Vec<EditList>,
    agent_var: String,
    app_name: String,
}

impl<'a> Engine<'a> {
    pub fn new(pkg: &'a LoadedPackage, graph: &'a CallGraph, agent_var: impl Into<String>, app_name: impl Into<String>) -> Self {
        let state = InstrumentState::from_call_graph(graph);
        let edits = pkg.files.iter().map(|_| EditList::new()).collect();
        Self { pkg, graph, state, edits, agent_var: agent_var.into(), app_name: app_name.into() }
    }

    pub fn state(&self) -> &InstrumentState {
        &self.state
    }

    pub fn into_parts(self) -> (InstrumentState, Vec<EditList>) {
        (self.state, self.edits)
    }

    fn item_fn(&self, loc: FunctionLocation) -> &'a syn::ItemFn {
        let pkg = self.pkg;
        match &pkg.files[loc.file].ast.items[loc.item] {
            Item::Fn(f) => f,
            _ => unreachable!("FunctionLocation always points at an Item::Fn"),
        }
    }

    fn append_transaction_parameter(&mut self, loc: FunctionLocation) {
        let sig = &self.item_fn(loc).sig;
        let close = sig.paren_token.span().close().byte_range().start;
        let text = if sig.inputs.is_empty() {
            format!("{PROPAGATED_TXN}: &telemetry::Transaction")
        } else {
            format!(", {PROPAGATED_TXN}: &telemetry::Transaction")
        };
        self.edits[loc.file].insert_before(close, text);
    }

    fn prepend_segment(&mut self, loc: FunctionLocation, label: &str) {
        let open_end = self.item_fn(loc).block.brace_token.span().open().byte_range().end;
        self.edits[loc.file]
            .insert_after(open_end, format!("\n    let _segment = {PROPAGATED_TXN}.start_segment(\"{label}\");"));
    }

    fn append_call_argument(&mut self, file_idx: usize, call: &syn::ExprCall, arg: &str) {
        let close = call.paren_token.span().close().byte_range().start;
        let text = if call.args.is_empty() { arg.to_string() } else { format!(", {arg}") };
        self.edits[file_idx].insert_before(close, text);
    }

    // ---- 4.4.1 instrument_main -------------------------------------------------

    pub fn instrument_main(&mut self) {
        let Some(loc) = self.graph.location_of("main") else { return };
        if !self.state.should_instrument("main") {
            return;
        }
        let main_fn = self.item_fn(loc);

        let brace = main_fn.block.brace_token.span();
        let open_end = brace.open().byte_range().end;
        let close_start = brace.close().byte_range().start;

        let agent = self.agent_var.clone();
        let config_expr = if self.app_name.is_empty() {
            "telemetry::Config::from_env()".to_string()
        } else {
            format!("telemetry::Config::app_name(\"{}\").from_env()", self.app_name)
        };
        self.edits[loc.file].insert_after(
            open_end,
            format!("\n    let {agent} = telemetry::Agent::new({config_expr}).unwrap_or_else(|err| panic!(\"{{err}}\"));"),
        );
        self.edits[loc.file]
            .insert_before(close_start, format!("    {agent}.shutdown(std::time::Duration::from_secs(5));\n"));
        self.state.add_import("telemetry");

        let mut oracle = TypeOracle::new();
        oracle.seed_from_signature(&main_fn.sig);
        for stmt in &main_fn.block.stmts {
            self.main_statement(loc.file, stmt, &agent, &mut oracle);
        }
        self.state.mark_traced("main");
    }

    fn main_statement(&mut self, file_idx: usize, stmt: &Stmt, agent: &str, oracle: &mut TypeOracle) {
        if let Stmt::Local(local) = stmt {
            oracle.observe_let(local);
        }

        // Spec.md §4.4.1 step 4 scopes the instrument/wrap-transaction trio
        // to *expression statements* specifically, unlike §4.4.2's broader
        // "ordinary statements" wording.
        if let Stmt::Expr(expr, _) = stmt {
            if let Some(call) = outermost_call(expr) {
                self.maybe_instrument_main_call(file_idx, stmt, call, agent);
            }
        }

        http::registration::rewrite(&mut self.edits[file_idx], stmt, &AgentSource::Direct(agent));
    }

    fn maybe_instrument_main_call(&mut self, file_idx: usize, stmt: &Stmt, call: &syn::ExprCall, agent: &str) {
        let Some((name, loc)) = resolve_invocation(call, self.graph) else { return };
        let name = name.to_string();

        if self.state.should_instrument(&name) {
            if self.trace_function(&name, PROPAGATED_TXN) {
                self.state.add_transaction_parameter(&name);
                self.append_transaction_parameter(loc);
                self.state.add_import("telemetry");
            }
        }

        if self.state.requires_transaction_argument(&name) {
            let txn_var = self.state.generate_transaction_variable_name("nrTxn");
            let range = stmt.span().byte_range();
            self.edits[file_idx]
                .insert_before(range.start, format!("let {txn_var} = {agent}.start_transaction(\"{name}\");\n    "));
            self.append_call_argument(file_idx, call, &txn_var);
            self.edits[file_idx].insert_after(range.end, format!("\n    {txn_var}.end();"));
        }
    }

    // ---- 4.5.2 HTTP handler entry points ---------------------------------------

    pub fn instrument_handle_function(&mut self, loc: FunctionLocation) -> bool {
        let item_fn = self.item_fn(loc);
        if item_fn.sig.ident == "main" || !http::handler::is_handler(&item_fn.sig) {
            return false;
        }
        let name = item_fn.sig.ident.to_string();
        if !self.state.should_instrument(&name) {
            return false;
        }

        let req_binding = http::handler::request_binding(&item_fn.sig);
        let modified = self.trace_function(&name, PROPAGATED_TXN);
        if modified {
            let open_end = item_fn.block.brace_token.span().open().byte_range().end;
            self.edits[loc.file].insert_after(
                open_end,
                format!("\n    let {PROPAGATED_TXN} = telemetry::Transaction::from_context({req_binding}.extensions());"),
            );
            self.state.add_import("telemetry");
        }
        modified
    }

    // ---- 4.5.3 / 4.5.5 driver-level, txn-independent passes --------------------

    pub fn instrument_http_client(&mut self, loc: FunctionLocation) -> bool {
        let item_fn = self.item_fn(loc);
        let mut oracle = TypeOracle::new();
        oracle.seed_from_signature(&item_fn.sig);
        let mut modified = false;
        for stmt in &item_fn.block.stmts {
            if let Stmt::Local(local) = stmt {
                oracle.observe_let(local);
                modified |= http::client::rewrite(&mut self.edits[loc.file], local, &oracle);
            }
        }
        if modified {
            self.state.add_import("telemetry");
        }
        modified
    }

    pub fn cannot_instrument_http_method(&mut self, loc: FunctionLocation) -> bool {
        let mut modified = false;
        for stmt in &self.item_fn(loc).block.stmts {
            modified |= http::uninstrumentable::rewrite(&mut self.edits[loc.file], stmt);
        }
        modified
    }

    // ---- 4.4.2 trace_function ---------------------------------------------------

    fn trace_function(&mut self, name: &str, txn_var: &str) -> bool {
        let Some(loc) = self.graph.location_of(name) else { return false };
        // Engaged immediately, not on exit: this is what cuts a cyclic call
        // graph at its first revisit (spec.md §9).
        self.state.mark_traced(name);

        let item_fn = self.item_fn(loc);
        let mut oracle = TypeOracle::new();
        oracle.seed_from_signature(&item_fn.sig);

        let mut modified = false;
        for stmt in &item_fn.block.stmts {
            modified |= self.visit_statement(loc.file, stmt, txn_var, &mut oracle);
        }
        modified
    }

    fn visit_statement(&mut self, file_idx: usize, stmt: &Stmt, txn_var: &str, oracle: &mut TypeOracle) -> bool {
        if let Stmt::Local(local) = stmt {
            oracle.observe_let(local);
        }

        let mut modified = false;

        if let Some(call) = spawn_call(stmt) {
            modified |= self.visit_spawn(file_idx, stmt, call, txn_var);
        } else if let Some(expr) = statement_expr(stmt) {
            if let Some(call) = outermost_call(expr) {
                modified |= self.visit_ordinary_call(file_idx, call, txn_var);
            }
        }

        modified |= self.maybe_notice_error(file_idx, stmt, txn_var);
        modified |= http::registration::rewrite(&mut self.edits[file_idx], stmt, &AgentSource::FromTransaction(txn_var));
        modified |= http::outbound::rewrite(&mut self.edits[file_idx], stmt, txn_var);

        modified
    }

    fn visit_ordinary_call(&mut self, file_idx: usize, call: &syn::ExprCall, txn_var: &str) -> bool {
        let Some((name, loc)) = resolve_invocation(call, self.graph) else { return false };
        let name = name.to_string();
        let mut modified = false;

        if self.state.should_instrument(&name) {
            if self.trace_function(&name, PROPAGATED_TXN) {
                self.state.add_transaction_parameter(&name);
                self.append_transaction_parameter(loc);
                self.state.add_import("telemetry");
                self.prepend_segment(loc, &name);
                modified = true;
            }
        }

        if self.state.requires_transaction_argument(&name) {
            self.append_call_argument(file_idx, call, txn_var);
            modified = true;
        }

        modified
    }

    /// Parallel-spawn statements whose spawned target isn't a closure
    /// literal are rare; they fall back to ordinary-call handling with the
    /// live transaction passed as-is rather than via a freshly minted task
    /// handle (documented simplification, see DESIGN.md).
    fn visit_spawn(&mut self, file_idx: usize, stmt: &Stmt, call: &syn::ExprCall, txn_var: &str) -> bool {
        if call.args.len() != 1 {
            return false;
        }
        let Expr::Closure(closure) = &call.args[0] else {
            return self.visit_ordinary_call(file_idx, call, txn_var);
        };

        let stmt_start = stmt.span().byte_range().start;
        self.edits[file_idx].insert_before(stmt_start, format!("let {txn_var} = {txn_var}.new_task();\n    "));

        if closure.capture.is_none() {
            self.edits[file_idx].insert_before(closure.span().byte_range().start, "move ");
        }

        if let Expr::Block(block_expr) = &*closure.body {
            let open_end = block_expr.block.brace_token.span().open().byte_range().end;
            self.edits[file_idx]
                .insert_after(open_end, format!("\n    let _segment = {txn_var}.start_segment(\"async closure\");"));

            // The top-level `cannot_instrument_http_method` driver pass only
            // walks a function's own top-level statements (spec.md §4.5.5:
            // "run once per top-level function"), so it never sees a call
            // buried inside a spawned closure's body. Run it here instead,
            // once per inner statement, so e.g. a `reqwest::get` inside a
            // `thread::spawn(|| { .. })` still gets flagged.
            let mut inner_oracle = TypeOracle::new();
            for inner in &block_expr.block.stmts {
                self.visit_statement(file_idx, inner, txn_var, &mut inner_oracle);
                http::uninstrumentable::rewrite(&mut self.edits[file_idx], inner);
            }
        }

        true
    }

    fn maybe_notice_error(&mut self, file_idx: usize, stmt: &Stmt, txn_var: &str) -> bool {
        let Stmt::Local(local) = stmt else { return false };
        let (name, ascribed_ty) = match &local.pat {
            Pat::Ident(id) => (id.ident.to_string(), None),
            Pat::Type(pt) => match &*pt.pat {
                Pat::Ident(id) => (id.ident.to_string(), Some(oracle::type_to_string(&pt.ty))),
                _ => return false,
            },
            _ => return false,
        };
        let Some(init) = &local.init else { return false };
        let Some(call) = outermost_call(&init.expr) else { return false };

        if let Expr::Path(p) = &*call.func {
            if p.path.segments.iter().any(|s| s.ident == "telemetry") {
                return false;
            }
        }

        let returns_result = resolve_invocation(call, self.graph)
            .and_then(|(_, loc)| oracle::return_type_string(&self.item_fn(loc).sig))
            .or(ascribed_ty)
            .map(|ty| oracle::is_result_type(&ty))
            .unwrap_or(false);
        if !returns_result {
            return false;
        }

        let end = stmt.span().byte_range().end;
        self.edits[file_idx].insert_after(end, format!("\n    {txn_var}.notice_error(&{name});"));
        true
    }
}

fn spawn_call(stmt: &Stmt) -> Option<&syn::ExprCall> {
    let expr = statement_expr(stmt)?;
    let call = outermost_call(expr)?;
    let Expr::Path(p) = &*call.func else { return None };
    let segs: Vec<String> = p.path.segments.iter().map(|s| s.ident.to_string()).collect();
    let is_spawn = segs.len() == 2
        && segs[1] == "spawn"
        && (segs[0] == "thread" || segs[0] == "tokio");
    is_spawn.then_some(call)
}
