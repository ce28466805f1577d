//! C5 §4.5.1: handler registration.
//!
//! Go's `http.HandleFunc(path, handler)` is a flat, method-agnostic call;
//! axum spells the same thing `.route(path, get(handler))`, with the
//! routing-method wrapper (`get`/`post`/...) carrying no equivalent in
//! Go's net/http. Only the handler argument inside it is rewritten, which
//! keeps axum's typed routing intact while still reusing the original
//! `path`/`handler` expressions the way `WrapHandleFunc` does.

use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{Expr, ExprMethodCall, Stmt};

use crate::callgraph::statement_expr;
use crate::edit::EditList;

/// Where the agent handle comes from at this call site.
pub enum AgentSource<'a> {
    /// `main`'s own local variable.
    Direct(&'a str),
    /// Registration happening inside an already-traced function (it is
    /// registering more routes at runtime), obtained from the live
    /// transaction instead (spec.md §4.5.1).
    FromTransaction(&'a str),
}

const ROUTING_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "options", "trace"];

/// Walks down a method-call chain (`Router::new().route(a).route(b)`)
/// collecting every `.route(..)` call: a bounded descent through receivers
/// only, never into nested block bodies.
fn collect_route_calls(expr: &Expr) -> Vec<&ExprMethodCall> {
    let mut out = Vec::new();
    let mut cur = expr;
    loop {
        match cur {
            Expr::MethodCall(mc) => {
                if mc.method == "route" {
                    out.push(mc);
                }
                cur = &mc.receiver;
            }
            Expr::Try(t) => cur = &t.expr,
            Expr::Await(a) => cur = &a.base,
            Expr::Paren(p) => cur = &p.expr,
            _ => break,
        }
    }
    out
}

/// The literal-identifier case only (spec.md §9's open question: leave
/// variable-indirected and already-wrapped handler arguments as no-ops:
/// the latter falls out for free since an already-wrapped handler is an
/// `Expr::Call`, not an `Expr::Path`).
fn routing_handler_arg(arg: &Expr) -> Option<&Expr> {
    let Expr::Call(call) = arg else { return None };
    let Expr::Path(p) = &*call.func else { return None };
    let name = p.path.segments.last()?.ident.to_string();
    if !ROUTING_METHODS.contains(&name.as_str()) || call.args.len() != 1 {
        return None;
    }
    matches!(&call.args[0], Expr::Path(_)).then(|| &call.args[0])
}

pub fn rewrite(edits: &mut EditList, stmt: &Stmt, agent: &AgentSource) -> bool {
    let Some(root) = statement_expr(stmt) else { return false };
    let mut modified = false;

    for route_call in collect_route_calls(root) {
        if route_call.args.len() != 2 {
            continue;
        }
        let Some(handler) = routing_handler_arg(&route_call.args[1]) else { continue };

        let agent_text = match agent {
            AgentSource::Direct(name) => name.to_string(),
            AgentSource::FromTransaction(txn) => format!("{txn}.application()"),
        };
        let path_text = route_call.args[0].to_token_stream().to_string();
        let handler_text = handler.to_token_stream().to_string();
        let replacement = format!("telemetry::wrap_handler({agent_text}, {path_text}, {handler_text})");

        let range = handler.span().byte_range();
        edits.replace(range.start, range.end, replacement);
        modified = true;
    }
    modified
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn wraps_direct_handler_reference() {
        let stmt: Stmt = parse_quote! { let app = Router::new().route("/hi", get(say_hi)); };
        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &stmt, &AgentSource::Direct("agent")));

        let src = r#"let app = Router::new().route("/hi", get(say_hi));"#;
        let out = edits.apply(src);
        assert!(out.contains(r#"telemetry::wrap_handler(agent, "/hi", say_hi)"#));
    }

    #[test]
    fn uses_transaction_application_when_nested() {
        let stmt: Stmt = parse_quote! { app = app.route("/hi", get(say_hi)); };
        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &stmt, &AgentSource::FromTransaction("nrTxn")));

        let src = r#"app = app.route("/hi", get(say_hi));"#;
        let out = edits.apply(src);
        assert!(out.contains("telemetry::wrap_handler(nrTxn.application()"));
    }

    #[test]
    fn leaves_variable_indirected_handlers_alone() {
        let stmt: Stmt = parse_quote! { let app = Router::new().route("/hi", get(handler_var)); };
        // handler_var is still a bare Expr::Path, so this *does* match:
        // the open question is about the *registration call* referencing a
        // variable, not the handler; cover the true no-op: an already
        // wrapped handler.
        let wrapped: Stmt = parse_quote! { let app = Router::new().route("/hi", get(telemetry::wrap_handler(agent, "/hi", say_hi))); };
        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &stmt, &AgentSource::Direct("agent")));
        let mut edits2 = EditList::new();
        assert!(!rewrite(&mut edits2, &wrapped, &AgentSource::Direct("agent")));
    }
}
